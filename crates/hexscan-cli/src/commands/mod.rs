//! CLI command implementations.
//!
//! Each subcommand of `hexscan` lives in its own module.

pub mod hex_utils;
pub mod nop;
pub mod read;
pub mod regions;
pub mod run;
pub mod scan;
pub mod value;
pub mod write;
