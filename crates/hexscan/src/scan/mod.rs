//! AOB pattern and typed value scanning

mod constants;
mod pattern;
mod scanner;
mod value;

pub use constants::*;
pub use pattern::{Pattern, parse_hex_bytes};
pub use scanner::*;
pub use value::*;
