//! Reversible code and data patches

pub mod jump;
mod manager;

pub use jump::is_conditional_jump;
pub use manager::{Patch, PatchKind, PatchManager};
