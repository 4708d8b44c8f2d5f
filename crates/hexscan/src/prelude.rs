//! Prelude module for convenient imports
//!
//! ```ignore
//! use hexscan::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Process access: `ProcessHandle`, `MemoryAccessor`, `ReadMemory`, `WriteMemory`
//! - Regions: `MemoryRegion`, `RegionFilter`
//! - Scanning: `Pattern`, `Scanner`, `ScanConfig`, `ScanMode`, `ValueScanner`
//! - Patching: `PatchManager`, `PatchScript`
//! - Error handling: `Error`, `Result`

// Process access
pub use crate::memory::{Access, MemoryAccessor, ProcessHandle, ReadMemory, WriteMemory};

// Regions
pub use crate::memory::{MemoryRegion, RegionFilter};

// Error handling
pub use crate::error::{Error, Result};

// Scanning
pub use crate::scan::{
    Comparison, Pattern, ScanConfig, ScanMode, Scanner, ValueScanner, ValueType,
};

// Patching
pub use crate::patch::PatchManager;
pub use crate::script::PatchScript;
