//! # hexscan
//!
//! Core library for scanning and patching the memory of a running Linux
//! process.
//!
//! This crate provides:
//! - Region enumeration from `/proc/<pid>/maps`
//! - Positional reads and writes through `/proc/<pid>/mem`
//! - Chunked AOB (array-of-bytes) pattern scanning with wildcards
//! - Typed value scans narrowed by repeated next scans
//! - Reversible NOP, byte and conditional-jump patches
//! - JSON patch scripts that chain scans and patches
//!
//! Writing to another process needs the same privileges as `ptrace`
//! (root, `CAP_SYS_PTRACE`, or a permissive `kernel.yama.ptrace_scope`).

pub mod error;
pub mod memory;
pub mod patch;
pub mod prelude;
pub mod scan;
pub mod script;

pub use error::{Error, Result};
pub use memory::{
    Access, MemoryAccessor, MemoryRegion, MemoryStream, NOP, Permissions, ProcessHandle,
    ReadMemory, RegionFilter, WriteMemory, list_regions, parse_maps,
};
pub use patch::{Patch, PatchKind, PatchManager, is_conditional_jump};
pub use scan::{
    Comparison, DEFAULT_CHUNK_SIZE, FLOAT_EPSILON, Pattern, ScanConfig, ScanConfigBuilder,
    ScanMode, ScanStats, Scanner, Value, ValueHit, ValueScanResults, ValueScanner, ValueType,
    find_matches, parse_hex_bytes, scan, scan_process,
};
pub use script::{
    PatchAction, PatchScript, PatchStep, StepOutcome, StepReport, load_script, save_script,
};
