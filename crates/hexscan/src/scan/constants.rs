//! Scan tuning constants

/// Default bytes read per chunk (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest accepted chunk size
pub const MIN_CHUNK_SIZE: usize = 1;

/// Tolerance for floating point equality in value scans
pub const FLOAT_EPSILON: f64 = 0.001;
