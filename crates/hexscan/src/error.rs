use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found (pid {pid}): {reason}")]
    ProcessNotFound { pid: u32, reason: String },

    #[error("Failed to read {len} bytes of process memory at address {address:#x}")]
    RegionUnreadable { address: u64, len: usize },

    #[error("Failed to write {len} bytes of process memory at address {address:#x}: {source}")]
    WriteFailure {
        address: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pattern: {0}")]
    PatternMalformed(String),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Invalid value scan: {0}")]
    InvalidScan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a script or other input file was missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Whether the error only concerns one memory range, so a scan may
    /// continue with the next chunk.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RegionUnreadable { .. })
    }
}
