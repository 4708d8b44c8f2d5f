//! Process handles backed by procfs

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::region::{MemoryRegion, RegionFilter, filter_regions};
use super::stream::{Access, MemoryStream};
use crate::error::{Error, Result};

/// Default procfs mount point
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Capability to inspect one running process.
///
/// The handle does not own the process and holds no open descriptors.
/// Memory streams are acquired from it per operation with
/// [`ProcessHandle::open_memory`] and released when dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    proc_root: PathBuf,
}

impl ProcessHandle {
    /// Open a process under `/proc`.
    pub fn open(pid: u32) -> Result<Self> {
        Self::open_in(DEFAULT_PROC_ROOT, pid)
    }

    /// Open a process under an alternative procfs root.
    pub fn open_in<P: AsRef<Path>>(proc_root: P, pid: u32) -> Result<Self> {
        let handle = Self {
            pid,
            proc_root: proc_root.as_ref().to_path_buf(),
        };

        if !handle.process_dir().is_dir() {
            return Err(Error::ProcessNotFound {
                pid,
                reason: format!("{} does not exist", handle.process_dir().display()),
            });
        }

        debug!("Opened process {} under {}", pid, handle.proc_root.display());
        Ok(handle)
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn process_dir(&self) -> PathBuf {
        self.proc_root.join(self.pid.to_string())
    }

    pub fn maps_path(&self) -> PathBuf {
        self.process_dir().join("maps")
    }

    pub fn mem_path(&self) -> PathBuf {
        self.process_dir().join("mem")
    }

    /// Whether the process directory still resolves.
    pub fn is_alive(&self) -> bool {
        self.process_dir().is_dir()
    }

    /// List readable memory regions accepted by `filter`, in address order.
    pub fn regions(&self, filter: RegionFilter) -> Result<Vec<MemoryRegion>> {
        let content = fs::read_to_string(self.maps_path()).map_err(|e| self.not_found(e))?;
        let regions = filter_regions(&content, filter);
        debug!(
            "Process {}: {} {} region(s)",
            self.pid,
            regions.len(),
            filter
        );
        Ok(regions)
    }

    /// Acquire the process memory stream.
    ///
    /// Fails with [`Error::ProcessNotFound`] if the stream cannot be opened,
    /// either because the process exited or because access was denied.
    pub fn open_memory(&self, access: Access) -> Result<MemoryStream> {
        let path = self.mem_path();
        let file: File = match access {
            Access::Read => File::open(&path),
            Access::ReadWrite => OpenOptions::new().read(true).write(true).open(&path),
        }
        .map_err(|e| self.not_found(e))?;

        Ok(MemoryStream::new(file, access))
    }

    fn not_found(&self, e: std::io::Error) -> Error {
        Error::ProcessNotFound {
            pid: self.pid,
            reason: e.to_string(),
        }
    }
}

/// Enumerate the regions of `handle` accepted by `filter`.
pub fn list_regions(handle: &ProcessHandle, filter: RegionFilter) -> Result<Vec<MemoryRegion>> {
    handle.regions(filter)
}
