//! Scoped process memory stream (`/proc/<pid>/mem`)

use std::fs::File;
use std::os::unix::fs::FileExt;

use super::reader::{ReadMemory, WriteMemory};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    ReadWrite,
}

/// An open memory stream of one process.
///
/// I/O is positional (`pread`/`pwrite`), so no seek state is shared between
/// calls. The descriptor is closed when the stream is dropped.
#[derive(Debug)]
pub struct MemoryStream {
    file: File,
    access: Access,
}

impl MemoryStream {
    pub(crate) fn new(file: File, access: Access) -> Self {
        Self { file, access }
    }

    pub fn access(&self) -> Access {
        self.access
    }
}

impl ReadMemory for MemoryStream {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.file
            .read_exact_at(&mut buffer, address)
            .map_err(|_| Error::RegionUnreadable { address, len })?;
        Ok(buffer)
    }
}

impl WriteMemory for MemoryStream {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        if self.access != Access::ReadWrite {
            return Err(Error::WriteFailure {
                address,
                len: data.len(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "memory stream opened read-only",
                ),
            });
        }

        self.file
            .write_all_at(data, address)
            .map_err(|source| Error::WriteFailure {
                address,
                len: data.len(),
                source,
            })
    }
}
