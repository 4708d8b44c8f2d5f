//! Read/write traits over process memory and the per-call accessor

use tracing::debug;

use super::process::ProcessHandle;
use super::stream::Access;
use crate::error::{Error, Result};

/// x86 single-byte no-operation
pub const NOP: u8 = 0x90;

pub trait ReadMemory {
    /// Read exactly `len` bytes at `address`.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(i32::from_le_bytes(read_array(self, address)?))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(u32::from_le_bytes(read_array(self, address)?))
    }

    fn read_i64(&self, address: u64) -> Result<i64> {
        Ok(i64::from_le_bytes(read_array(self, address)?))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        Ok(u64::from_le_bytes(read_array(self, address)?))
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        Ok(f32::from_le_bytes(read_array(self, address)?))
    }
}

pub trait WriteMemory {
    /// Write all of `data` at `address`.
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;

    fn write_i32(&self, address: u64, value: i32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u32(&self, address: u64, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u64(&self, address: u64, value: u64) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_f32(&self, address: u64, value: f32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Overwrite `len` bytes with [`NOP`].
    fn nop(&self, address: u64, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.write_bytes(address, &vec![NOP; len])
    }
}

fn read_array<R: ReadMemory + ?Sized, const N: usize>(reader: &R, address: u64) -> Result<[u8; N]> {
    let bytes = reader.read_bytes(address, N)?;
    bytes
        .try_into()
        .map_err(|_| Error::RegionUnreadable { address, len: N })
}

/// Memory access that opens the process stream for each call.
///
/// Every read or write acquires its own stream and releases it before
/// returning, on success and on failure alike. For many reads in a row
/// (scanning) acquire one [`MemoryStream`](super::MemoryStream) instead.
pub struct MemoryAccessor<'a> {
    process: &'a ProcessHandle,
}

impl<'a> MemoryAccessor<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        self.process
    }
}

impl ReadMemory for MemoryAccessor<'_> {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let stream = self.process.open_memory(Access::Read)?;
        stream.read_bytes(address, len)
    }
}

impl WriteMemory for MemoryAccessor<'_> {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        let stream = self.process.open_memory(Access::ReadWrite)?;
        stream.write_bytes(address, data)?;
        debug!(
            "Wrote {} byte(s) to pid {} at 0x{:X}",
            data.len(),
            self.process.pid,
            address
        );
        Ok(())
    }
}
