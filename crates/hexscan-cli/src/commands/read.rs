//! Read commands: hexdump and typed `i32` reads.

use anyhow::Result;
use hexscan::{MemoryAccessor, ReadMemory};

use super::hex_utils::hexdump_lines;
use crate::target::Target;

/// Run the hexdump command
pub fn run(target: &Target, address: u64, size: usize, ascii: bool) -> Result<()> {
    let process = target.open()?;
    let reader = MemoryAccessor::new(&process);
    let bytes = reader.read_bytes(address, size)?;

    println!("Hexdump at 0x{:X} ({} bytes):", address, size);
    println!();
    for line in hexdump_lines(address, &bytes, ascii) {
        println!("{}", line);
    }

    Ok(())
}

pub fn run_i32(target: &Target, address: u64) -> Result<()> {
    let process = target.open()?;
    let value = MemoryAccessor::new(&process).read_i32(address)?;
    println!("0x{:X}: {} (0x{:08X})", address, value, value as u32);
    Ok(())
}
