//! Write commands: raw bytes and typed `i32` values.
//!
//! Both print the bytes that were replaced so the change can be undone with
//! another `write`.

use anyhow::Result;
use hexscan::{MemoryAccessor, ReadMemory, WriteMemory, parse_hex_bytes};

use super::hex_utils::format_hex_bytes;
use crate::target::Target;

pub fn run(target: &Target, address: u64, bytes: &str) -> Result<()> {
    let bytes = parse_hex_bytes(bytes)?;
    let process = target.open()?;
    let memory = MemoryAccessor::new(&process);

    let original = memory.read_bytes(address, bytes.len())?;
    memory.write_bytes(address, &bytes)?;

    println!(
        "0x{:X}: {} -> {}",
        address,
        format_hex_bytes(&original),
        format_hex_bytes(&bytes)
    );
    Ok(())
}

pub fn run_i32(target: &Target, address: u64, value: i32) -> Result<()> {
    let process = target.open()?;
    let memory = MemoryAccessor::new(&process);

    let old = memory.read_i32(address)?;
    memory.write_i32(address, value)?;

    println!("0x{:X}: {} -> {}", address, old, value);
    Ok(())
}
