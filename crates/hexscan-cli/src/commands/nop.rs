//! NOP command implementation.
//!
//! Either NOPs a known address, or scans for a pattern first and NOPs the
//! first match. The replaced bytes are printed as a ready-to-run `write`
//! command that undoes the patch.

use anyhow::{Result, bail};
use hexscan::{Access, MemoryAccessor, PatchManager, Pattern, RegionFilter, ScanConfig, Scanner};
use owo_colors::OwoColorize;

use super::hex_utils::format_hex_bytes;
use crate::target::Target;

pub fn run(
    target: &Target,
    address: Option<u64>,
    pattern: Option<&str>,
    len: usize,
    filter: RegionFilter,
    config: ScanConfig,
) -> Result<()> {
    let pattern = pattern.map(Pattern::parse).transpose()?;
    let process = target.open()?;

    let address = match (address, pattern) {
        (Some(address), _) => address,
        (None, Some(pattern)) => {
            println!("Searching for AOB: {}", pattern);
            let regions = process.regions(filter)?;
            let stream = process.open_memory(Access::Read)?;
            match Scanner::with_config(&stream, config).find_first(&pattern, &regions)? {
                Some(address) => {
                    println!("Found at: 0x{:X}", address);
                    address
                }
                None => bail!("AOB not found"),
            }
        }
        (None, None) => bail!("No address specified. Use <ADDRESS> or --pattern"),
    };

    let memory = MemoryAccessor::new(&process);
    let mut manager = PatchManager::new();
    let patch = manager.nop(&memory, address, len, "nop")?;

    println!("Original bytes: {}", format_hex_bytes(&patch.original));
    println!("{}", format!("NOPed {} byte(s) at 0x{:X}", len, address).green());
    println!();
    println!("To restore, run:");
    println!(
        "  hexscan --pid {} write 0x{:X} \"{}\"",
        process.pid,
        address,
        format_hex_bytes(&patch.original)
    );

    Ok(())
}
