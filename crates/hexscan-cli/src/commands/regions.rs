//! Regions command implementation.
//!
//! Lists the memory regions of the target process, in the same order as
//! `/proc/<pid>/maps`.

use std::io::{self, Write};

use anyhow::Result;
use hexscan::{MemoryRegion, RegionFilter};

use crate::target::Target;

pub fn run(target: &Target, filter: RegionFilter, json: bool) -> Result<()> {
    let process = target.open()?;
    let regions = process.regions(filter)?;
    write_regions(&mut io::stdout().lock(), &regions, filter, json)
}

fn write_regions<W: Write>(
    out: &mut W,
    regions: &[MemoryRegion],
    filter: RegionFilter,
    json: bool,
) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, regions)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{} {} region(s):", regions.len(), filter)?;
    writeln!(out)?;
    for region in regions {
        writeln!(out, "{}", format_region(region))?;
    }

    let total: u64 = regions.iter().map(MemoryRegion::size).sum();
    writeln!(out)?;
    writeln!(
        out,
        "Total: {} bytes ({:.1} MiB)",
        total,
        total as f64 / (1024.0 * 1024.0)
    )?;

    Ok(())
}

fn format_region(region: &MemoryRegion) -> String {
    format!(
        "0x{:012X}-0x{:012X} {} {:>10} {}",
        region.start,
        region.end,
        region.permissions,
        region.size(),
        region.path.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}
