//! Scan command implementation.
//!
//! The needle is given as pattern text (`"2B D6 ?? 33"`), as an `i32`
//! value, or as a string encoded with any `encoding_rs` label.

use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use hexscan::{
    Access, Pattern, ProcessHandle, ReadMemory, RegionFilter, ScanConfig, ScanMode, ScanStats,
    Scanner,
};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::hex_utils::{format_hex_address, format_hex_bytes};
use crate::target::Target;

/// Bytes of context printed after each match
const CONTEXT_LEN: usize = 16;

/// What to search for
#[derive(Debug, Default)]
pub struct Needle {
    pub pattern: Option<String>,
    pub i32_val: Option<i32>,
    pub string: Option<String>,
    pub encoding: String,
}

impl Needle {
    pub fn to_pattern(&self) -> Result<Pattern> {
        if let Some(ref text) = self.pattern {
            return Ok(Pattern::parse(text)?);
        }
        if let Some(value) = self.i32_val {
            return Ok(Pattern::from_i32(value));
        }
        if let Some(ref s) = self.string {
            let encoding = Encoding::for_label(self.encoding.as_bytes())
                .with_context(|| format!("Unknown encoding: {}", self.encoding))?;
            return Ok(Pattern::from_bytes(&encode_string(s, encoding)?)?);
        }
        bail!("No search pattern specified. Use <PATTERN>, --i32 or --string");
    }
}

/// Encode `s` exactly as it would sit in memory under `encoding`.
fn encode_string(s: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    // encoding_rs only decodes UTF-16; its encoder falls back to UTF-8
    if encoding == UTF_16LE {
        return Ok(s.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == UTF_16BE {
        return Ok(s.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }
    if encoding.output_encoding() != encoding {
        bail!("Encoding {} cannot be used for --string", encoding.name());
    }

    let (encoded, _, had_errors) = encoding.encode(s);
    if had_errors {
        bail!("{:?} cannot be represented in {}", s, encoding.name());
    }
    Ok(encoded.into_owned())
}

#[derive(Serialize)]
struct ScanReport {
    pid: u32,
    pattern: String,
    filter: RegionFilter,
    matches: Vec<String>,
    stats: ScanStats,
}

pub fn run(
    target: &Target,
    needle: &Needle,
    filter: RegionFilter,
    mode: ScanMode,
    config: ScanConfig,
    json: bool,
) -> Result<()> {
    run_to(&mut io::stdout().lock(), target, needle, filter, mode, config, json)
}

fn run_to<W: Write>(
    out: &mut W,
    target: &Target,
    needle: &Needle,
    filter: RegionFilter,
    mode: ScanMode,
    config: ScanConfig,
    json: bool,
) -> Result<()> {
    // Malformed patterns fail before the process is touched
    let pattern = needle.to_pattern()?;
    let process = target.open()?;
    let regions = process.regions(filter)?;

    let stream = process.open_memory(Access::Read)?;
    let limit = config.limit;
    let (matches, stats) =
        Scanner::with_config(&stream, config).scan_with_stats(&pattern, &regions, mode)?;

    if json {
        let report = ScanReport {
            pid: process.pid,
            pattern: pattern.to_string(),
            filter,
            matches: matches.iter().copied().map(format_hex_address).collect(),
            stats,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "Searching for pattern: {} ({} bytes, {} wildcard(s))",
        pattern,
        pattern.len(),
        pattern.wildcard_count()
    )?;
    writeln!(
        out,
        "Scanned {} {} region(s), {} bytes",
        stats.regions, filter, stats.bytes_scanned
    )?;
    if stats.chunks_skipped > 0 {
        writeln!(out, "Skipped {} unreadable chunk(s)", stats.chunks_skipped)?;
    }
    writeln!(out)?;

    write_matches(out, &process, &matches)?;

    writeln!(out)?;
    writeln!(out, "Found {} result(s)", matches.len())?;
    if mode == ScanMode::All && limit.is_some_and(|limit| matches.len() >= limit) {
        writeln!(out, "(limit reached, use --limit to increase)")?;
    }

    Ok(())
}

fn write_matches<W: Write>(out: &mut W, process: &ProcessHandle, matches: &[u64]) -> Result<()> {
    let Ok(stream) = process.open_memory(Access::Read) else {
        return Ok(());
    };

    for (i, &address) in matches.iter().enumerate() {
        writeln!(out, "[{}] {}", i + 1, format_hex_address(address).green())?;
        if let Ok(context) = stream.read_bytes(address, CONTEXT_LEN) {
            writeln!(out, "     {}", format_hex_bytes(&context).dimmed())?;
        }
    }
    Ok(())
}
