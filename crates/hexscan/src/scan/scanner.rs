//! Chunked AOB scanner over process memory regions
//!
//! Regions are read in chunks of at most `chunk_size` bytes. The last
//! `pattern.len() - 1` bytes of each chunk are carried into the next one, so
//! a match that straddles a chunk boundary is still found exactly once.
//! Nothing is carried across regions or across a chunk that failed to read.

use serde::Serialize;
use tracing::{debug, info};

use super::constants::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use super::pattern::Pattern;
use crate::error::Result;
use crate::memory::{Access, MemoryRegion, ProcessHandle, ReadMemory, RegionFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Stop at the first match
    First,
    /// Collect every match
    All,
}

/// Configuration for [`Scanner`]
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Bytes requested per read
    pub chunk_size: usize,
    /// Maximum matches collected in [`ScanMode::All`]
    pub limit: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
        }
    }
}

impl ScanConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }
}

/// Builder for ScanConfig
#[derive(Debug, Clone, Default)]
pub struct ScanConfigBuilder {
    chunk_size: Option<usize>,
    limit: Option<usize>,
}

impl ScanConfigBuilder {
    /// Set the chunk size, clamped to at least one byte
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(MIN_CHUNK_SIZE));
        self
    }

    /// Cap the number of collected matches
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScanConfig {
        let default = ScanConfig::default();
        ScanConfig {
            chunk_size: self.chunk_size.unwrap_or(default.chunk_size),
            limit: self.limit.or(default.limit),
        }
    }
}

/// Counters gathered during one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub regions: usize,
    pub chunks_read: usize,
    pub chunks_skipped: usize,
    pub bytes_scanned: u64,
}

pub struct Scanner<'a, R: ReadMemory> {
    reader: &'a R,
    config: ScanConfig,
}

impl<'a, R: ReadMemory> Scanner<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self::with_config(reader, ScanConfig::default())
    }

    pub fn with_config(reader: &'a R, config: ScanConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `regions` in order.
    ///
    /// In [`ScanMode::First`] the result holds at most one address.
    pub fn scan(
        &self,
        pattern: &Pattern,
        regions: &[MemoryRegion],
        mode: ScanMode,
    ) -> Result<Vec<u64>> {
        self.scan_with_stats(pattern, regions, mode)
            .map(|(matches, _)| matches)
    }

    pub fn find_first(&self, pattern: &Pattern, regions: &[MemoryRegion]) -> Result<Option<u64>> {
        let matches = self.scan(pattern, regions, ScanMode::First)?;
        Ok(matches.first().copied())
    }

    pub fn find_all(&self, pattern: &Pattern, regions: &[MemoryRegion]) -> Result<Vec<u64>> {
        self.scan(pattern, regions, ScanMode::All)
    }

    pub fn scan_with_stats(
        &self,
        pattern: &Pattern,
        regions: &[MemoryRegion],
        mode: ScanMode,
    ) -> Result<(Vec<u64>, ScanStats)> {
        let limit = match mode {
            ScanMode::First => 1,
            ScanMode::All => self.config.limit.unwrap_or(usize::MAX),
        };

        debug!(
            "Scanning {} region(s) for {} ({:?}, chunk {} bytes)",
            regions.len(),
            pattern,
            mode,
            self.config.chunk_size
        );

        let mut results = Vec::new();
        let mut stats = ScanStats::default();

        for region in regions {
            if results.len() >= limit {
                break;
            }
            stats.regions += 1;
            self.scan_region(pattern, region, limit, &mut results, &mut stats)?;
        }

        info!(
            "Scan finished: {} match(es), {} bytes in {} chunk(s), {} chunk(s) unreadable",
            results.len(),
            stats.bytes_scanned,
            stats.chunks_read,
            stats.chunks_skipped
        );
        Ok((results, stats))
    }

    fn scan_region(
        &self,
        pattern: &Pattern,
        region: &MemoryRegion,
        limit: usize,
        results: &mut Vec<u64>,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let keep = pattern.len() - 1;
        let chunk_size = self.config.chunk_size.max(MIN_CHUNK_SIZE) as u64;
        let mut tail: Vec<u8> = Vec::new();
        let mut addr = region.start;

        while addr < region.end {
            let read_size = chunk_size.min(region.end - addr) as usize;

            let chunk = match self.reader.read_bytes(addr, read_size) {
                Ok(bytes) => bytes,
                Err(e) if e.is_recoverable() => {
                    debug!("Skipping unreadable chunk at 0x{:X}: {}", addr, e);
                    stats.chunks_skipped += 1;
                    tail.clear();
                    addr += read_size as u64;
                    continue;
                }
                Err(e) => return Err(e),
            };
            stats.chunks_read += 1;
            stats.bytes_scanned += chunk.len() as u64;

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);
            let data_base = addr - tail.len() as u64;

            collect_matches(&data, data_base, pattern, limit - results.len(), results);
            if results.len() >= limit {
                return Ok(());
            }

            tail = data[data.len().saturating_sub(keep)..].to_vec();
            addr += read_size as u64;
        }

        Ok(())
    }
}

/// Every offset in `buffer` where `pattern` matches, as `base + offset`.
pub fn find_matches(buffer: &[u8], base: u64, pattern: &Pattern) -> Vec<u64> {
    let mut results = Vec::new();
    collect_matches(buffer, base, pattern, usize::MAX, &mut results);
    results
}

fn collect_matches(
    buffer: &[u8],
    base: u64,
    pattern: &Pattern,
    max: usize,
    results: &mut Vec<u64>,
) {
    if max == 0 || pattern.is_empty() || buffer.len() < pattern.len() {
        return;
    }

    let len = pattern.len();
    let last = buffer.len() - len;
    let mut found = 0;

    let mut check = |start: usize| {
        if pattern.matches(&buffer[start..start + len]) {
            results.push(base + start as u64);
            found += 1;
        }
        found < max
    };

    match pattern.anchor() {
        // Candidates are the positions where the first concrete byte occurs.
        Some((offset, byte)) => {
            for start in memchr::memchr_iter(byte, &buffer[offset..=last + offset]) {
                if !check(start) {
                    return;
                }
            }
        }
        None => {
            for start in 0..=last {
                if !check(start) {
                    return;
                }
            }
        }
    }
}

/// Scan `regions` of `handle` through one read-only memory stream.
pub fn scan(
    handle: &ProcessHandle,
    pattern: &Pattern,
    regions: &[MemoryRegion],
    mode: ScanMode,
    config: ScanConfig,
) -> Result<Vec<u64>> {
    let stream = handle.open_memory(Access::Read)?;
    Scanner::with_config(&stream, config).scan(pattern, regions, mode)
}

/// Parse `pattern_text`, enumerate regions matching `filter` and scan them.
///
/// The pattern is validated before the process is touched.
pub fn scan_process(
    handle: &ProcessHandle,
    pattern_text: &str,
    filter: RegionFilter,
    mode: ScanMode,
    config: ScanConfig,
) -> Result<Vec<u64>> {
    let pattern = Pattern::parse(pattern_text)?;
    let regions = handle.regions(filter)?;
    scan(handle, &pattern, &regions, mode, config)
}
