//! In-memory stand-in for process memory, used by unit tests

use std::cell::{Cell, RefCell};

use super::reader::{ReadMemory, WriteMemory};
use super::region::{MemoryRegion, Permissions};
use crate::error::{Error, Result};

struct MockRegion {
    base: u64,
    data: RefCell<Vec<u8>>,
}

impl MockRegion {
    fn range(&self, address: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.data.borrow().len()).then_some(start..end)
    }
}

pub struct MockMemory {
    pid: u32,
    regions: Vec<MockRegion>,
    unreadable: Vec<(u64, u64)>,
    gone: Cell<bool>,
    reads: Cell<usize>,
    largest_read: Cell<usize>,
}

impl MockMemory {
    /// Simulate process exit: every following access fails.
    pub fn terminate(&self) {
        self.gone.set(true);
    }

    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    pub fn largest_read(&self) -> usize {
        self.largest_read.get()
    }

    /// Regions as a maps listing would describe them (`rwxp`).
    pub fn regions(&self) -> Vec<MemoryRegion> {
        self.regions
            .iter()
            .map(|r| MemoryRegion {
                start: r.base,
                end: r.base + r.data.borrow().len() as u64,
                permissions: Permissions {
                    readable: true,
                    writable: true,
                    executable: true,
                    shared: false,
                },
                offset: 0,
                path: None,
            })
            .collect()
    }

    fn check_alive(&self) -> Result<()> {
        if self.gone.get() {
            return Err(Error::ProcessNotFound {
                pid: self.pid,
                reason: "terminated".to_string(),
            });
        }
        Ok(())
    }

    fn overlaps_unreadable(&self, address: u64, len: usize) -> bool {
        let end = address + len as u64;
        self.unreadable
            .iter()
            .any(|&(start, stop)| address < stop && start < end)
    }
}

impl ReadMemory for MockMemory {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        self.check_alive()?;
        self.reads.set(self.reads.get() + 1);
        self.largest_read.set(self.largest_read.get().max(len));

        if self.overlaps_unreadable(address, len) {
            return Err(Error::RegionUnreadable { address, len });
        }

        self.regions
            .iter()
            .find_map(|r| r.range(address, len).map(|range| r.data.borrow()[range].to_vec()))
            .ok_or(Error::RegionUnreadable { address, len })
    }
}

impl WriteMemory for MockMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.check_alive()?;

        let region = self
            .regions
            .iter()
            .find_map(|r| r.range(address, data.len()).map(|range| (r, range)));

        match region {
            Some((r, range)) => {
                r.data.borrow_mut()[range].copy_from_slice(data);
                Ok(())
            }
            None => Err(Error::WriteFailure {
                address,
                len: data.len(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "unmapped"),
            }),
        }
    }
}

#[derive(Default)]
pub struct MockMemoryBuilder {
    regions: Vec<(u64, Vec<u8>)>,
    unreadable: Vec<(u64, u64)>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, base: u64, data: Vec<u8>) -> Self {
        self.regions.push((base, data));
        self
    }

    /// Make `[start, end)` fail on read even though it is mapped.
    pub fn unreadable(mut self, start: u64, end: u64) -> Self {
        self.unreadable.push((start, end));
        self
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            pid: 1,
            regions: self
                .regions
                .into_iter()
                .map(|(base, data)| MockRegion {
                    base,
                    data: RefCell::new(data),
                })
                .collect(),
            unreadable: self.unreadable,
            gone: Cell::new(false),
            reads: Cell::new(0),
            largest_read: Cell::new(0),
        }
    }
}
