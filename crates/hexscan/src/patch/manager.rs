use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use super::jump;
use crate::error::{Error, Result};
use crate::memory::{NOP, ReadMemory, WriteMemory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatchKind {
    Nop,
    Write,
    InvertJump,
}

/// One applied (or restored) modification of process memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub address: u64,
    pub original: Vec<u8>,
    pub patched: Vec<u8>,
    pub description: String,
    pub kind: PatchKind,
    pub active: bool,
    pub applied_at: DateTime<Utc>,
}

/// Tracks patches by address so they can be restored.
#[derive(Debug, Default)]
pub struct PatchManager {
    patches: BTreeMap<u64, Patch>,
}

impl PatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `len` bytes at `address` with NOPs.
    ///
    /// Re-applying the same NOP to an address returns the active patch
    /// unchanged. Any other active patch at `address` is an error.
    pub fn nop<M: ReadMemory + WriteMemory>(
        &mut self,
        memory: &M,
        address: u64,
        len: usize,
        description: &str,
    ) -> Result<&Patch> {
        if len == 0 {
            return Err(Error::InvalidPatch("NOP length must be non-zero".to_string()));
        }
        if let Some(active) = self.patches.get(&address).filter(|p| p.active) {
            if active.kind != PatchKind::Nop || active.original.len() != len {
                return Err(Error::InvalidPatch(format!(
                    "0x{:X} already has an active {}-byte {} patch",
                    address,
                    active.original.len(),
                    active.kind
                )));
            }
            return Ok(&self.patches[&address]);
        }

        let original = memory.read_bytes(address, len)?;
        self.apply(memory, address, original, vec![NOP; len], PatchKind::Nop, description)
    }

    /// Write arbitrary bytes at `address`, remembering what was there.
    pub fn write<M: ReadMemory + WriteMemory>(
        &mut self,
        memory: &M,
        address: u64,
        bytes: &[u8],
        description: &str,
    ) -> Result<&Patch> {
        if bytes.is_empty() {
            return Err(Error::InvalidPatch("patch bytes are empty".to_string()));
        }
        self.ensure_unpatched(address)?;

        let original = memory.read_bytes(address, bytes.len())?;
        self.apply(
            memory,
            address,
            original,
            bytes.to_vec(),
            PatchKind::Write,
            description,
        )
    }

    /// Invert the conditional jump of `len` bytes at `address`.
    pub fn invert_jump<M: ReadMemory + WriteMemory>(
        &mut self,
        memory: &M,
        address: u64,
        len: usize,
        description: &str,
    ) -> Result<&Patch> {
        if len == 0 {
            return Err(Error::InvalidPatch("jump length must be non-zero".to_string()));
        }
        self.ensure_unpatched(address)?;

        let original = memory.read_bytes(address, len)?;
        let patched = jump::invert_condition(&original).ok_or_else(|| {
            Error::InvalidPatch(format!(
                "instruction at 0x{:X} is not a conditional jump",
                address
            ))
        })?;

        if let (Some(from), Some(to)) = (jump::mnemonic(&original), jump::mnemonic(&patched)) {
            info!("Inverting {} -> {} at 0x{:X}", from, to, address);
        }

        let description = if description.is_empty() {
            "Inverted conditional jump"
        } else {
            description
        };
        self.apply(
            memory,
            address,
            original,
            patched,
            PatchKind::InvertJump,
            description,
        )
    }

    /// Write the original bytes back.
    ///
    /// Restoring an inactive patch succeeds without touching memory.
    pub fn restore<W: WriteMemory>(&mut self, memory: &W, address: u64) -> Result<()> {
        let patch = self
            .patches
            .get_mut(&address)
            .ok_or_else(|| Error::InvalidPatch(format!("no patch at 0x{:X}", address)))?;

        if !patch.active {
            return Ok(());
        }

        memory.write_bytes(address, &patch.original)?;
        patch.active = false;
        info!("Restored original bytes at 0x{:X}", address);
        Ok(())
    }

    /// Restore every active patch, returning how many were restored.
    ///
    /// All patches are attempted; the first failure is returned afterwards.
    pub fn restore_all<W: WriteMemory>(&mut self, memory: &W) -> Result<usize> {
        let active: Vec<u64> = self.active_addresses().collect();
        let mut restored = 0;
        let mut first_error = None;

        for address in active {
            match self.restore(memory, address) {
                Ok(()) => restored += 1,
                Err(e) => {
                    warn!("Failed to restore patch at 0x{:X}: {}", address, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(restored),
        }
    }

    pub fn is_patched(&self, address: u64) -> bool {
        self.patches.get(&address).is_some_and(|p| p.active)
    }

    pub fn get(&self, address: u64) -> Option<&Patch> {
        self.patches.get(&address)
    }

    /// All recorded patches in address order.
    pub fn patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.values()
    }

    fn active_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.patches.values().filter(|p| p.active).map(|p| p.address)
    }

    fn ensure_unpatched(&self, address: u64) -> Result<()> {
        if self.is_patched(address) {
            return Err(Error::InvalidPatch(format!(
                "0x{:X} already has an active patch, restore it first",
                address
            )));
        }
        Ok(())
    }

    fn apply<W: WriteMemory>(
        &mut self,
        memory: &W,
        address: u64,
        original: Vec<u8>,
        patched: Vec<u8>,
        kind: PatchKind,
        description: &str,
    ) -> Result<&Patch> {
        memory.write_bytes(address, &patched)?;
        info!(
            "Applied {} patch at 0x{:X} ({} bytes)",
            kind,
            address,
            patched.len()
        );

        let patch = Patch {
            address,
            original,
            patched,
            description: description.to_string(),
            kind,
            active: true,
            applied_at: Utc::now(),
        };
        self.patches.insert(address, patch);
        Ok(&self.patches[&address])
    }
}
