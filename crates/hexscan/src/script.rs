//! Patch scripts: a JSON description of a trainer
//!
//! ```json
//! {
//!   "process": "supertux2",
//!   "patches": [
//!     {
//!       "name": "infinite coins",
//!       "pattern": "2B D6 45 33 C9 44 0F B6 C7 48 8B CB E8",
//!       "region": "code",
//!       "action": { "type": "nop", "length": 2 }
//!     }
//!   ]
//! }
//! ```
//!
//! Every step locates its pattern (first match), adds `offset` and applies
//! its action through a [`PatchManager`], so the result can be restored.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::memory::{Access, MemoryAccessor, ProcessHandle, RegionFilter};
use crate::patch::{Patch, PatchManager};
use crate::scan::{Pattern, ScanConfig, Scanner, parse_hex_bytes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchAction {
    Nop { length: usize },
    /// Hex byte text, e.g. `"B8 01 00 00 00"`
    Write { bytes: String },
    WriteI32 { value: i32 },
    InvertJump { length: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchStep {
    pub name: String,
    pub pattern: Pattern,
    #[serde(default)]
    pub region: RegionFilter,
    /// Signed distance from the match to the patched address
    #[serde(default)]
    pub offset: i64,
    pub action: PatchAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchScript {
    /// Process name the script targets
    pub process: String,
    pub patches: Vec<PatchStep>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied { patch: Patch },
    NotFound,
    Failed { address: u64, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, StepOutcome::Applied { .. })
    }
}

pub fn load_script<P: AsRef<Path>>(path: P) -> Result<PatchScript> {
    let content = fs::read_to_string(&path)?;
    let script: PatchScript = serde_json::from_str(&content)?;
    script.validate()?;
    Ok(script)
}

pub fn save_script<P: AsRef<Path>>(path: P, script: &PatchScript) -> Result<()> {
    let content = serde_json::to_string_pretty(script)?;
    fs::write(path, content)?;
    Ok(())
}

impl PatchScript {
    /// Check every action before anything is scanned or written.
    pub fn validate(&self) -> Result<()> {
        for step in &self.patches {
            match &step.action {
                PatchAction::Nop { length: 0 } | PatchAction::InvertJump { length: 0 } => {
                    return Err(Error::InvalidPatch(format!(
                        "step '{}': length must be non-zero",
                        step.name
                    )));
                }
                PatchAction::Write { bytes } => {
                    parse_hex_bytes(bytes)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply all steps against `process`.
    ///
    /// Missing patterns and failed writes are reported per step and do not
    /// stop the remaining steps. A vanished process aborts the run.
    pub fn apply(
        &self,
        process: &ProcessHandle,
        manager: &mut PatchManager,
        config: &ScanConfig,
    ) -> Result<Vec<StepReport>> {
        self.validate()?;
        info!(
            "Applying {} patch step(s) to pid {}",
            self.patches.len(),
            process.pid
        );

        let memory = MemoryAccessor::new(process);
        let mut reports = Vec::with_capacity(self.patches.len());

        for step in &self.patches {
            let outcome = match self.locate(process, step, config)? {
                None => {
                    warn!("Step '{}': pattern {} not found", step.name, step.pattern);
                    StepOutcome::NotFound
                }
                Some(address) => match apply_action(manager, &memory, address, step) {
                    Ok(patch) => StepOutcome::Applied { patch },
                    Err(e @ Error::ProcessNotFound { .. }) => return Err(e),
                    Err(e) => {
                        warn!("Step '{}' failed at 0x{:X}: {}", step.name, address, e);
                        StepOutcome::Failed {
                            address,
                            error: e.to_string(),
                        }
                    }
                },
            };
            reports.push(StepReport {
                name: step.name.clone(),
                outcome,
            });
        }

        Ok(reports)
    }

    fn locate(
        &self,
        process: &ProcessHandle,
        step: &PatchStep,
        config: &ScanConfig,
    ) -> Result<Option<u64>> {
        let regions = process.regions(step.region)?;
        let stream = process.open_memory(Access::Read)?;
        let found = Scanner::with_config(&stream, config.clone()).find_first(&step.pattern, &regions)?;

        Ok(found.map(|hit| {
            let address = hit.wrapping_add_signed(step.offset);
            debug!(
                "Step '{}': match at 0x{:X}, patching 0x{:X}",
                step.name, hit, address
            );
            address
        }))
    }
}

fn apply_action(
    manager: &mut PatchManager,
    memory: &MemoryAccessor,
    address: u64,
    step: &PatchStep,
) -> Result<Patch> {
    let patch = match &step.action {
        PatchAction::Nop { length } => manager.nop(memory, address, *length, &step.name)?,
        PatchAction::Write { bytes } => {
            let bytes = parse_hex_bytes(bytes)?;
            manager.write(memory, address, &bytes, &step.name)?
        }
        PatchAction::WriteI32 { value } => {
            manager.write(memory, address, &value.to_le_bytes(), &step.name)?
        }
        PatchAction::InvertJump { length } => {
            manager.invert_jump(memory, address, *length, &step.name)?
        }
    };
    Ok(patch.clone())
}
