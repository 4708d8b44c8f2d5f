//! Run command implementation: apply a JSON patch script.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use hexscan::{MemoryAccessor, PatchManager, ScanConfig, StepOutcome, StepReport, load_script};
use owo_colors::OwoColorize;
use tracing::info;

use super::hex_utils::format_hex_bytes;
use crate::target::Target;

pub fn run(
    target: &Target,
    script_path: &Path,
    config: ScanConfig,
    hold: bool,
    json: bool,
) -> Result<()> {
    let script = load_script(script_path).map_err(|e| {
        if e.is_not_found() {
            anyhow!("Script file not found: {}", script_path.display())
        } else {
            e.into()
        }
    })?;
    info!(
        "Loaded {} step(s) from {}",
        script.patches.len(),
        script_path.display()
    );

    let process = target.open_or(Some(&script.process))?;
    let mut manager = PatchManager::new();
    let reports = script.apply(&process, &mut manager, &config)?;

    write_reports(&mut io::stdout().lock(), &reports, json)?;

    let applied = reports.iter().filter(|r| r.is_applied()).count();

    if hold && applied > 0 {
        println!("Press Enter to restore the original bytes...");
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;

        let memory = MemoryAccessor::new(&process);
        let restored = manager.restore_all(&memory)?;
        println!("Restored {} patch(es)", restored);
    }

    if applied < reports.len() {
        bail!("{} step(s) were not applied", reports.len() - applied);
    }
    Ok(())
}

fn write_reports<W: Write>(out: &mut W, reports: &[StepReport], json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, reports)?;
        writeln!(out)?;
        return Ok(());
    }

    for report in reports {
        writeln!(out, "{}", format_report(report))?;
    }
    let applied = reports.iter().filter(|r| r.is_applied()).count();
    writeln!(out)?;
    writeln!(out, "Applied {}/{} patch(es)", applied, reports.len())?;
    Ok(())
}

fn format_report(report: &StepReport) -> String {
    match &report.outcome {
        StepOutcome::Applied { patch } => format!(
            "{} {}: 0x{:X} {} -> {}",
            "[ok]".green(),
            report.name,
            patch.address,
            format_hex_bytes(&patch.original),
            format_hex_bytes(&patch.patched)
        ),
        StepOutcome::NotFound => format!("{} {}: pattern not found", "[--]".yellow(), report.name),
        StepOutcome::Failed { address, error } => {
            format!("{} {}: 0x{:X} {}", "[!!]".red(), report.name, address, error)
        }
    }
}
