//! Resolving `--pid` / `--name` into a process handle.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Args;
use hexscan::ProcessHandle;
use hexscan::memory::DEFAULT_PROC_ROOT;
use tracing::{debug, info};

/// Process selection shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Target process ID
    #[arg(short, long, global = true, conflicts_with = "name")]
    pub pid: Option<u32>,

    /// Target process name (case-insensitive substring of /proc/<pid>/comm)
    #[arg(short, long, global = true)]
    pub name: Option<String>,

    /// procfs mount point
    #[arg(long, global = true, env = "HEXSCAN_PROC_ROOT", default_value = DEFAULT_PROC_ROOT)]
    pub proc_root: PathBuf,
}

impl Target {
    pub fn open(&self) -> Result<ProcessHandle> {
        self.open_or(None)
    }

    /// Like [`Target::open`], falling back to `default_name` when neither
    /// `--pid` nor `--name` was given.
    pub fn open_or(&self, default_name: Option<&str>) -> Result<ProcessHandle> {
        let pid = match (self.pid, self.name.as_deref().or(default_name)) {
            (Some(pid), _) => pid,
            (None, Some(name)) => match find_pid_by_name(&self.proc_root, name)? {
                Some(pid) => pid,
                None => bail!("No running process matches '{}'", name),
            },
            (None, None) => bail!("No target process specified. Use --pid or --name"),
        };

        let process = ProcessHandle::open_in(&self.proc_root, pid)?;
        // stdout is reserved for command output such as --json
        info!("Found process (PID: {})", process.pid);
        Ok(process)
    }
}

/// Find the lowest PID whose `comm` contains `name`, ignoring case.
pub fn find_pid_by_name(proc_root: &Path, name: &str) -> Result<Option<u32>> {
    let needle = name.to_lowercase();
    let mut pids: Vec<u32> = fs::read_dir(proc_root)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .collect();
    pids.sort_unstable();

    for pid in pids {
        // Processes can exit between listing and reading
        let Ok(comm) = fs::read_to_string(proc_root.join(pid.to_string()).join("comm")) else {
            continue;
        };
        if comm.trim().to_lowercase().contains(&needle) {
            debug!("'{}' matched pid {} ({})", name, pid, comm.trim());
            return Ok(Some(pid));
        }
    }

    Ok(None)
}
