//! Fake procfs tree for tests: `<root>/<pid>/{maps,mem}`
//!
//! `mem` is a sparse regular file where the file offset equals the virtual
//! address, so reads past its end behave like unmapped memory.

use std::fs::{self, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct ProcFixture {
    dir: TempDir,
    pid: u32,
}

impl ProcFixture {
    pub fn new(pid: u32) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(pid.to_string())).unwrap();
        let fixture = Self { dir, pid };
        fixture.write_maps("");
        fs::write(fixture.process_dir().join("mem"), b"").unwrap();
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn process_dir(&self) -> PathBuf {
        self.dir.path().join(self.pid.to_string())
    }

    pub fn write_maps(&self, content: &str) {
        fs::write(self.process_dir().join("maps"), content).unwrap();
    }

    pub fn write_mem(&self, address: u64, data: &[u8]) {
        let file = OpenOptions::new()
            .write(true)
            .open(self.process_dir().join("mem"))
            .unwrap();
        file.write_all_at(data, address).unwrap();
    }

    /// Simulate process exit.
    pub fn remove(&self) {
        fs::remove_dir_all(self.process_dir()).unwrap();
    }
}
