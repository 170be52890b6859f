#![allow(dead_code)]

use std::fs;
use std::path::Path;

use hostprobe::system::procfs::ProcFs;
use tempfile::TempDir;

pub const TICKS_PER_SECOND: u64 = 100;

/// A throwaway procfs tree on disk.
pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    pub fn new() -> Self {
        FakeProc {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn procfs(&self) -> ProcFs {
        ProcFs::new(self.path()).with_ticks_per_second(Some(TICKS_PER_SECOND))
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(path, contents).expect("failed to write fake record");
    }

    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.path().join(relative)).expect("failed to create dir");
    }

    pub fn system_stat(&self, user: u64, nice: u64, system: u64, idle: u64) {
        self.write(
            "stat",
            &format!(
                "cpu  {user} {nice} {system} {idle} 0 0 0 0 0 0\ncpu0 {user} {nice} {system} {idle} 0 0 0 0 0 0\nintr 0\n"
            ),
        );
    }

    pub fn uptime(&self, seconds: f64) {
        self.write("uptime", &format!("{seconds:.2} 0.00\n"));
    }

    /// A process with full comm, status and stat records.
    pub fn process(&self, pid: u32, name: &str, utime: u64, stime: u64, starttime: u64) {
        self.write(&format!("{pid}/comm"), &format!("{name}\n"));
        self.write(
            &format!("{pid}/status"),
            &format!(
                "Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nTgid:\t{pid}\nPid:\t{pid}\nVmRSS:\t   11264 kB\nThreads:\t1\n"
            ),
        );
        self.write(
            &format!("{pid}/stat"),
            &stat_line(pid, name, utime, stime, starttime),
        );
    }
}

/// A stat record with every numeric field zero except utime, stime and
/// starttime (whole-line token indices 13, 14 and 21).
pub fn stat_line(pid: u32, comm: &str, utime: u64, stime: u64, starttime: u64) -> String {
    let mut tokens = vec!["0".to_string(); 52];
    tokens[0] = pid.to_string();
    tokens[1] = format!("({comm})");
    tokens[2] = "S".to_string();
    tokens[13] = utime.to_string();
    tokens[14] = stime.to_string();
    tokens[21] = starttime.to_string();
    format!("{}\n", tokens.join(" "))
}
