//! Cleanup of descendants that leave their run's process group.
//!
//! Killing a run's process group misses anything that moved to another group
//! or session (`setsid`, double forks). To catch those, this process registers
//! itself as a child subreaper: orphans left behind by a run are reparented
//! here instead of to init. After every run, each adopted process whose group
//! does not belong to a live run is killed and reaped.
//!
//! Consequence: a process embedding the runner must not start children of its
//! own outside [`crate::Sandbox`], since they are indistinguishable from
//! adopted orphans.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, warn};

const SWEEP_PASSES: usize = 3;
const REAP_POLL: Duration = Duration::from_millis(10);
const REAP_DEADLINE: Duration = Duration::from_millis(500);

/// Process groups of runs whose leader has not been waited for yet
static LIVE_GROUPS: Mutex<BTreeSet<i32>> = Mutex::new(BTreeSet::new());
static SUBREAPER: OnceLock<bool> = OnceLock::new();

/// Registers this process as a child subreaper, once.
///
/// Returns whether adopted descendants can be swept on this host.
pub fn enable() -> bool {
    *SUBREAPER.get_or_init(|| {
        #[cfg(target_os = "linux")]
        {
            match nix::sys::prctl::set_child_subreaper(true) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to become child subreaper: {}", e);
                    false
                }
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    })
}

fn live_groups() -> MutexGuard<'static, BTreeSet<i32>> {
    LIVE_GROUPS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Holds the registry lock while a run leader is spawned, so a concurrent
/// sweep never sees the new leader before it is registered.
pub struct Registration {
    guard: MutexGuard<'static, BTreeSet<i32>>,
}

pub fn registration() -> Registration {
    Registration {
        guard: live_groups(),
    }
}

impl Registration {
    /// Marks the group led by `pid` as live until the returned guard drops
    pub fn track(mut self, pid: u32) -> LiveGroup {
        let pgid = pid as i32;
        self.guard.insert(pgid);
        LiveGroup { pgid }
    }
}

/// A registered run leader
#[derive(Debug)]
pub struct LiveGroup {
    pgid: i32,
}

impl LiveGroup {
    pub fn pgid(&self) -> Pid {
        Pid::from_raw(self.pgid)
    }
}

impl Drop for LiveGroup {
    fn drop(&mut self) {
        live_groups().remove(&self.pgid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stray {
    pid: i32,
    pgid: i32,
}

/// Kills and reaps every adopted process outside the live groups.
///
/// Returns how many processes were swept.
pub async fn sweep() -> usize {
    if !enable() {
        return 0;
    }

    let mut swept = 0;
    for _ in 0..SWEEP_PASSES {
        let strays = strays();
        if strays.is_empty() {
            break;
        }

        for stray in &strays {
            let target = Pid::from_raw(stray.pid);
            // A stray leading its own group takes that whole group with it.
            let result = if stray.pgid == stray.pid {
                killpg(target, Signal::SIGKILL)
            } else {
                kill(target, Signal::SIGKILL)
            };
            match result {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill escaped process {}: {}", stray.pid, e),
            }
        }
        for stray in &strays {
            reap(Pid::from_raw(stray.pid)).await;
        }
        swept += strays.len();
    }

    if swept > 0 {
        debug!("Swept {} escaped descendant(s)", swept);
    }
    swept
}

fn strays() -> Vec<Stray> {
    let me = std::process::id() as i32;
    // Held for the whole scan; see `Registration`.
    let live = live_groups();

    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list /proc: {}", e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
        .filter_map(|pid| {
            let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
            let (ppid, pgid) = parse_stat(&stat)?;
            (ppid == me && !live.contains(&pgid)).then_some(Stray { pid, pgid })
        })
        .collect()
}

/// Parent pid and process group from `/proc/<pid>/stat`
fn parse_stat(stat: &str) -> Option<(i32, i32)> {
    // The command name is parenthesised and may itself contain parentheses.
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace().skip(1);
    let ppid = fields.next()?.parse().ok()?;
    let pgid = fields.next()?.parse().ok()?;
    Some((ppid, pgid))
}

async fn reap(pid: Pid) {
    let deadline = Instant::now() + REAP_DEADLINE;
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) if Instant::now() < deadline => {
                time::sleep(REAP_POLL).await
            }
            Ok(WaitStatus::StillAlive) => {
                warn!("Process {} survived SIGKILL past the reap deadline", pid);
                return;
            }
            Ok(_) | Err(Errno::ECHILD) => return,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!("Failed to reap process {}: {}", pid, e);
                return;
            }
        }
    }
}
