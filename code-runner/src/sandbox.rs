use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{ChildStdin, Command},
    sync::Notify,
    task::JoinHandle,
    time::{self, Duration},
};
use tracing::{debug, warn};

use crate::{error::Error, reaper, types::ResourceLimits};

const BASE_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
const READ_CHUNK: usize = 8 * 1024;
/// How long pipes may stay open after the process group is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(ExitStatus),
    TimedOut,
    OutputLimitExceeded,
    /// Exited, but something outside its process group kept the output
    /// pipes open past the drain grace period
    Detached,
}

/// Captured result of one child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(status) => status.code(),
            _ => None,
        }
    }

    /// Signal that killed the process, when it did not exit on its own
    pub fn exit_signal(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(status) => status.signal(),
            _ => None,
        }
    }
}

/// Spawns child processes under fixed resource limits.
///
/// Every child runs in its own process group with a cleared environment,
/// `RLIMIT_CPU` and `RLIMIT_FSIZE` applied, and is killed together with its
/// descendants once it exits, times out or floods its output. Descendants
/// that left the group are swept by `reaper::sweep`.
#[derive(Debug, Clone)]
pub struct Sandbox {
    workdir: PathBuf,
    home: Option<PathBuf>,
    env: Vec<(String, String)>,
    limits: ResourceLimits,
    spawned: Arc<AtomicUsize>,
}

impl Sandbox {
    pub fn new(workdir: PathBuf, limits: ResourceLimits) -> Self {
        reaper::enable();
        Self {
            workdir,
            home: None,
            env: Vec::new(),
            limits,
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A sandbox sharing limits and counters, whose children use `home` as
    /// both `HOME` and working directory and get `env` on top of the
    /// minimal environment
    pub fn scoped(&self, home: PathBuf, env: Vec<(String, String)>) -> Self {
        Self {
            home: Some(home),
            env,
            ..self.clone()
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Number of child processes started so far
    pub fn spawned_processes(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Run `argv` to completion, feeding `input` to its stdin when given
    pub async fn execute(&self, argv: &[String], input: Option<&str>) -> Result<ProcessOutput, Error> {
        let (cmd, args) = argv
            .split_first()
            .ok_or_else(|| Error::System("Empty command line".to_string()))?;
        let program = resolve_program(cmd)?;
        let home = self.home.as_deref().unwrap_or(&self.workdir);

        debug!("Sandbox execute - Command: {}", program.display());
        debug!("Sandbox execute - Args: {:?}", args);

        let mut command = Command::new(&program);
        command
            .args(args)
            .env_clear()
            .env("PATH", search_path(&program))
            .env("HOME", home)
            .env("LANG", "C.UTF-8")
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(home)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .process_group(0)
            .kill_on_drop(true);

        let file_size = self.limits.file_size;
        let cpu_time = self.limits.cpu_time;

        unsafe {
            command.pre_exec(move || {
                setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size)
                    .map_err(std::io::Error::from)?;
                setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time)
                    .map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let started = Instant::now();
        let (mut child, live) = {
            let registration = reaper::registration();
            let child = command.spawn().map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    Error::ToolchainUnavailable(format!("{}: {}", program.display(), e))
                }
                _ => Error::Spawn(format!("{}: {}", program.display(), e)),
            })?;
            let live = child.id().map(|id| registration.track(id));
            (child, live)
        };
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let group = live.as_ref().map(reaper::LiveGroup::pgid);
        let overflow = Arc::new(Notify::new());
        let cap = self.limits.max_output_bytes;
        let stdout_capture = Arc::new(Capture::default());
        let stderr_capture = Arc::new(Capture::default());

        let stdin_task = match (child.stdin.take(), input) {
            (Some(stdin), Some(input)) => Some(tokio::spawn(feed_stdin(stdin, input.to_owned()))),
            _ => None,
        };
        let stdout_task = child.stdout.take().map(|out| {
            tokio::spawn(read_capped(out, cap, stdout_capture.clone(), overflow.clone()))
        });
        let stderr_task = child.stderr.take().map(|err| {
            tokio::spawn(read_capped(err, cap, stderr_capture.clone(), overflow.clone()))
        });

        let mut termination = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Termination::Exited(status),
                Err(e) => {
                    kill_group(group);
                    return Err(Error::System(format!("Process error: {}", e)));
                }
            },
            _ = time::sleep(self.limits.wall_clock_timeout) => Termination::TimedOut,
            _ = overflow.notified() => Termination::OutputLimitExceeded,
        };

        // Descendants must not outlive the request or keep our pipes open.
        kill_group(group);
        if !matches!(termination, Termination::Exited(_)) {
            let _ = child.wait().await;
        }
        drop(live);
        reaper::sweep().await;

        if let Some(task) = stdin_task {
            join_within(task, DRAIN_GRACE).await;
        }
        let mut drained = true;
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            drained &= join_within(task, DRAIN_GRACE).await;
        }

        let (stdout, stdout_truncated) = stdout_capture.take();
        let (stderr, stderr_truncated) = stderr_capture.take();

        if (stdout_truncated || stderr_truncated) && termination != Termination::TimedOut {
            termination = Termination::OutputLimitExceeded;
        }
        if !drained && matches!(termination, Termination::Exited(_)) {
            warn!(
                "{} exited but its output stayed open past {:?}",
                program.display(),
                DRAIN_GRACE
            );
            termination = Termination::Detached;
        }

        let elapsed = started.elapsed();
        debug!("Sandbox execute - {:?} after {:?}", termination, elapsed);

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            termination,
            elapsed,
        })
    }
}

/// Programs with a path component are used as-is, bare names go through `which`
fn resolve_program(cmd: &str) -> Result<PathBuf, Error> {
    if cmd.contains('/') {
        let path = PathBuf::from(cmd);
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Spawn(format!("Program not found: {}", cmd)))
        }
    } else {
        which::which(cmd).map_err(|_| Error::ToolchainUnavailable(format!("Command not found: {}", cmd)))
    }
}

/// Minimal PATH, with the program's own directory first so toolchains that
/// live outside the system directories still find their helpers.
fn search_path(program: &Path) -> String {
    match program.parent().and_then(Path::to_str) {
        Some(dir) if !dir.is_empty() && !BASE_PATH.split(':').any(|p| p == dir) => {
            format!("{}:{}", dir, BASE_PATH)
        }
        _ => BASE_PATH.to_string(),
    }
}

fn kill_group(group: Option<Pid>) {
    if let Some(pgid) = group {
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
            Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
        }
    }
}

async fn feed_stdin(mut stdin: ChildStdin, input: String) {
    if let Err(e) = stdin.write_all(input.as_bytes()).await {
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            debug!("Failed to write input: {}", e);
        }
    }
    // Dropping stdin closes the pipe and signals EOF.
    let _ = stdin.shutdown().await;
}

/// Bytes read from one stream so far. Lives outside the reader task so a
/// reader aborted after the grace period still leaves its prefix behind.
#[derive(Debug, Default)]
struct Capture {
    bytes: Mutex<Vec<u8>>,
    truncated: AtomicBool,
}

impl Capture {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take(&self) -> (Vec<u8>, bool) {
        (
            std::mem::take(&mut *self.lock()),
            self.truncated.load(Ordering::SeqCst),
        )
    }
}

/// Reads until EOF, keeping at most `cap` bytes. Crossing the cap notifies
/// `overflow` once; the rest of the stream is drained and discarded.
async fn read_capped<R>(mut reader: R, cap: usize, capture: Arc<Capture>, overflow: Arc<Notify>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Output stream closed with error: {}", e);
                break;
            }
        };

        let overflowed = {
            let mut captured = capture.lock();
            let room = cap.saturating_sub(captured.len());
            captured.extend_from_slice(&buf[..n.min(room)]);
            n > room
        };
        if overflowed && !capture.truncated.swap(true, Ordering::SeqCst) {
            overflow.notify_one();
        }
    }
}

/// Whether `task` finished within `grace`; it is aborted otherwise
async fn join_within<T>(mut task: JoinHandle<T>, grace: Duration) -> bool {
    match time::timeout(grace, &mut task).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Stream task failed: {}", e);
            true
        }
        Err(_) => {
            task.abort();
            warn!("Stream task did not finish within {:?}", grace);
            false
        }
    }
}
