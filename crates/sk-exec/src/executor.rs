// executor.rs — SpaceExecutor: run a process inside a space.
//
// The child's stdout and stderr are drained on helper threads so a chatty
// process can't block on a full pipe while we poll for the deadline.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use sk_space::{LocalStore, SpaceManager, SpaceStore};

use crate::error::ExecError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Deadline applied unless a request sets its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A command to run inside a space.
///
/// By default a request fails on a non-zero exit and is killed after
/// [`DEFAULT_TIMEOUT`]; use `check(false)` / `without_timeout()` to opt out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory relative to the space root.
    pub cwd: Option<String>,
    /// Extra environment variables on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    /// Treat a non-zero exit as an error.
    pub check: bool,
    /// Run `program` through `sh -c`.
    pub use_shell: bool,
}

impl Default for ExecRequest {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            check: true,
            use_shell: false,
        }
    }
}

impl ExecRequest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// A shell command line, run with `sh -c`.
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            program: command.into(),
            use_shell: true,
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Human-readable command line, used in logs and errors.
    pub fn display(&self) -> String {
        if self.use_shell || self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = if self.use_shell {
            let mut sh = Command::new("sh");
            sh.arg("-c").arg(&self.program);
            // Extra args become $0, $1, ... of the script.
            if !self.args.is_empty() {
                sh.arg("sh").args(&self.args);
            }
            sh
        } else {
            let mut direct = Command::new(&self.program);
            direct.args(&self.args);
            direct
        };
        cmd.envs(&self.env);
        cmd
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs commands with a space as working directory.
pub struct SpaceExecutor<S: SpaceStore = LocalStore> {
    spaces: SpaceManager<S>,
}

impl<S: SpaceStore> SpaceExecutor<S> {
    pub fn new(spaces: SpaceManager<S>) -> Self {
        Self { spaces }
    }

    pub fn spaces(&self) -> &SpaceManager<S> {
        &self.spaces
    }

    pub fn into_inner(self) -> SpaceManager<S> {
        self.spaces
    }

    /// Working directory a request would run in.
    pub fn working_dir(&mut self, space: &str, cwd: Option<&str>) -> Result<PathBuf, ExecError> {
        self.spaces.refresh()?;
        let dir = match cwd {
            Some(rel) => self.spaces.resolve_in_space(space, rel)?,
            None => self.spaces.space_path(space)?,
        };
        Ok(dir)
    }

    /// Run `request` in the named space and wait for it to finish.
    pub fn run_in_space(&mut self, space: &str, request: &ExecRequest) -> Result<ExecOutput, ExecError> {
        let dir = self.working_dir(space, request.cwd.as_deref())?;
        let command = request.display();
        tracing::info!("running '{}' in space '{}' ({})", command, space, dir.display());

        let mut child = request
            .command()
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::SpawnFailed {
                space: space.to_string(),
                command: command.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let io_failed = |source: std::io::Error| ExecError::Io {
            space: space.to_string(),
            command: command.clone(),
            source,
        };

        let status = match request.timeout {
            Some(limit) => match wait_with_deadline(&mut child, limit).map_err(io_failed)? {
                Some(status) => status,
                None => {
                    tracing::warn!("'{}' in space '{}' timed out, killing", command, space);
                    // The child may have exited between the last poll and the kill.
                    let _ = child.kill();
                    child.wait().map_err(io_failed)?;
                    return Err(ExecError::Timeout {
                        space: space.to_string(),
                        command,
                        timeout: limit,
                    });
                }
            },
            None => child.wait().map_err(io_failed)?,
        };

        let output = ExecOutput {
            status: status.code(),
            stdout: collect(stdout).map_err(io_failed)?,
            stderr: collect(stderr).map_err(io_failed)?,
        };
        tracing::debug!("'{}' exited with {:?}", command, output.status);

        if request.check && !output.success() {
            return Err(ExecError::NonZeroExit {
                space: space.to_string(),
                command,
                code: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Drain) -> std::io::Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_args() {
        let req = ExecRequest::new("ls").args(["-l", "-a"]);
        assert_eq!(req.display(), "ls -l -a");
        assert_eq!(ExecRequest::shell("echo hi | wc -c").display(), "echo hi | wc -c");
    }

    #[test]
    fn builder_sets_fields() {
        let req = ExecRequest::new("env")
            .cwd("work")
            .env("A", "1")
            .timeout(Duration::from_secs(2))
            .check(true);
        assert_eq!(req.cwd.as_deref(), Some("work"));
        assert_eq!(req.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(req.timeout, Some(Duration::from_secs(2)));
        assert!(req.check);
        assert!(!req.use_shell);
    }

    #[test]
    fn defaults_check_and_time_out() {
        let req = ExecRequest::new("true");
        assert!(req.check);
        assert_eq!(req.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(ExecRequest::shell("true").timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(req.without_timeout().timeout, None);
    }

    #[test]
    fn output_success_requires_zero() {
        let out = |status| ExecOutput {
            status,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(out(Some(0)).success());
        assert!(!out(Some(2)).success());
        assert!(!out(None).success());
    }
}
