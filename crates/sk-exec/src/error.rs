// error.rs — Error types for command execution inside spaces.

use std::time::Duration;
use thiserror::Error;

use sk_space::SpaceError;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Space lookup or working-directory resolution failed.
    #[error(transparent)]
    Space(#[from] SpaceError),

    /// The process could not be started.
    #[error("failed to start '{command}' in space '{space}': {source}")]
    SpawnFailed {
        space: String,
        command: String,
        source: std::io::Error,
    },

    /// The process exited unsuccessfully and the request asked for a check.
    #[error("'{command}' in space '{space}' exited with {}: {stderr}", .code.map_or("a signal".to_string(), |c| format!("code {c}")))]
    NonZeroExit {
        space: String,
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The process ran past its deadline and was killed.
    #[error("'{command}' in space '{space}' timed out after {timeout:?}")]
    Timeout {
        space: String,
        command: String,
        timeout: Duration,
    },

    /// Waiting on or collecting output from the process failed.
    #[error("I/O error while running '{command}' in space '{space}': {source}")]
    Io {
        space: String,
        command: String,
        source: std::io::Error,
    },
}

impl ExecError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecError::Space(e) => e.error_code(),
            ExecError::SpawnFailed { .. } => "COMMAND_SPAWN_FAILED",
            ExecError::NonZeroExit { .. } => "COMMAND_FAILED",
            ExecError::Timeout { .. } => "COMMAND_TIMEOUT",
            ExecError::Io { .. } => "COMMAND_IO_FAILED",
        }
    }
}
