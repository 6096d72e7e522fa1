//! # sk-exec
//!
//! Runs external commands with a space (or a directory inside it) as the
//! working directory. The working directory is boundary-checked like any
//! other path; the command itself is not sandboxed.

pub mod error;
pub mod executor;

pub use error::ExecError;
pub use executor::{ExecOutput, ExecRequest, SpaceExecutor, DEFAULT_TIMEOUT};
