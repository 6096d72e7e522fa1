// exec.rs — Run a command inside a space and mirror its exit status.

use std::io::Write;
use std::time::Duration;

use sk_exec::{ExecRequest, SpaceExecutor};
use sk_space::SpaceConfig;

use super::open_manager;

pub fn execute(
    config: &SpaceConfig,
    space: &str,
    cwd: Option<&str>,
    shell: bool,
    timeout: Option<u64>,
    command: &[String],
) -> anyhow::Result<()> {
    let Some((program, args)) = command.split_first() else {
        anyhow::bail!("no command given");
    };

    let mut request = if shell {
        ExecRequest::shell(command.join(" "))
    } else {
        ExecRequest::new(program.as_str()).args(args.iter().cloned())
    };
    request.cwd = cwd.map(str::to_string);
    // The exit code is mirrored below instead of reported as an error.
    request.check = false;
    if let Some(secs) = timeout {
        request.timeout = Some(Duration::from_secs(secs));
    }

    let mut executor = SpaceExecutor::new(open_manager(config)?);
    let output = executor.run_in_space(space, &request)?;

    std::io::stdout().write_all(output.stdout.as_bytes())?;
    std::io::stderr().write_all(output.stderr.as_bytes())?;
    std::io::stdout().flush()?;

    match output.status {
        Some(0) => Ok(()),
        Some(code) => std::process::exit(code),
        None => anyhow::bail!("'{}' was terminated by a signal", request.display()),
    }
}
