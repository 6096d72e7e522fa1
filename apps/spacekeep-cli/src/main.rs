//! # spacekeep
//!
//! Command-line interface for spacekeep spaces.
//!
//! - `spacekeep create/delete/list/show/refresh` — manage spaces
//! - `spacekeep mkdir/rmdir/mtime` — directories and recency inside a space
//! - `spacekeep file get/set/rm/ls/mtime/dump` — files inside a space
//! - `spacekeep exec` — run a command with a space as working directory

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sk_space::SpaceConfig;

/// Manage named spaces on top of a directory tree.
#[derive(Parser)]
#[command(name = "spacekeep", version, about)]
struct Cli {
    /// Base directory (overrides SPACEKEEP_BASE and the platform default).
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a space.
    Create {
        /// Space name (a single path component).
        name: String,
        #[arg(long, default_value = "")]
        label: String,
        /// Existing space (optionally followed by /sub/dirs) to nest under.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a space and everything below it.
    Delete {
        name: String,
        /// Fail instead of deleting spaces nested inside this one.
        #[arg(long)]
        refuse_nested: bool,
    },
    /// List spaces.
    List {
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one space.
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Rescan the spaces directory and rewrite the index.
    Refresh,
    /// Latest modification time in a space.
    Mtime {
        name: String,
        /// Subdirectory of the space to inspect.
        #[arg(long)]
        subdir: Option<String>,
    },
    /// Create a directory inside a space.
    Mkdir { name: String, path: String },
    /// Remove a directory tree inside a space.
    Rmdir { name: String, path: String },
    /// Work with files inside a space.
    File {
        #[command(subcommand)]
        command: commands::file::FileCommands,
    },
    /// Run a command with a space as working directory.
    Exec {
        name: String,
        /// Working directory relative to the space.
        #[arg(long)]
        cwd: Option<String>,
        /// Run the command line through `sh -c`.
        #[arg(long)]
        shell: bool,
        /// Kill the command after this many seconds (default 30).
        #[arg(long)]
        timeout: Option<u64>,
        /// Command and arguments.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = SpaceConfig::load(cli.base_dir.as_deref())?;
    config.ensure_directories()?;
    logging::init(&config, cli.verbose)?;

    let result = match &cli.command {
        Commands::Create {
            name,
            label,
            parent,
        } => commands::space::create(&config, name, label, parent.as_deref()),
        Commands::Delete {
            name,
            refuse_nested,
        } => commands::space::delete(&config, name, *refuse_nested),
        Commands::List { label, json } => commands::space::list(&config, label.as_deref(), *json),
        Commands::Show { name, json } => commands::space::show(&config, name, *json),
        Commands::Refresh => commands::space::refresh(&config),
        Commands::Mtime { name, subdir } => {
            commands::space::mtime(&config, name, subdir.as_deref())
        }
        Commands::Mkdir { name, path } => commands::space::mkdir(&config, name, path),
        Commands::Rmdir { name, path } => commands::space::rmdir(&config, name, path),
        Commands::File { command } => commands::file::execute(command, &config),
        Commands::Exec {
            name,
            cwd,
            shell,
            timeout,
            command,
        } => commands::exec::execute(&config, name, cwd.as_deref(), *shell, *timeout, command),
    };

    if let Err(ref e) = result {
        tracing::error!("{:#}", e);
    }
    result
}
