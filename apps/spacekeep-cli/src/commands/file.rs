// file.rs — File subcommands: get, set, rm, ls, mtime, dump.

use std::io::Read;

use clap::Subcommand;
use sk_files::{Content, FileKind, SpaceFileManager};
use sk_space::SpaceConfig;

use super::open_manager;

#[derive(Subcommand)]
pub enum FileCommands {
    /// Print a file. YAML and JSON files are printed as pretty JSON.
    Get {
        space: String,
        path: String,
        /// Print the stored text without decoding.
        #[arg(long)]
        raw: bool,
    },
    /// Write a file from an argument or stdin.
    Set {
        space: String,
        path: String,
        /// Content to write; read from stdin when omitted.
        #[arg(long)]
        content: Option<String>,
        /// Parse the content as JSON and store it as YAML/JSON by extension.
        #[arg(long)]
        structured: bool,
    },
    /// Delete a file.
    Rm { space: String, path: String },
    /// List files in a space.
    Ls {
        space: String,
        /// Include files in subdirectories.
        #[arg(long, short)]
        recursive: bool,
    },
    /// Print a file's modification time.
    Mtime { space: String, path: String },
    /// Print every file with its content (binary files are marked).
    Dump {
        space: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: &FileCommands, config: &SpaceConfig) -> anyhow::Result<()> {
    let mut files = SpaceFileManager::new(open_manager(config)?);

    match cmd {
        FileCommands::Get { space, path, raw } => get(&mut files, space, path, *raw),
        FileCommands::Set {
            space,
            path,
            content,
            structured,
        } => set(&mut files, space, path, content.as_deref(), *structured),
        FileCommands::Rm { space, path } => {
            files.delete_file(space, path)?;
            println!("Deleted '{}' from space '{}'", path, space);
            Ok(())
        }
        FileCommands::Ls { space, recursive } => {
            for name in files.list_files(space, *recursive)? {
                println!("{}", name);
            }
            Ok(())
        }
        FileCommands::Mtime { space, path } => {
            println!("{}", files.file_last_modified(space, path)?.to_rfc3339());
            Ok(())
        }
        FileCommands::Dump { space, json } => dump(&mut files, space, *json),
    }
}

fn get(files: &mut SpaceFileManager, space: &str, path: &str, raw: bool) -> anyhow::Result<()> {
    if raw {
        print!("{}", files.read_file(space, path)?);
        return Ok(());
    }
    match files.load_file(space, path)? {
        Content::Text(text) => print!("{}", text),
        Content::Structured(value) => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}

fn set(
    files: &mut SpaceFileManager,
    space: &str,
    path: &str,
    content: Option<&str>,
    structured: bool,
) -> anyhow::Result<()> {
    let text = match content {
        Some(c) => c.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let content = if structured {
        Content::Structured(serde_json::from_str(&text)?)
    } else {
        Content::Text(text)
    };
    files.write_file(space, path, &content)?;
    println!("Wrote '{}' in space '{}'", path, space);
    Ok(())
}

fn dump(files: &mut SpaceFileManager, space: &str, json: bool) -> anyhow::Result<()> {
    let entries = files.list_files_content(space)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        match (entry.kind, &entry.file_content) {
            (FileKind::Ascii, Some(text)) => {
                println!("==> {} <==", entry.file_name);
                println!("{}", text.trim_end());
            }
            _ => println!("==> {} <== (binary)", entry.file_name),
        }
    }
    Ok(())
}
