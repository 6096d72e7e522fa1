// space.rs — Space subcommands: create, delete, list, show, refresh,
// mtime, mkdir, rmdir.

use sk_space::{DeletePolicy, Space, SpaceConfig};

use super::{open_manager, truncate};

pub fn create(
    config: &SpaceConfig,
    name: &str,
    label: &str,
    parent: Option<&str>,
) -> anyhow::Result<()> {
    let mut manager = open_manager(config)?;
    let space = manager.create_space(name, label, parent)?;

    println!("Space created: {}", space.name);
    println!("  Path:  {}", space.path.display());
    if !space.label.is_empty() {
        println!("  Label: {}", space.label);
    }
    Ok(())
}

pub fn delete(config: &SpaceConfig, name: &str, refuse_nested: bool) -> anyhow::Result<()> {
    let mut manager = open_manager(config)?;
    let policy = if refuse_nested {
        DeletePolicy::RefuseIfNested
    } else {
        DeletePolicy::Cascade
    };
    manager.delete_space(name, policy)?;
    println!("Space deleted: {}", name);
    Ok(())
}

pub fn list(config: &SpaceConfig, label: Option<&str>, json: bool) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let spaces = manager.list_spaces(label);

    if json {
        println!("{}", serde_json::to_string_pretty(&spaces)?);
        return Ok(());
    }

    if spaces.is_empty() {
        println!("No spaces found.");
        return Ok(());
    }

    println!("{:<24} {:<16} {:<26} {:<40}", "NAME", "LABEL", "CREATED", "PATH");
    println!("{}", "-".repeat(108));
    for s in &spaces {
        println!(
            "{:<24} {:<16} {:<26} {:<40}",
            truncate(&s.name, 22),
            truncate(&s.label, 14),
            s.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            s.path.display(),
        );
    }
    println!("\n{} space(s) total.", spaces.len());
    Ok(())
}

pub fn show(config: &SpaceConfig, name: &str, json: bool) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let Some(space) = manager.get_space(name) else {
        anyhow::bail!("space '{}' does not exist", name);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(space)?);
    } else {
        print_space(space);
    }
    Ok(())
}

fn print_space(s: &Space) {
    println!("Space:     {}", s.name);
    println!("Label:     {}", if s.label.is_empty() { "-" } else { &s.label });
    println!("Path:      {}", s.path.display());
    println!("Created:   {}", s.created_at.to_rfc3339());
    if !s.subspaces.is_empty() {
        println!("Subspaces: {}", s.subspaces.join(", "));
    }
}

pub fn refresh(config: &SpaceConfig) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    println!(
        "Index rebuilt: {} space(s), snapshot at {}",
        manager.count_spaces(),
        manager.index().snapshot_path().display()
    );
    Ok(())
}

pub fn mtime(config: &SpaceConfig, name: &str, subdir: Option<&str>) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let latest = manager.last_modified(name, subdir)?;
    println!("{}", latest.to_rfc3339());
    Ok(())
}

pub fn mkdir(config: &SpaceConfig, name: &str, path: &str) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let created = manager.create_directory(name, path)?;
    println!("Created {}", created.display());
    Ok(())
}

pub fn rmdir(config: &SpaceConfig, name: &str, path: &str) -> anyhow::Result<()> {
    let mut manager = open_manager(config)?;
    manager.remove_directory(name, path)?;
    println!("Removed '{}' from space '{}'", path, name);
    Ok(())
}
