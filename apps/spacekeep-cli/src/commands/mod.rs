pub mod exec;
pub mod file;
pub mod space;

use sk_space::{SpaceConfig, SpaceManager};

/// Open a manager and bring its index in line with the tree.
pub fn open_manager(config: &SpaceConfig) -> anyhow::Result<SpaceManager> {
    let mut manager = SpaceManager::open(config.clone())?;
    manager.refresh()?;
    Ok(manager)
}

/// Shorten `s` to at most `max` characters, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
