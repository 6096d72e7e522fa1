// resolver.rs — Boundary-checked path resolution.
//
// Every operation that touches the filesystem on behalf of a space goes
// through `resolve()`. The joined path is normalized lexically (`.` and
// `..` folded, redundant separators dropped) and must still sit under the
// root, compared component by component so `/spaces/a1` is never treated
// as inside `/spaces/a`.
//
// Normalization is lexical: targets usually don't exist yet, so
// canonicalize() is not an option. Symlinks inside a space are followed
// by the OS as usual.

use std::path::{Component, Path, PathBuf};

use crate::error::SpaceError;

/// Join `relative` onto `root` and reject the result if it leaves `root`.
///
/// Returns the normalized absolute path. An absolute `relative` replaces
/// the root entirely (as `Path::join` does) and is therefore rejected
/// unless it happens to point inside the root.
pub fn resolve(root: &Path, relative: impl AsRef<Path>) -> Result<PathBuf, SpaceError> {
    let relative = relative.as_ref();
    let root = normalize(root);
    let resolved = normalize(&root.join(relative));

    if !is_within(&root, &resolved) {
        tracing::debug!(
            "rejected path '{}': {} is outside {}",
            relative.display(),
            resolved.display(),
            root.display()
        );
        return Err(SpaceError::PathEscape {
            root,
            requested: relative.to_string_lossy().into_owned(),
            resolved,
        });
    }

    Ok(resolved)
}

/// True when `path` equals `root` or lies below it (component-wise).
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// A `..` at the filesystem root stays at the root. Leading `..` of a
/// relative path are kept, since there is nothing to fold them into.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
