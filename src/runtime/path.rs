//! Lexical path helpers. Nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without following symlinks.
/// A `..` that would climb above the start of the path is kept.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Whether `path` lies inside `dir` (or is `dir`), compared component by
/// component after normalization. `/opt/bin/../../etc` is not under `/opt`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let path = normalize_path(path);
    let dir = normalize_path(dir);
    path.starts_with(&dir)
}

/// Sibling of `dest` that a file is written to before being renamed into place.
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Make a link target absolute relative to the directory holding the link.
pub(crate) fn resolve_link_target(link: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        normalize_path(target)
    } else {
        let parent = link.parent().unwrap_or(Path::new("."));
        normalize_path(&parent.join(target))
    }
}
