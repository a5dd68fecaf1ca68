//! Lexical path helpers.
//!
//! Nothing here touches the filesystem: paths are compared and combined
//! component by component, so callers must pass absolute, comparable paths
//! where the docs say so.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by removing `.` and resolving `..` components.
///
/// A `..` that would climb above the root (or above the start of a relative
/// path) is kept for relative paths and dropped for absolute ones.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Resolve `path` against `base` unless it is already absolute, then normalize.
#[must_use]
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Compute the relative path that leads from directory `from` to `to`.
///
/// Both paths should be absolute and normalized. When they share no root
/// (different Windows drives), `to` is returned unchanged.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    if from.first() != to_parts.first() {
        return to.to_path_buf();
    }

    let shared = from
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in shared..from.len() {
        result.push("..");
    }
    for part in &to_parts[shared..] {
        result.push(part.as_os_str());
    }
    result
}

/// Render a path with forward slashes regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Build the slash-separated route from directory `from` to `to` that passes
/// through the directory `via`.
///
/// The route first climbs from `from` to `via`, then descends to `to`:
/// `route_via("/w/build/out", "/w", "/w/src/a.ts")` is `../../src/a.ts`.
/// Unlike [`relative_path`], shared leading components are not collapsed, so
/// the route from `/w/src` to `/w/src/a.ts` through `/w` is `../src/a.ts`.
#[must_use]
pub fn route_via(from: &Path, via: &Path, to: &Path) -> String {
    let up = to_slash(&relative_path(from, via));
    let down = to_slash(&relative_path(via, to));
    match (up.is_empty(), down.is_empty()) {
        (true, _) => down,
        (false, true) => up,
        (false, false) => format!("{up}/{down}"),
    }
}

/// Longest common ancestor directory of a set of directories.
///
/// Returns `None` for an empty set or when the paths share no root.
#[must_use]
pub fn common_ancestor<'a, I>(dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = dirs.into_iter();
    let first = iter.next()?;
    let mut common: Vec<Component<'a>> = first.components().collect();

    for dir in iter {
        let shared = common
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }

    if common.is_empty() {
        None
    } else {
        Some(common.iter().collect())
    }
}

/// Whether `path` is a TypeScript declaration file (`*.d.ts`).
#[must_use]
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts"))
}
