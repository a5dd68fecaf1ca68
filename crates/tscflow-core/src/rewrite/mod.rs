//! Mapping compiler artifacts from the temporary workspace back to the
//! caller's tree.
//!
//! The compiler only ever sees the workspace, so every path it embeds in an
//! artifact (map `sources`, declaration `/// <reference path>`) points into
//! the workspace. [`PathMapper`] knows both layouts and translates.

pub mod source_map;

pub use source_map::SourceMap;

use indexmap::IndexMap;
use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tscflow_util::path::{normalize, relative_path, route_via, to_slash};

/// Translates workspace paths into final locations.
#[derive(Debug, Clone)]
pub struct PathMapper {
    cwd: PathBuf,
    workspace_src: PathBuf,
    common_root: PathBuf,
    /// Workspace artifact path to final output path.
    outputs: HashMap<PathBuf, PathBuf>,
}

impl PathMapper {
    #[must_use]
    pub fn new(cwd: &Path, workspace_src: &Path, common_root: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            workspace_src: workspace_src.to_path_buf(),
            common_root: common_root.to_path_buf(),
            outputs: HashMap::new(),
        }
    }

    /// Record where a workspace artifact ends up.
    pub fn add_output(&mut self, artifact: PathBuf, destination: PathBuf) {
        self.outputs.insert(artifact, destination);
    }

    /// Where a mirrored source file lives in the workspace.
    #[must_use]
    pub fn mirror(&self, original: &Path) -> PathBuf {
        self.workspace_src
            .join(relative_path(&self.common_root, original))
    }

    /// The original file behind a mirrored workspace path.
    #[must_use]
    pub fn original(&self, workspace_path: &Path) -> Option<PathBuf> {
        workspace_path
            .strip_prefix(&self.workspace_src)
            .ok()
            .map(|rel| self.common_root.join(rel))
    }

    /// Original file path relative to the common root, slash-separated.
    #[must_use]
    pub fn root_relative(&self, original: &Path) -> String {
        to_slash(&relative_path(&self.common_root, original))
    }

    /// Slash-separated route from final directory `from_dir` to whatever a
    /// workspace path stands for: another output, or an original file.
    #[must_use]
    pub fn route(&self, from_dir: &Path, workspace_path: &Path) -> Option<String> {
        if let Some(destination) = self.outputs.get(workspace_path) {
            return Some(to_slash(&relative_path(from_dir, destination)));
        }
        self.original(workspace_path)
            .map(|original| route_via(from_dir, &self.cwd, &original))
    }
}

/// Rewrite a map emitted into `artifact_dir` for its final location `map_dir`.
///
/// With a `source_root` override the map's root is exactly that value and
/// sources are listed relative to the common root. Otherwise each source is
/// a relative route from `map_dir` back to the original file.
#[must_use]
pub fn rewrite_source_map(
    mut map: SourceMap,
    mapper: &PathMapper,
    artifact_dir: &Path,
    map_dir: &Path,
    file_name: &str,
    source_root: Option<&str>,
) -> SourceMap {
    let emitted_root = map.source_root.take().unwrap_or_default();
    if emitted_root.contains("://") {
        // URL roots cannot be mapped back; keep the map as emitted.
        map.source_root = Some(emitted_root);
        map.file = Some(file_name.to_string());
        return map;
    }

    let base = artifact_dir.join(&emitted_root);
    map.sources = map
        .sources
        .iter()
        .map(|source| {
            let workspace_path = normalize(&base.join(source));
            let original = mapper.original(&workspace_path);
            match (original, source_root) {
                (Some(original), Some(_)) => mapper.root_relative(&original),
                (Some(_), None) => mapper
                    .route(map_dir, &workspace_path)
                    .unwrap_or_else(|| source.clone()),
                (None, _) => source.clone(),
            }
        })
        .collect();

    map.source_root = Some(source_root.unwrap_or_default().to_string());
    map.file = Some(file_name.to_string());
    map
}

fn reference_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(///\s*<reference\s+path\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid reference regex")
    })
}

/// Rewrite `/// <reference path>` directives of a declaration emitted into
/// `artifact_dir` for its final directory `output_dir`.
#[must_use]
pub fn rewrite_declaration(
    text: &str,
    mapper: &PathMapper,
    artifact_dir: &Path,
    output_dir: &Path,
) -> String {
    reference_path_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let (quote, path) = match (caps.get(2), caps.get(3)) {
                (Some(p), _) => ('"', p.as_str()),
                (None, Some(p)) => ('\'', p.as_str()),
                (None, None) => ('"', ""),
            };
            let workspace_path = normalize(&artifact_dir.join(path));
            let routed = mapper
                .route(output_dir, &workspace_path)
                .unwrap_or_else(|| path.to_string());
            format!("{}{quote}{routed}{quote}", &caps[1])
        })
        .into_owned()
}

/// Apply the first matching prefix substitution to a root-relative path.
///
/// Prefixes match whole components: `proj-a` maps `proj-a/main.js` but not
/// `proj-ab/main.js`.
#[must_use]
pub fn apply_path_filter(rel: &Path, filter: &IndexMap<String, String>) -> PathBuf {
    for (from, to) in filter {
        let prefix = Path::new(from.trim_matches('/'));
        if let Ok(rest) = rel.strip_prefix(prefix) {
            return normalize(&Path::new(to.trim_start_matches('/')).join(rest));
        }
    }
    rel.to_path_buf()
}
