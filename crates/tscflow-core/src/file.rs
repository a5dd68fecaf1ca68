//! Virtual files: the unit exchanged with callers on both sides of a compile.

use crate::rewrite::SourceMap;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tscflow_util::path::{absolutize, is_declaration_file, relative_path};

/// An in-memory file with the directory context it was read from.
///
/// `path` and `base` are absolute. `relative()` is the path below `base`,
/// which is where a destination writer places the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    cwd: PathBuf,
    base: PathBuf,
    path: PathBuf,
    contents: Vec<u8>,
    source_map: Option<SourceMap>,
}

impl VirtualFile {
    /// Create a file. Relative `path`s are taken relative to `cwd`; the base
    /// defaults to the file's own directory.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        let cwd = cwd.into();
        let path = absolutize(&cwd, path.as_ref());
        let base = path.parent().map_or_else(|| cwd.clone(), Path::to_path_buf);
        Self {
            cwd,
            base,
            path,
            contents: contents.into(),
            source_map: None,
        }
    }

    /// Read a file from disk.
    pub fn read(cwd: impl Into<PathBuf>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let cwd = cwd.into();
        let contents = std::fs::read(absolutize(&cwd, path.as_ref()))?;
        Ok(Self::new(cwd, path, contents))
    }

    /// Set the base directory (e.g. the static prefix of the glob that matched).
    #[must_use]
    pub fn with_base(mut self, base: impl AsRef<Path>) -> Self {
        self.base = absolutize(&self.cwd, base.as_ref());
        self
    }

    #[must_use]
    pub fn with_source_map(mut self, map: SourceMap) -> Self {
        self.source_map = Some(map);
        self
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Contents as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    /// Parsed source map attached to a compiled output.
    #[must_use]
    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }

    /// Path relative to `base`.
    #[must_use]
    pub fn relative(&self) -> PathBuf {
        relative_path(&self.base, &self.path)
    }

    #[must_use]
    pub fn is_declaration(&self) -> bool {
        is_declaration_file(&self.path)
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.contents
    }
}
