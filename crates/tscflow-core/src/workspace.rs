//! Temporary compilation workspace.
//!
//! Each request gets its own uniquely named directory with two halves:
//! `src/` mirrors the resolved files relative to the common root, `out/`
//! receives compiler output. The directory is removed when the workspace is
//! dropped, so every exit path (errors and panics included) cleans up.

use crate::error::Result;
use crate::resolve::ResolvedSet;
use crate::rewrite::PathMapper;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tscflow_util::fs::atomic_write;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "tscflow-tmp-";

#[derive(Debug)]
pub struct TempWorkspace {
    dir: TempDir,
    src: PathBuf,
    out: PathBuf,
}

impl TempWorkspace {
    /// Create a fresh workspace below `parent`.
    pub fn create(parent: &Path) -> io::Result<Self> {
        fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)?;
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        fs::create_dir(&src)?;
        fs::create_dir(&out)?;
        tracing::trace!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir, src, out })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Mirror root of the resolved files.
    #[must_use]
    pub fn src_dir(&self) -> &Path {
        &self.src
    }

    /// Compiler output directory.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out
    }

    /// Write every resolved file into `src/` and return the mirrored paths in
    /// resolution order.
    pub fn materialize(&self, resolved: &ResolvedSet, mapper: &PathMapper) -> Result<Vec<PathBuf>> {
        resolved
            .files()
            .iter()
            .map(|file| {
                let mirrored = mapper.mirror(&file.path);
                atomic_write(&mirrored, &file.contents)?;
                Ok(mirrored)
            })
            .collect()
    }

    /// Every file the compiler wrote, sorted for deterministic output order.
    pub fn artifacts(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.out).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Remove the workspace, reporting failures the drop path would swallow.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::trace!(path = %path.display(), "removed workspace");
        Ok(())
    }
}
