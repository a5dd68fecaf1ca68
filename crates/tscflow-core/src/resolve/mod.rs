//! Transitive dependency discovery.
//!
//! Inputs can pull in files outside the supplied set through reference
//! directives and relative imports. Those files have to be compiled along
//! with the inputs and they take part in the common-root computation, so
//! `proj-a/main.ts` referencing `../proj-b/util.ts` produces `proj-a/main.js`
//! and `proj-b/util.js` below the output root.

pub mod scan;

pub use scan::{scan_references, Reference, ReferenceKind};

use crate::error::{Error, Result};
use crate::file::VirtualFile;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tscflow_util::fs::read_to_string_lossy;
use tscflow_util::path::{common_ancestor, is_declaration_file, normalize};

/// Extensions tried, in order, for an extensionless module specifier.
const MODULE_SUFFIXES: &[&str] = &[".ts", ".tsx", ".d.ts", "/index.ts", "/index.tsx", "/index.d.ts"];

/// A file that takes part in a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Absolute, normalized path of the original file.
    pub path: PathBuf,
    /// Index into the request inputs, `None` for discovered dependencies.
    pub input: Option<usize>,
    /// Source text (from memory for inputs, from disk otherwise).
    pub contents: Vec<u8>,
}

impl ResolvedFile {
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        is_declaration_file(&self.path)
    }
}

/// The full set of files for one request, dependencies before dependents.
#[derive(Debug, Clone)]
pub struct ResolvedSet {
    files: Vec<ResolvedFile>,
    common_root: PathBuf,
}

impl ResolvedSet {
    #[must_use]
    pub fn files(&self) -> &[ResolvedFile] {
        &self.files
    }

    /// Deepest directory containing every resolved file and every input base.
    #[must_use]
    pub fn common_root(&self) -> &Path {
        &self.common_root
    }

    /// Paths in resolution order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Whether nothing but declaration files would be compiled.
    #[must_use]
    pub fn is_declaration_only(&self) -> bool {
        self.files.iter().all(ResolvedFile::is_declaration)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Whether a module specifier points into the file system rather than at a package.
fn is_relative_specifier(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../") || spec.starts_with('/')
}

fn is_typescript_source(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "ts" || e == "tsx")
}

/// TypeScript files a relative module specifier may name, in lookup order.
///
/// `./c.js` means `c.ts` (or `c.tsx`, `c.d.ts`) the way the compiler reads
/// it, never the emitted JavaScript.
fn module_candidates(target: &Path) -> Vec<PathBuf> {
    if is_typescript_source(target) {
        return vec![target.to_path_buf()];
    }

    let raw = target.to_string_lossy();
    let rewrites: [(&str, &[&str]); 2] = [
        (".js", &[".ts", ".tsx", ".d.ts"]),
        (".jsx", &[".tsx", ".ts", ".d.ts"]),
    ];
    for (js, ts) in rewrites {
        if let Some(stem) = raw.strip_suffix(js) {
            return ts.iter().map(|s| PathBuf::from(format!("{stem}{s}"))).collect();
        }
    }
    MODULE_SUFFIXES
        .iter()
        .map(|s| PathBuf::from(format!("{raw}{s}")))
        .collect()
}

struct Resolver<'a> {
    inputs: &'a [VirtualFile],
    by_path: HashMap<PathBuf, usize>,
    visited: HashSet<PathBuf>,
    files: Vec<ResolvedFile>,
}

impl Resolver<'_> {
    fn exists(&self, path: &Path) -> bool {
        self.by_path.contains_key(path) || path.is_file()
    }

    /// Resolve one reference found in `from` to a concrete file.
    ///
    /// Module specifiers only ever resolve to TypeScript sources. An existing
    /// file of any other kind (`./style.css`, a compiled `./c.js` with no
    /// `c.ts` beside it) is left to the compiler, like a package import.
    fn locate(&self, reference: &Reference, from: &Path) -> Result<Option<PathBuf>> {
        let spec = reference.specifier.as_str();
        if reference.kind.is_module() && !is_relative_specifier(spec) {
            // Package imports are the compiler's business.
            return Ok(None);
        }

        let dir = from.parent().unwrap_or(Path::new("/"));
        let target = normalize(&dir.join(spec));

        let candidates = if reference.kind.is_module() {
            module_candidates(&target)
        } else {
            vec![target.clone()]
        };
        if let Some(found) = candidates.into_iter().find(|c| self.exists(c)) {
            return Ok(Some(found));
        }

        if reference.kind.is_module() && self.exists(&target) {
            tracing::trace!(from = %from.display(), specifier = spec, "not a TypeScript source, left to the compiler");
            return Ok(None);
        }
        Err(Error::Resolution {
            specifier: spec.to_string(),
            from: from.to_path_buf(),
        })
    }

    fn visit(&mut self, path: PathBuf) -> Result<()> {
        if !self.visited.insert(path.clone()) {
            return Ok(());
        }

        let input = self.by_path.get(&path).copied();
        let contents = match input {
            Some(index) => self.inputs[index].contents().to_vec(),
            None => read_to_string_lossy(&path)?.into_bytes(),
        };

        let references = scan_references(&String::from_utf8_lossy(&contents));
        for reference in &references {
            if let Some(dep) = self.locate(reference, &path)? {
                tracing::trace!(from = %path.display(), to = %dep.display(), "resolved reference");
                self.visit(dep)?;
            }
        }

        self.files.push(ResolvedFile {
            path,
            input,
            contents,
        });
        Ok(())
    }
}

/// Discover every file the inputs depend on.
///
/// The walk is depth-first: inputs in the order given, references in source
/// order, each file placed after its dependencies. A file reached twice keeps
/// its first position, so the order is deterministic and cycles terminate.
pub fn resolve_all(inputs: &[VirtualFile]) -> Result<ResolvedSet> {
    let by_path = inputs
        .iter()
        .enumerate()
        .map(|(i, f)| (f.path().to_path_buf(), i))
        .collect();
    let mut resolver = Resolver {
        inputs,
        by_path,
        visited: HashSet::new(),
        files: Vec::with_capacity(inputs.len()),
    };

    for input in inputs {
        resolver.visit(input.path().to_path_buf())?;
    }

    let files = resolver.files;
    let dirs = files
        .iter()
        .filter_map(|f| f.path.parent())
        .chain(inputs.iter().map(VirtualFile::base));
    let common_root = common_ancestor(dirs)
        .or_else(|| inputs.first().map(|f| f.cwd().to_path_buf()))
        .unwrap_or_default();

    tracing::debug!(
        files = files.len(),
        common_root = %common_root.display(),
        "resolved inputs"
    );
    Ok(ResolvedSet { files, common_root })
}
