//! The compilation adapter.
//!
//! One call to [`compile`] takes a [`CompileRequest`] through
//! `Pending -> Materializing -> Invoking -> Collecting -> Succeeded | Failed`:
//!
//! - **Materializing** resolves transitive dependencies, creates a
//!   [`TempWorkspace`] and mirrors every resolved file into it.
//! - **Invoking** runs the compiler over the workspace.
//! - **Collecting** parses diagnostics, applies the error policy, maps every
//!   artifact to its final location and rewrites the paths embedded in
//!   source maps and declarations.
//!
//! The workspace is owned by the call and removed on every exit path.
//!
//! ## Output placement
//!
//! Outputs keep their position relative to the common root of all resolved
//! files. The output base is `cwd/outDir` when configured, otherwise the
//! common root itself (in-place output). `pathFilter` rewrites the
//! root-relative path before it is joined to the base.

use crate::compiler::{
    classify, parse_tsc_output, CompatFlags, Compiler, CompilerError, CompilerVersion, Diagnostic,
    EmitTarget, Invocation, InvocationOutput, TscCompiler,
};
use crate::error::{Error, Result};
use crate::file::VirtualFile;
use crate::options::CompileOptions;
use crate::resolve::{resolve_all, ResolvedSet};
use crate::rewrite::{
    apply_path_filter, rewrite_declaration, rewrite_source_map, PathMapper, SourceMap,
};
use crate::workspace::TempWorkspace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tscflow_util::path::{absolutize, common_ancestor, is_declaration_file, relative_path, to_slash};

/// Lines of compiler output kept when reporting a crash.
const CRASH_TAIL_LINES: usize = 20;

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileStage {
    Pending,
    Materializing,
    Invoking,
    Collecting,
    Succeeded,
    Failed,
}

impl CompileStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Materializing => "materializing",
            Self::Invoking => "invoking",
            Self::Collecting => "collecting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of a request that did not return an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileStatus {
    Succeeded,
    /// Errors were reported but error emission was suppressed.
    Failed,
}

/// One compilation: ordered inputs plus options.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub cwd: PathBuf,
    pub inputs: Vec<VirtualFile>,
    pub options: CompileOptions,
}

impl CompileRequest {
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, options: CompileOptions) -> Self {
        Self {
            cwd: cwd.into(),
            inputs: Vec::new(),
            options,
        }
    }

    #[must_use]
    pub fn with_input(mut self, file: VirtualFile) -> Self {
        self.inputs.push(file);
        self
    }

    #[must_use]
    pub fn with_inputs(mut self, files: impl IntoIterator<Item = VirtualFile>) -> Self {
        self.inputs.extend(files);
        self
    }
}

/// What a request produced.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub outputs: Vec<VirtualFile>,
    pub diagnostics: Vec<Diagnostic>,
    pub status: CompileStatus,
    /// Every file that took part, dependencies first.
    pub resolved: Vec<PathBuf>,
    /// `None` when the compiler was not needed.
    pub compiler_version: Option<CompilerVersion>,
}

impl CompileResult {
    fn empty(resolved: Vec<PathBuf>) -> Self {
        Self {
            outputs: Vec::new(),
            diagnostics: Vec::new(),
            status: CompileStatus::Succeeded,
            resolved,
            compiler_version: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CompileStatus::Succeeded
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Output whose path relative to its base is `rel` (slash-separated).
    #[must_use]
    pub fn output(&self, rel: &str) -> Option<&VirtualFile> {
        self.outputs.iter().find(|f| to_slash(&f.relative()) == rel)
    }
}

/// Compile with the `tsc` located from the request's options.
pub fn compile_files(
    cwd: impl Into<PathBuf>,
    inputs: Vec<VirtualFile>,
    options: CompileOptions,
) -> Result<CompileResult> {
    let cwd = cwd.into();
    let tsc = TscCompiler::locate(&options, &cwd)?;
    compile(CompileRequest::new(cwd, options).with_inputs(inputs), &tsc)
}

/// Run one request to completion.
pub fn compile(request: CompileRequest, compiler: &dyn Compiler) -> Result<CompileResult> {
    let mut run = Run {
        stage: CompileStage::Pending,
        request,
    };
    let outcome = run.execute(compiler);
    match &outcome {
        Ok(result) if result.is_success() => run.advance(CompileStage::Succeeded),
        Ok(_) => run.advance(CompileStage::Failed),
        Err(err) => {
            tracing::debug!(code = err.code(), error = %err, "compile failed");
            run.advance(CompileStage::Failed);
        }
    }
    outcome
}

struct Run {
    stage: CompileStage,
    request: CompileRequest,
}

/// Everything needed to place one artifact.
struct Placement {
    artifact: PathBuf,
    destination: PathBuf,
    /// Root-relative path before filtering, without extension.
    unit: String,
}

impl Run {
    fn advance(&mut self, next: CompileStage) {
        tracing::debug!(from = %self.stage, to = %next, "compile stage");
        self.stage = next;
    }

    fn execute(&mut self, compiler: &dyn Compiler) -> Result<CompileResult> {
        let options = &self.request.options;
        options.validate()?;
        if self.request.inputs.is_empty() {
            return Ok(CompileResult::empty(Vec::new()));
        }

        self.advance(CompileStage::Materializing);
        let resolved = resolve_all(&self.request.inputs)?;
        let resolved_paths: Vec<PathBuf> = resolved.paths().map(Path::to_path_buf).collect();
        if resolved.is_declaration_only() {
            tracing::debug!("only declaration files, nothing to compile");
            return Ok(CompileResult::empty(resolved_paths));
        }

        let version = compiler.version()?;
        let compat = self.request.options.effective_compat(version.compat());
        tracing::debug!(compiler = compiler.name(), version = %version, ?compat, "compiler detected");

        let cwd = self.request.cwd.clone();
        let tmp_parent = self
            .request
            .options
            .tmp_dir
            .as_deref()
            .map_or_else(|| cwd.clone(), |dir| absolutize(&cwd, dir));
        let workspace = TempWorkspace::create(&tmp_parent)?;
        let mut mapper = PathMapper::new(&cwd, workspace.src_dir(), resolved.common_root());
        let mirrored = workspace.materialize(&resolved, &mapper)?;

        self.advance(CompileStage::Invoking);
        let invocation = self.invocation(&workspace, compat, mirrored.clone());
        let output = compiler.invoke(&invocation)?;

        self.advance(CompileStage::Collecting);
        let raw = raw_diagnostics(compiler.name(), &output)?;
        let artifacts = workspace.artifacts()?;
        let diagnostics = classify(raw, !artifacts.is_empty());

        let options = &self.request.options;
        let has_errors = diagnostics.iter().any(Diagnostic::is_error);
        let units_with_warnings = warned_units(&diagnostics, &workspace, &mapper);
        let diagnostics = relative_to_cwd(diagnostics, &workspace, &mapper, &cwd);
        log_diagnostics(&diagnostics);

        if has_errors && options.emit_error {
            close(workspace);
            return Err(Error::Compilation { diagnostics });
        }

        let base = self.output_base(&resolved);
        let keep_artifacts = !has_errors || compat.emit_on_error;
        let placements = if keep_artifacts {
            let emit_root = emit_root(&workspace, &mirrored, compat);
            let placements = self.place(&artifacts, &workspace, &emit_root, &base);
            self.apply_safe(placements, units_with_warnings)
        } else {
            tracing::warn!("compilation failed, outputs discarded");
            Vec::new()
        };

        for placement in &placements {
            mapper.add_output(placement.artifact.clone(), placement.destination.clone());
        }
        let outputs = self.build_outputs(&placements, &mapper, &base);
        close(workspace);

        let outputs = outputs?;
        tracing::debug!(outputs = outputs.len(), "collected outputs");
        Ok(CompileResult {
            outputs,
            diagnostics,
            status: if has_errors {
                CompileStatus::Failed
            } else {
                CompileStatus::Succeeded
            },
            resolved: resolved_paths,
            compiler_version: Some(version),
        })
    }

    fn invocation(
        &self,
        workspace: &TempWorkspace,
        compat: CompatFlags,
        files: Vec<PathBuf>,
    ) -> Invocation {
        let options = &self.request.options;
        let emit = match &options.out {
            Some(out) => EmitTarget::Bundle(workspace.out_dir().join(out)),
            None => EmitTarget::Dir(workspace.out_dir().to_path_buf()),
        };
        let invocation = Invocation::new(workspace.root().to_path_buf(), emit, options, compat, files);
        if compat.root_dir {
            invocation.with_root_dir(workspace.src_dir().to_path_buf())
        } else {
            invocation
        }
    }

    /// Output base: `cwd/outDir`, or the common root for in-place output.
    fn output_base(&self, resolved: &ResolvedSet) -> PathBuf {
        match &self.request.options.out_dir {
            Some(dir) => absolutize(&self.request.cwd, dir),
            None => resolved.common_root().to_path_buf(),
        }
    }

    fn place(
        &self,
        artifacts: &[PathBuf],
        workspace: &TempWorkspace,
        emit_root: &Path,
        base: &Path,
    ) -> Vec<Placement> {
        let options = &self.request.options;
        let emit_offset = relative_path(workspace.src_dir(), emit_root);

        artifacts
            .iter()
            .filter_map(|artifact| {
                let within_out = artifact.strip_prefix(workspace.out_dir()).ok()?;
                let rel = if options.is_bundle() {
                    within_out.to_path_buf()
                } else {
                    emit_offset.join(within_out)
                };
                let filtered = apply_path_filter(&rel, &options.path_filter);
                Some(Placement {
                    artifact: artifact.clone(),
                    destination: base.join(filtered),
                    unit: unit_of(&rel),
                })
            })
            .collect()
    }

    /// Drop artifacts of units that reported warnings when `safe` is set.
    fn apply_safe(&self, placements: Vec<Placement>, warned: WarnedUnits) -> Vec<Placement> {
        let options = &self.request.options;
        if !options.safe || warned.is_empty() {
            return placements;
        }
        if options.is_bundle() || warned.global {
            tracing::warn!("warnings reported, outputs suppressed");
            return Vec::new();
        }
        placements
            .into_iter()
            .filter(|p| {
                let keep = !warned.units.contains(&p.unit);
                if !keep {
                    tracing::warn!(output = %p.destination.display(), "warnings reported, output suppressed");
                }
                keep
            })
            .collect()
    }

    fn build_outputs(
        &self,
        placements: &[Placement],
        mapper: &PathMapper,
        base: &Path,
    ) -> Result<Vec<VirtualFile>> {
        let cwd = &self.request.cwd;
        let source_root = self.request.options.source_root.as_deref();
        let output = |destination: &Path, contents: Vec<u8>| {
            VirtualFile::new(cwd, destination, contents).with_base(base)
        };

        let mut maps: HashMap<PathBuf, SourceMap> = HashMap::new();
        let mut outputs = Vec::with_capacity(placements.len());

        // Maps first, so each script can carry its parsed map.
        for placement in placements.iter().filter(|p| is_map(&p.destination)) {
            let bytes = std::fs::read(&placement.artifact)?;
            let map = SourceMap::parse(&bytes, &placement.destination)?;
            let script = placement.destination.with_extension("");
            let file_name = script
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let map = rewrite_source_map(
                map,
                mapper,
                parent_of(&placement.artifact),
                parent_of(&placement.destination),
                &file_name,
                source_root,
            );
            outputs.push(output(&placement.destination, map.to_bytes()?));
            maps.insert(script, map);
        }

        for placement in placements.iter().filter(|p| !is_map(&p.destination)) {
            let bytes = std::fs::read(&placement.artifact)?;
            let file = if is_declaration_file(&placement.destination) {
                let text = rewrite_declaration(
                    &String::from_utf8_lossy(&bytes),
                    mapper,
                    parent_of(&placement.artifact),
                    parent_of(&placement.destination),
                );
                output(&placement.destination, text.into_bytes())
            } else {
                let file = output(&placement.destination, bytes);
                match maps.remove(&placement.destination) {
                    Some(map) => file.with_source_map(map),
                    None => file,
                }
            };
            tracing::trace!(output = %relative_path(cwd, file.path()).display(), "output");
            outputs.push(file);
        }

        outputs.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(outputs)
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn is_map(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "map")
}

/// Root-relative artifact path without its output extension:
/// `sub/a.js`, `sub/a.js.map` and `sub/a.d.ts` all belong to unit `sub/a`.
fn unit_of(rel: &Path) -> String {
    let rel = to_slash(rel);
    for ext in [".js.map", ".jsx.map", ".d.ts", ".js", ".jsx", ".map"] {
        if let Some(stem) = rel.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    rel
}

/// Root-relative source path without its source extension.
fn unit_of_source(rel: &str) -> String {
    for ext in [".d.ts", ".tsx", ".ts"] {
        if let Some(stem) = rel.strip_suffix(ext) {
            return stem.to_string();
        }
    }
    rel.to_string()
}

#[derive(Debug, Default)]
struct WarnedUnits {
    units: HashSet<String>,
    /// A warning without a file affects every unit.
    global: bool,
}

impl WarnedUnits {
    fn is_empty(&self) -> bool {
        self.units.is_empty() && !self.global
    }
}

fn warned_units(diagnostics: &[Diagnostic], workspace: &TempWorkspace, mapper: &PathMapper) -> WarnedUnits {
    let mut warned = WarnedUnits::default();
    for diag in diagnostics.iter().filter(|d| d.is_warning()) {
        let original = diag
            .file
            .as_deref()
            .and_then(|file| mapper.original(&absolutize(workspace.root(), file)));
        match original {
            Some(original) => {
                warned.units.insert(unit_of_source(&mapper.root_relative(&original)));
            }
            None => warned.global = true,
        }
    }
    warned
}

/// Report diagnostic paths relative to the caller's working directory.
fn relative_to_cwd(
    diagnostics: Vec<Diagnostic>,
    workspace: &TempWorkspace,
    mapper: &PathMapper,
    cwd: &Path,
) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|diag| {
            diag.map_file(|file| {
                mapper
                    .original(&absolutize(workspace.root(), file))
                    .map_or_else(|| file.to_path_buf(), |original| relative_path(cwd, &original))
            })
        })
        .collect()
}

fn raw_diagnostics(name: &str, output: &InvocationOutput) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = parse_tsc_output(&output.stdout);
    diagnostics.extend(parse_tsc_output(&output.stderr));

    if diagnostics.is_empty() && output.exit_code != 0 {
        if !output.is_completed() {
            return Err(CompilerError::crashed(format!(
                "{name} exited with code {}",
                output.exit_code
            ))
            .with_detail(output.tail(CRASH_TAIL_LINES))
            .into());
        }
        let mut message = format!("{name} exited with code {}", output.exit_code);
        let tail = output.tail(CRASH_TAIL_LINES);
        if !tail.trim().is_empty() {
            message.push_str(": ");
            message.push_str(tail.trim());
        }
        diagnostics.push(Diagnostic::error(message));
    }
    if output.stdout_truncated || output.stderr_truncated {
        tracing::warn!("compiler output truncated, some diagnostics may be missing");
    }
    Ok(diagnostics)
}

/// Directory the compiler used as the root of its output tree.
fn emit_root(workspace: &TempWorkspace, mirrored: &[PathBuf], compat: CompatFlags) -> PathBuf {
    if compat.root_dir {
        return workspace.src_dir().to_path_buf();
    }
    common_ancestor(
        mirrored
            .iter()
            .filter(|p| !is_declaration_file(p))
            .filter_map(|p| p.parent()),
    )
    .unwrap_or_else(|| workspace.src_dir().to_path_buf())
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        if diag.is_error() {
            tracing::warn!(code = diag.code.as_deref(), "{diag}");
        } else {
            tracing::debug!(code = diag.code.as_deref(), "{diag}");
        }
    }
}

fn close(workspace: TempWorkspace) {
    let path = workspace.root().to_path_buf();
    if let Err(err) = workspace.close() {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove workspace");
    }
}
