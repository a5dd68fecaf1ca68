//! `tscflow compile` command implementation.

use super::{print_json, ErrorJson};
use miette::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tscflow_core::version::SCHEMA_VERSION;
use tscflow_core::{
    compile_all, codes, CompileOptions, CompileRequest, CompileResult, Config, Diagnostic, Error,
    TscCompiler, VirtualFile,
};
use tscflow_util::fs::write_if_changed;
use tscflow_util::path::to_slash;

/// Compile command action.
#[derive(Debug, Clone)]
pub struct CompileAction {
    /// One glob set per request.
    pub groups: Vec<Vec<String>>,
    pub dest: PathBuf,
    pub out: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub sourcemap: bool,
    pub source_root: Option<String>,
    pub declaration: bool,
    pub safe: bool,
    pub no_emit_error: bool,
    /// `FROM=TO` pairs in priority order.
    pub path_filter: Vec<String>,
}

#[derive(Serialize)]
struct CompileResultJson {
    schema_version: u32,
    ok: bool,
    outputs: Vec<OutputJson>,
    diagnostics: Vec<DiagnosticJson>,
    errors: Vec<GroupErrorJson>,
    notes: Vec<String>,
}

#[derive(Serialize)]
struct OutputJson {
    group: usize,
    /// Path under the destination directory.
    path: String,
    /// `false` when the destination already had this content.
    written: bool,
}

#[derive(Serialize)]
struct DiagnosticJson {
    group: usize,
    #[serde(flatten)]
    diagnostic: Diagnostic,
}

#[derive(Serialize)]
struct GroupErrorJson {
    group: usize,
    #[serde(flatten)]
    error: ErrorJson,
}

#[derive(Serialize)]
struct CompileErrorResult {
    schema_version: u32,
    ok: bool,
    error: ErrorJson,
    notes: Vec<String>,
}

/// Run the compile command.
pub fn run(config: &Config, action: CompileAction, json: bool) -> Result<()> {
    let cwd = &config.cwd;

    let options = match build_options(config, &action) {
        Ok(options) => options,
        Err(error) => return fail(error, Vec::new(), json),
    };

    let tsc = match TscCompiler::locate(&options, cwd) {
        Ok(tsc) => tsc,
        Err(e) => {
            let notes = vec!["hint: install typescript or set TSCFLOW_TSC".to_string()];
            return fail(ErrorJson::from(&e), notes, json);
        }
    };

    let mut notes = Vec::new();
    let mut requests = Vec::with_capacity(action.groups.len());
    for (group, patterns) in action.groups.iter().enumerate() {
        let inputs = match collect_inputs(cwd, patterns) {
            Ok(inputs) => inputs,
            Err(error) => return fail(error, notes, json),
        };
        if inputs.is_empty() {
            notes.push(format!("group {group} matched no files"));
        }
        tracing::debug!(group, files = inputs.len(), "collected inputs");
        requests.push(CompileRequest::new(cwd.clone(), options.clone()).with_inputs(inputs));
    }

    let dest = cwd.join(&action.dest);
    let mut doc = CompileResultJson {
        schema_version: SCHEMA_VERSION,
        ok: true,
        outputs: Vec::new(),
        diagnostics: Vec::new(),
        errors: Vec::new(),
        notes,
    };

    for (group, outcome) in compile_all(requests, &tsc).into_iter().enumerate() {
        match outcome {
            Ok(result) => {
                doc.ok &= result.is_success();
                record_diagnostics(&mut doc, group, &result.diagnostics);
                if let Err(e) = write_outputs(&mut doc, group, &result, &dest) {
                    doc.ok = false;
                    doc.errors.push(GroupErrorJson {
                        group,
                        error: ErrorJson::from(&e),
                    });
                }
            }
            Err(e) => {
                doc.ok = false;
                record_diagnostics(&mut doc, group, e.diagnostics());
                doc.errors.push(GroupErrorJson {
                    group,
                    error: ErrorJson::from(&e),
                });
            }
        }
    }

    if json {
        print_json(&doc)?;
    } else {
        print_human_output(&doc);
    }

    if doc.ok {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Options file first, then command line overrides.
fn build_options(config: &Config, action: &CompileAction) -> std::result::Result<CompileOptions, ErrorJson> {
    let mut options = config.load_options().map_err(|e| ErrorJson::from(&e))?;

    if let Some(out) = &action.out {
        options.out = Some(out.clone());
    }
    if let Some(out_dir) = &action.out_dir {
        options.out_dir = Some(out_dir.clone());
    }
    if let Some(root) = &action.source_root {
        options.source_root = Some(root.clone());
    }
    options.sourcemap |= action.sourcemap;
    options.declaration |= action.declaration;
    options.safe |= action.safe;
    if action.no_emit_error {
        options.emit_error = false;
    }

    let mut filters = Vec::with_capacity(action.path_filter.len());
    for pair in &action.path_filter {
        let Some((from, to)) = pair.split_once('=') else {
            return Err(ErrorJson {
                code: codes::CONFIG_INVALID.to_string(),
                message: format!("--path-filter expects FROM=TO, got '{pair}'"),
                detail: None,
            });
        };
        filters.push((from.to_string(), to.to_string()));
    }

    // Command line filters take priority over the options file.
    if !filters.is_empty() {
        let keys: HashSet<String> = filters.iter().map(|(from, _)| from.clone()).collect();
        let configured = std::mem::take(&mut options.path_filter);
        options.path_filter = filters
            .into_iter()
            .chain(configured.into_iter().filter(|(from, _)| !keys.contains(from)))
            .collect();
    }

    Ok(options)
}

/// Expand globs into input files. Each file's base is the static prefix of
/// the pattern that matched it.
fn collect_inputs(cwd: &Path, patterns: &[String]) -> std::result::Result<Vec<VirtualFile>, ErrorJson> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for pattern in patterns {
        let base = cwd.join(glob_base(pattern));
        let full = cwd.join(pattern);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| ErrorJson {
            code: codes::CONFIG_INVALID.to_string(),
            message: format!("invalid glob '{pattern}': {e}"),
            detail: None,
        })?;

        for entry in entries {
            let path = entry.map_err(|e| ErrorJson {
                code: codes::IO_ERROR.to_string(),
                message: format!("failed to read {}: {}", e.path().display(), e.error()),
                detail: None,
            })?;
            if !path.is_file() || !seen.insert(path.clone()) {
                continue;
            }
            let file = VirtualFile::read(cwd, &path).map_err(|e| ErrorJson {
                code: codes::IO_ERROR.to_string(),
                message: format!("failed to read {}: {e}", path.display()),
                detail: None,
            })?;
            inputs.push(file.with_base(&base));
        }
    }

    Ok(inputs)
}

/// Directory part of a glob before its first wildcard component.
///
/// `src/**/*.ts` has base `src`; a literal `src/foo.ts` has base `src`.
fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    for (i, part) in parts.iter().enumerate() {
        if i + 1 == parts.len() || part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part);
    }
    base
}

fn record_diagnostics(doc: &mut CompileResultJson, group: usize, diagnostics: &[Diagnostic]) {
    doc.diagnostics.extend(diagnostics.iter().map(|diagnostic| DiagnosticJson {
        group,
        diagnostic: diagnostic.clone(),
    }));
}

fn write_outputs(
    doc: &mut CompileResultJson,
    group: usize,
    result: &CompileResult,
    dest: &Path,
) -> std::result::Result<(), Error> {
    for file in &result.outputs {
        let rel = file.relative();
        let written = write_if_changed(&dest.join(&rel), file.contents())?;
        tracing::trace!(path = %rel.display(), written, "output");
        doc.outputs.push(OutputJson {
            group,
            path: to_slash(&rel),
            written,
        });
    }
    Ok(())
}

fn print_human_output(doc: &CompileResultJson) {
    for entry in &doc.diagnostics {
        eprintln!("{}", entry.diagnostic);
    }
    for entry in &doc.errors {
        eprintln!("error: {}: {}", entry.error.code, entry.error.message);
        if let Some(detail) = &entry.error.detail {
            for line in detail.lines().take(10) {
                eprintln!("  | {line}");
            }
        }
    }

    let mut written = 0;
    for output in &doc.outputs {
        if output.written {
            written += 1;
            println!("\u{2713} {}", output.path);
        }
    }

    let errors = doc.diagnostics.iter().filter(|d| d.diagnostic.is_error()).count();
    let warnings = doc.diagnostics.iter().filter(|d| d.diagnostic.is_warning()).count();
    println!();
    println!(
        "{written} written, {} unchanged, {errors} error(s), {warnings} warning(s)",
        doc.outputs.len() - written
    );
    for note in &doc.notes {
        println!("note: {note}");
    }
}

fn fail(error: ErrorJson, notes: Vec<String>, json: bool) -> Result<()> {
    if json {
        print_json(&CompileErrorResult {
            schema_version: SCHEMA_VERSION,
            ok: false,
            error,
            notes,
        })?;
        std::process::exit(1);
    }
    for note in &notes {
        eprintln!("{note}");
    }
    Err(miette::miette!("{}: {}", error.code, error.message))
}
