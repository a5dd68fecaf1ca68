//! The real `tsc` binary as a [`Compiler`].

use super::{Compiler, CompilerError, CompilerVersion, Invocation, InvocationOutput};
use crate::options::{CompileOptions, TscSearch};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable naming the compiler binary. Checked after `tscPath`.
pub const TSC_ENV: &str = "TSCFLOW_TSC";

/// Maximum captured size per stream (256 KiB).
pub const MAX_OUTPUT_SIZE: usize = 256 * 1024;

#[cfg(windows)]
const LOCAL_BIN: &str = "node_modules/.bin/tsc.cmd";
#[cfg(not(windows))]
const LOCAL_BIN: &str = "node_modules/.bin/tsc";

#[derive(Debug, Clone)]
pub struct TscCompiler {
    program: PathBuf,
}

impl TscCompiler {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find the compiler: explicit `tscPath`, then `TSCFLOW_TSC`, then the
    /// configured search order (`node_modules/.bin` from `cwd` upwards, `PATH`).
    pub fn locate(options: &CompileOptions, cwd: &Path) -> Result<Self, CompilerError> {
        if let Some(path) = &options.tsc_path {
            return Ok(Self::new(cwd.join(path)));
        }
        if let Some(path) = std::env::var_os(TSC_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(cwd.join(path)));
        }

        for search in &options.tsc_search {
            let found = match search {
                TscSearch::Cwd => cwd
                    .ancestors()
                    .map(|dir| dir.join(LOCAL_BIN))
                    .find(|candidate| candidate.is_file()),
                TscSearch::Shell => which::which("tsc").ok(),
            };
            if let Some(program) = found {
                tracing::debug!(program = %program.display(), via = search.as_str(), "located tsc");
                return Ok(Self::new(program));
            }
        }

        let searched: Vec<_> = options.tsc_search.iter().map(TscSearch::as_str).collect();
        Err(CompilerError::not_found(format!(
            "tsc not found (searched: {}); install typescript or set {TSC_ENV}",
            searched.join(", ")
        )))
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[String], cwd: Option<&Path>) -> Result<InvocationOutput, CompilerError> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command.output().map_err(|e| {
            CompilerError::spawn_failed(format!("failed to run {}: {e}", self.program.display()))
        })?;

        let (stdout, stdout_truncated) = capture(&output.stdout);
        let (stderr, stderr_truncated) = capture(&output.stderr);
        Ok(InvocationOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

/// Decode a captured stream, keeping whole lines up to [`MAX_OUTPUT_SIZE`].
fn capture(bytes: &[u8]) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_OUTPUT_SIZE {
        return (text.into_owned(), false);
    }

    let mut out = String::new();
    for line in text.lines() {
        if out.len() + line.len() + 1 > MAX_OUTPUT_SIZE {
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    (out, true)
}

impl Compiler for TscCompiler {
    fn name(&self) -> &'static str {
        "tsc"
    }

    fn version(&self) -> Result<CompilerVersion, CompilerError> {
        let output = self.run(&["--version".to_string()], None)?;
        let text = format!("{}\n{}", output.stdout, output.stderr);
        CompilerVersion::parse(&text).ok_or_else(|| {
            CompilerError::version_unknown(format!(
                "{} --version printed no version",
                self.program.display()
            ))
            .with_detail(output.tail(5))
        })
    }

    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, CompilerError> {
        let args = invocation.args();
        tracing::debug!(program = %self.program.display(), args = ?args, "running tsc");
        self.run(&args, Some(&invocation.cwd))
    }
}
