//! The external compiler collaborator.
//!
//! The adapter never spawns `tsc` itself. It describes one run as an
//! [`Invocation`] and hands it to a [`Compiler`], which reports the raw
//! [`InvocationOutput`]. This keeps process management swappable: tests use
//! an in-process fake, production uses [`TscCompiler`].
//!
//! ```ignore
//! use tscflow_core::compiler::{Compiler, TscCompiler};
//!
//! let tsc = TscCompiler::locate(&options, &cwd)?;
//! println!("{}", tsc.version()?);
//! ```

pub mod diagnostic;
pub mod tsc;
pub mod version;

pub use diagnostic::{classify, parse_tsc_output, Diagnostic, DiagnosticSeverity};
pub use tsc::TscCompiler;
pub use version::{CompatFlags, CompilerVersion};

use crate::codes;
use crate::options::CompileOptions;
use std::fmt;
use std::path::PathBuf;

/// Error raised by the compiler collaborator itself (as opposed to
/// diagnostics about the sources it compiled).
#[derive(Debug)]
pub struct CompilerError {
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Extra context, e.g. the tail of stderr.
    pub detail: Option<String>,
}

impl CompilerError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.is_empty()).then_some(detail);
        self
    }

    /// No compiler binary could be located.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_NOT_FOUND, message)
    }

    /// The compiler process could not be started.
    #[must_use]
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_SPAWN_FAILED, message)
    }

    /// The compiler did not report a recognizable version.
    #[must_use]
    pub fn version_unknown(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_VERSION_UNKNOWN, message)
    }

    /// The compiler exited abnormally without reporting diagnostics.
    #[must_use]
    pub fn crashed(message: impl Into<String>) -> Self {
        Self::new(codes::COMPILER_CRASHED, message)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}

/// Where the compiler writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTarget {
    /// One output per unit under this directory.
    Dir(PathBuf),
    /// All units concatenated into this file.
    Bundle(PathBuf),
}

/// One compiler run, fully described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Working directory of the compiler process (the workspace root).
    pub cwd: PathBuf,
    pub emit: EmitTarget,
    /// Passed as `--rootDir` when set.
    pub root_dir: Option<PathBuf>,
    pub sourcemap: bool,
    pub map_root: Option<String>,
    pub declaration: bool,
    pub target: Option<String>,
    pub module: Option<String>,
    pub no_implicit_any: bool,
    pub remove_comments: bool,
    pub no_lib: bool,
    /// Spell bundling as `--outFile` instead of `--out`.
    pub use_out_file: bool,
    pub extra_args: Vec<String>,
    /// Files to compile, dependencies first.
    pub files: Vec<PathBuf>,
}

impl Invocation {
    /// Describe a run over `files` with the given options and compiler flags.
    #[must_use]
    pub fn new(
        cwd: PathBuf,
        emit: EmitTarget,
        options: &CompileOptions,
        compat: CompatFlags,
        files: Vec<PathBuf>,
    ) -> Self {
        Self {
            cwd,
            emit,
            root_dir: None,
            sourcemap: options.sourcemap,
            map_root: options.map_root.clone(),
            declaration: options.declaration,
            target: options.target.clone(),
            module: options.module.clone(),
            no_implicit_any: options.no_implicit_any,
            remove_comments: options.remove_comments,
            no_lib: options.no_lib,
            use_out_file: compat.out_file,
            extra_args: options.additional_tsc_parameters.clone(),
            files,
        }
    }

    #[must_use]
    pub fn with_root_dir(mut self, root_dir: PathBuf) -> Self {
        self.root_dir = Some(root_dir);
        self
    }

    /// Render the command line arguments (without the program name).
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut flag = |name: &str, value: Option<&str>| {
            args.push(name.to_string());
            if let Some(value) = value {
                args.push(value.to_string());
            }
        };

        match &self.emit {
            EmitTarget::Dir(dir) => flag("--outDir", Some(&dir.to_string_lossy())),
            EmitTarget::Bundle(file) => {
                let name = if self.use_out_file { "--outFile" } else { "--out" };
                flag(name, Some(&file.to_string_lossy()));
            }
        }
        if let Some(root) = &self.root_dir {
            flag("--rootDir", Some(&root.to_string_lossy()));
        }
        if self.sourcemap {
            flag("--sourcemap", None);
        }
        if let Some(map_root) = &self.map_root {
            flag("--mapRoot", Some(map_root));
        }
        if self.declaration {
            flag("--declaration", None);
        }
        if let Some(target) = &self.target {
            flag("--target", Some(target));
        }
        if let Some(module) = &self.module {
            flag("--module", Some(module));
        }
        if self.no_implicit_any {
            flag("--noImplicitAny", None);
        }
        if self.remove_comments {
            flag("--removeComments", None);
        }
        if self.no_lib {
            flag("--noLib", None);
        }

        args.extend(self.extra_args.iter().cloned());
        args.extend(self.files.iter().map(|f| f.to_string_lossy().into_owned()));
        args
    }
}

/// Raw result of running the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Exit code (`-1` when killed by a signal).
    pub exit_code: i32,
    /// Captured stdout (may be truncated).
    pub stdout: String,
    /// Captured stderr (may be truncated).
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl InvocationOutput {
    /// A clean run with no output.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Whether the exit code is one `tsc` uses for completed runs:
    /// 0 (clean), 1 (diagnostics, output skipped), 2 (diagnostics, output generated).
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.exit_code, 0..=2)
    }

    /// Last `lines` lines of stderr, falling back to stdout.
    #[must_use]
    pub fn tail(&self, lines: usize) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = text.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Compiler collaborator.
///
/// Implementations must be `Send + Sync`: concurrent requests share one
/// compiler value.
pub trait Compiler: Send + Sync {
    /// Compiler name, e.g. `"tsc"`.
    fn name(&self) -> &'static str;

    /// Report the compiler version.
    fn version(&self) -> Result<CompilerVersion, CompilerError>;

    /// Run the compiler. Source diagnostics are not errors at this level:
    /// they come back in the captured output.
    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, CompilerError>;
}
