#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! tscflow: run `tsc` over a set of virtual files and get virtual files back.
//!
//! ```ignore
//! use tscflow_core::{compile_files, CompileOptions, VirtualFile};
//!
//! let input = VirtualFile::read(&cwd, "src/foo.ts")?;
//! let result = compile_files(&cwd, vec![input], CompileOptions::new().with_sourcemap(true))?;
//! for file in &result.outputs {
//!     println!("{}", file.relative().display());
//! }
//! ```

pub mod adapter;
pub mod batch;
pub mod codes;
pub mod compiler;
pub mod config;
pub mod error;
pub mod file;
pub mod options;
pub mod resolve;
pub mod rewrite;
pub mod version;
pub mod workspace;

pub use adapter::{compile, compile_files, CompileRequest, CompileResult, CompileStage, CompileStatus};
pub use batch::compile_all;
pub use compiler::{
    CompatFlags, Compiler, CompilerError, CompilerVersion, Diagnostic, DiagnosticSeverity,
    TscCompiler,
};
pub use config::Config;
pub use error::{Error, Result};
pub use file::VirtualFile;
pub use options::{CompileOptions, TscSearch};
pub use rewrite::SourceMap;
pub use version::VERSION;
