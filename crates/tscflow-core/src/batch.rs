//! Running independent requests side by side.

use crate::adapter::{compile, CompileRequest, CompileResult};
use crate::compiler::Compiler;
use crate::error::Result;
use rayon::prelude::*;

/// Compile every request on the rayon pool.
///
/// Requests share nothing but the compiler: each resolves its own inputs
/// and owns its own workspace, so a failure in one does not affect the
/// others. Results come back in request order.
pub fn compile_all(requests: Vec<CompileRequest>, compiler: &dyn Compiler) -> Vec<Result<CompileResult>> {
    tracing::debug!(requests = requests.len(), "compiling batch");
    requests
        .into_par_iter()
        .map(|request| compile(request, compiler))
        .collect()
}
