//! `tscflow version` command implementation.

use super::{print_json, ErrorJson};
use miette::Result;
use serde::Serialize;
use tscflow_core::version::{version_string, SCHEMA_VERSION};
use tscflow_core::{Compiler, CompilerVersion, Config, TscCompiler, VERSION};

#[derive(Serialize)]
struct VersionJson {
    schema_version: u32,
    version: &'static str,
    compiler: Option<CompilerJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
    notes: Vec<String>,
}

#[derive(Serialize)]
struct CompilerJson {
    name: &'static str,
    program: String,
    version: String,
    raw: String,
}

fn detect(config: &Config) -> tscflow_core::Result<(TscCompiler, CompilerVersion)> {
    let options = config.load_options()?;
    let tsc = TscCompiler::locate(&options, &config.cwd)?;
    let version = tsc.version()?;
    Ok((tsc, version))
}

/// Print the tool version and, when it can be found, the compiler version.
///
/// A missing compiler is reported but does not fail the command.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let detected = detect(config);

    if json {
        let (compiler, error, notes) = match &detected {
            Ok((tsc, version)) => (
                Some(CompilerJson {
                    name: tsc.name(),
                    program: tsc.program().display().to_string(),
                    version: version.to_string(),
                    raw: version.raw.clone(),
                }),
                None,
                Vec::new(),
            ),
            Err(e) => (
                None,
                Some(ErrorJson::from(e)),
                vec!["hint: install typescript or set TSCFLOW_TSC".to_string()],
            ),
        };
        return print_json(&VersionJson {
            schema_version: SCHEMA_VERSION,
            version: VERSION,
            compiler,
            error,
            notes,
        });
    }

    println!("{}", version_string());
    match detected {
        Ok((tsc, version)) => println!("{} {version} ({})", tsc.name(), tsc.program().display()),
        Err(e) => {
            tracing::debug!(code = e.code(), "compiler detection failed");
            println!("tsc: not available ({e})");
        }
    }
    Ok(())
}
