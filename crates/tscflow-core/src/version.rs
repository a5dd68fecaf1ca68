use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the JSON documents printed by the CLI.
/// Bump this when changing their shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("tscflow {VERSION}");

    if let Some(hash) = option_env!("TSCFLOW_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
