//! Stable error codes.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions. They show
//! up in JSON output and in the CLI's exit diagnostics.

/// The compiler reported errors and the request was strict.
pub const COMPILE_FAILED: &str = "COMPILE_FAILED";

/// A reference or relative import could not be resolved.
pub const RESOLUTION_FAILED: &str = "RESOLUTION_FAILED";

/// Options are invalid or contradictory.
pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

/// Options file could not be read.
pub const CONFIG_READ_FAILED: &str = "CONFIG_READ_FAILED";

/// Options file is not valid JSON or has the wrong shape.
pub const CONFIG_PARSE_FAILED: &str = "CONFIG_PARSE_FAILED";

/// No compiler binary found.
pub const COMPILER_NOT_FOUND: &str = "COMPILER_NOT_FOUND";

/// The compiler process could not be started.
pub const COMPILER_SPAWN_FAILED: &str = "COMPILER_SPAWN_FAILED";

/// `--version` produced nothing recognizable.
pub const COMPILER_VERSION_UNKNOWN: &str = "COMPILER_VERSION_UNKNOWN";

/// The compiler terminated abnormally without diagnostics.
pub const COMPILER_CRASHED: &str = "COMPILER_CRASHED";

/// Filesystem error while staging or collecting files.
pub const IO_ERROR: &str = "IO_ERROR";

/// An emitted source map could not be parsed.
pub const SOURCE_MAP_INVALID: &str = "SOURCE_MAP_INVALID";
