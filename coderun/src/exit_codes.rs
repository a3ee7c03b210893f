//! Stable exit codes for coderun CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Any failure: missing directory, unrecognized project, failed install or
/// run, invalid config, generator error.
pub const FAILURE: i32 = 1;
