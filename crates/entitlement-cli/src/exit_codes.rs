//! Process exit codes. Scripts depend on these, so they only ever grow.

pub const EXIT_SUCCESS: i32 = 0;
/// A benchmark case mismatched, or a check was denied under `--fail-on-deny`.
pub const EXIT_UNEXPECTED_DECISION: i32 = 1;
/// Configuration could not be loaded or an evaluator could not be built.
pub const EXIT_CONFIG_ERROR: i32 = 2;
