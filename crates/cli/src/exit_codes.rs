//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | CLI usage error (bad args, no input file given)          |
//! | 3    | Input file missing, unreadable or of an unknown type     |
//! | 4    | Invalid config (TOML parse or validation)                |
//! | 5    | Schema error (a required role has no matching column)    |
//! | 6    | Output could not be written                              |
//!
//! An unmatched row is never an error: a run that matches nothing still
//! exits 0.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A data or config file does not exist, cannot be read, or has an
/// unsupported extension. The message names the path.
pub const EXIT_INPUT_MISSING: u8 = 3;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// A required role could not be resolved to a column, or a file's content
/// could not be parsed as a table.
pub const EXIT_SCHEMA: u8 = 5;

/// Writing the output file(s) failed. Nothing partial is left behind for
/// single-file outputs.
pub const EXIT_OUTPUT_WRITE: u8 = 6;
