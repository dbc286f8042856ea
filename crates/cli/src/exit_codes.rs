//! CLI Exit Code Registry
//!
//! Single source of truth for `ptreport` exit codes. Scripts that schedule
//! the daily reports branch on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Report written (row-level rejections do not count)   |
//! | 2    | Usage error (bad arguments, clap exits on its own)   |
//! | 3    | Input file unreadable, malformed or missing a column |
//! | 4    | Config file unreadable or invalid                    |
//! | 5    | Report could not be written                          |

/// Success - report written.
pub const EXIT_SUCCESS: u8 = 0;

/// An input export could not be opened, parsed, or lacks a configured column.
pub const EXIT_INPUT: u8 = 3;

/// `--config` file could not be read, parsed, or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// The output directory or report file could not be written.
pub const EXIT_OUTPUT: u8 = 5;
