//! Output formatting
//!
//! Human-readable output with optional colors, or strict JSON.

mod formatter;

pub use formatter::Formatter;

/// Output settings from the global flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Strict JSON on stdout, no colors, no progress bar
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
