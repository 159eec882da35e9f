//! Output formatter for human-readable and JSON output
//!
//! Every command prints through [`Formatter`], so quiet and JSON modes
//! behave the same everywhere.

use console::Style;
use serde::Serialize;

use super::OutputConfig;

/// Color theme for styled output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Byte counts - green
    pub size: Style,
    /// Secondary details - dim
    pub dim: Style,
    /// URLs/endpoints - cyan + underline
    pub url: Style,
    /// Alias/object names - bold
    pub name: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    /// Follow-up hints after an error - cyan
    pub hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            size: Style::new().green(),
            dim: Style::new().dim(),
            url: Style::new().cyan().underlined(),
            name: Style::new().bold(),
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
            hint: Style::new().cyan(),
        }
    }
}

impl Theme {
    /// Returns a theme with no styling (for no-color mode)
    pub fn plain() -> Self {
        Self {
            size: Style::new(),
            dim: Style::new(),
            url: Style::new(),
            name: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
            hint: Style::new(),
        }
    }
}

/// Formatter for CLI output
///
/// When JSON mode is enabled, stdout carries only JSON documents and errors
/// go to stderr as JSON objects.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::default()
        };
        Self { config, theme }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Whether a live progress display may be drawn
    pub fn shows_progress(&self) -> bool {
        !self.is_quiet() && !self.is_json()
    }

    // ========== Style helper methods ==========

    pub fn style_size(&self, text: &str) -> String {
        self.theme.size.apply_to(text).to_string()
    }

    pub fn style_dim(&self, text: &str) -> String {
        self.theme.dim.apply_to(text).to_string()
    }

    pub fn style_url(&self, text: &str) -> String {
        self.theme.url.apply_to(text).to_string()
    }

    pub fn style_name(&self, text: &str) -> String {
        self.theme.name.apply_to(text).to_string()
    }

    // ========== Output methods ==========

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let checkmark = self.theme.success.apply_to("✓");
        println!("{checkmark} {message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            eprintln!("{cross} {message}");
        }
    }

    /// Output an error with a suggested fix
    pub fn error_with_hint(&self, message: &str, hint: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message,
                "hint": hint,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            let hint = self.theme.hint.apply_to(hint);
            eprintln!("{cross} {message}\n  {hint}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let warn_icon = self.theme.warning.apply_to("⚠");
        eprintln!("{warn_icon} {message}");
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_default() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(!formatter.is_quiet());
        assert!(formatter.colors_enabled());
        assert!(formatter.shows_progress());
    }

    #[test]
    fn test_formatter_json_mode() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
        assert!(!formatter.shows_progress());
    }

    #[test]
    fn test_formatter_quiet_hides_progress() {
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });
        assert!(formatter.colors_enabled());
        assert!(!formatter.shows_progress());
    }

    #[test]
    fn test_plain_theme_has_no_escapes() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        assert_eq!(formatter.style_name("s3"), "s3");
        assert_eq!(formatter.style_size("1 KiB"), "1 KiB");
    }
}
