//! Error rendering for the terminal.
//!
//! The message comes first, then a `help` line when the error carries a
//! suggestion, then the source chain.

use std::error::Error;

use quarry_config::CONFIG_FILE;
use quarry_core::QuarryError;

use super::colors::ColorSupport;

pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with location, suggestion and causes
    pub fn format_error(&self, error: &QuarryError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let QuarryError::TomlParse { line, column, .. } = error {
            output.push_str(&self.format_location(CONFIG_FILE, *line, *column));
            output.push('\n');
        }

        let suggestion = error.suggestion().or_else(|| {
            error
                .is_recoverable()
                .then_some("The failure may be transient; run the command again")
        });
        if let Some(suggestion) = suggestion {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }

    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("{} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_toml_error_has_location() {
        let error = QuarryError::TomlParse {
            message: "expected `=`".to_string(),
            line: 3,
            column: 7,
        };
        let text = plain().format_error(&error);
        assert!(text.starts_with("error: Failed to parse quarry.toml"));
        assert!(text.contains("--> quarry.toml:3:7"));
    }

    #[test]
    fn test_source_chain() {
        let error = QuarryError::io(
            "Failed to read a.gem".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let text = plain().format_error(&error);
        assert!(text.contains("caused by: no such file"));
        assert!(text.contains("help: The failure may be transient"));
    }

    #[test]
    fn test_permanent_errors_have_no_retry_hint() {
        let text = plain().format_error(&QuarryError::codec("bad marshal header"));
        assert!(!text.contains("help:"));
    }
}
