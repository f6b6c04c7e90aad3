//! ANSI styling for terminal output.
//!
//! `NO_COLOR` always wins; `CLICOLOR_FORCE` enables styling when output
//! is piped.

use std::env;
use std::io::{self, IsTerminal};

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    pub fn detect() -> Self {
        Self {
            enabled: Self::from_env(
                env::var_os("NO_COLOR").is_some(),
                env::var_os("CLICOLOR_FORCE").is_some(),
                io::stderr().is_terminal() && io::stdout().is_terminal(),
            ),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn from_env(no_color: bool, force: bool, terminal: bool) -> bool {
        !no_color && (force || terminal)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}
