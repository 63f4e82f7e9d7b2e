//! Terminal color support.
//!
//! Colors are off when `NO_COLOR` is set or either output stream is not a
//! terminal.

use std::env;
use std::io::{self, IsTerminal};

/// ANSI color codes used by the CLI
#[derive(Debug, Clone, Copy)]
enum Ansi {
    Red = 31,
    Green = 32,
    Yellow = 33,
    Cyan = 36,
    Bold = 1,
    Dim = 2,
}

/// Color support detection and formatting
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(env::var_os("NO_COLOR").is_some()),
        }
    }

    #[cfg(test)]
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn should_use_colors(no_color: bool) -> bool {
        !no_color && io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: Ansi, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code as u8, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint(Ansi::Green, text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint(Ansi::Yellow, text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint(Ansi::Red, text)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint(Ansi::Cyan, text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(Ansi::Bold, text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(Ansi::Dim, text)
    }
}
