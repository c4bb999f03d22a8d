//! ANSI styling for terminal diagnostics.

use std::io::IsTerminal;

pub struct Style;

impl Style {
    fn enabled() -> bool {
        std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
    }

    fn wrap(code: &str, text: &str) -> String {
        if Style::enabled() {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn bold_red(text: &str) -> String {
        Style::wrap("1;31", text)
    }

    pub fn yellow(text: &str) -> String {
        Style::wrap("33", text)
    }

    pub fn cyan(text: &str) -> String {
        Style::wrap("36", text)
    }

    pub fn dim(text: &str) -> String {
        Style::wrap("2", text)
    }
}
