//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;

/// Success marker
pub const CHECK: &str = "✓";

/// Failure marker
pub const CROSS: &str = "✗";

/// Warning marker
pub const WARN: &str = "⚠";

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Semantic colors, applied only when stdout supports them
pub trait Stylize: Display {
    /// Secondary information
    fn muted(&self) -> String;
    /// Something the eye should land on
    fn emphasis(&self) -> String;
    /// Names: branches, PR numbers
    fn accent(&self) -> String;
    /// Good news
    fn success(&self) -> String;
    /// Needs attention
    fn warn(&self) -> String;
    /// Failed
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.dimmed())
            .to_string()
    }

    fn emphasis(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
    }

    fn accent(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.cyan()).to_string()
    }

    fn success(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.green())
            .to_string()
    }

    fn warn(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.yellow())
            .to_string()
    }

    fn error(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.red()).to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.error()
}

/// Spinner used for every long-running step
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
}

/// Clickable link where the terminal supports it, plain text otherwise
pub fn hyperlink(text: &str, url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        terminal_link::Link::new(text, url).to_string()
    } else {
        text.to_string()
    }
}
