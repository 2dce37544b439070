//! Colored diagnostic output for the driver.
//!
//! Uses `termcolor` for cross-platform colored terminal output and
//! respects the `NO_COLOR` environment variable.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve the color choice from the environment.
pub fn resolve_color_choice() -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Styled diagnostics writer: informational, success, warning, and error
/// lines, each with its glyph.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_line(&mut self, glyph: &str, color: Color, bold: bool, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{} ", glyph);
        let _ = self.stdout.reset();
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// `ℹ` informational line (cyan).
    pub fn info(&mut self, text: &str) {
        self.write_line("ℹ", Color::Cyan, false, text);
    }

    /// `✓` success line (green bold).
    pub fn success(&mut self, text: &str) {
        self.write_line("✓", Color::Green, true, text);
    }

    /// `⚠` warning line (yellow bold).
    pub fn warning(&mut self, text: &str) {
        self.write_line("⚠", Color::Yellow, true, text);
    }

    /// `✗` error line (red bold, to stderr).
    pub fn error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "✗ ");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, "{}", text);
    }

    /// Plain text to stdout.
    pub fn plain(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();
    }
}
