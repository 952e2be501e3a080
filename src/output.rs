//! Terminal output for the pmug CLI.
//!
//! Progress lines go to stderr as a right-aligned verb followed by a
//! message. Reports go to stdout as JSON so they can be piped into other
//! tools.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, Severity};
use crate::error::{PmugError, Result};

/// Column the verbs are right-aligned to.
const VERB_COLUMN: usize = 12;

const RESET: &str = "\x1b[0m";

/// Colour of a progress line's verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Done,
    Note,
    Warn,
    Muted,
}

impl Tone {
    fn ansi(self) -> &'static str {
        match self {
            Tone::Done => "\x1b[1;32m",
            Tone::Note => "\x1b[1;36m",
            Tone::Warn => "\x1b[1;33m",
            Tone::Muted => "\x1b[2m",
        }
    }
}

/// Writes progress lines to stderr, with ANSI colour when stderr is a
/// terminal.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    ansi: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            ansi: io::stderr().is_terminal(),
        }
    }

    /// A printer that never emits escape codes.
    pub fn plain() -> Self {
        Self { ansi: false }
    }

    /// A completed step, e.g. `   Assembled 4 frames at 32x16`.
    pub fn status(&self, verb: &str, message: &str) {
        self.emit(Tone::Done, verb, message);
    }

    pub fn info(&self, verb: &str, message: &str) {
        self.emit(Tone::Note, verb, message);
    }

    pub fn warning(&self, verb: &str, message: &str) {
        self.emit(Tone::Warn, verb, message);
    }

    /// A pipeline diagnostic; help text follows on its own line.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        let message = format!(
            "{} {}",
            diagnostic.message,
            self.muted(&format!("[{}]", diagnostic.code))
        );
        match diagnostic.severity {
            Severity::Info => self.info("Note", &message),
            Severity::Warning => self.warning("Warning", &message),
        }
        if let Some(help) = &diagnostic.help {
            self.emit(Tone::Muted, "help", help);
        }
    }

    /// De-emphasized text such as correlation ids.
    pub fn muted(&self, text: &str) -> String {
        self.paint(Tone::Muted.ansi(), text)
    }

    /// Emphasized text such as URLs and output paths.
    pub fn highlight(&self, text: &str) -> String {
        self.paint("\x1b[36m", text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.ansi {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn emit(&self, tone: Tone, verb: &str, message: &str) {
        let verb = format!("{:>width$}", verb, width = VERB_COLUMN);
        // stderr may be closed when piped; nothing useful to do then
        let _ = writeln!(io::stderr().lock(), "{} {}", self.paint(tone.ansi(), &verb), message);
    }
}

/// Write `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PmugError::encode(format!("Failed to serialize report: {}", e)))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// `plural(1, "frame", "frames")` → "1 frame".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    let noun = if n == 1 { singular } else { pluralized };
    format!("{} {}", n, noun)
}

/// `path` relative to the working directory when it lies below it.
pub fn display_path(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf));

    match relative {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) => rel.display().to_string(),
        None => path.display().to_string(),
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "frame", "frames"), "1 frame");
        assert_eq!(plural(0, "frame", "frames"), "0 frames");
        assert_eq!(plural(256, "frame", "frames"), "256 frames");
    }

    #[test]
    fn test_display_path() {
        let outside = Path::new("/nonexistent/pmug/out.gif");
        assert_eq!(display_path(outside), "/nonexistent/pmug/out.gif");

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(display_path(&cwd), ".");
        assert_eq!(display_path(&cwd.join("pmug.yaml")), "pmug.yaml");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_plain_printer_has_no_escapes() {
        let printer = Printer::plain();
        assert_eq!(printer.muted("abc123"), "abc123");
        assert_eq!(printer.highlight("https://cdn/x.gif"), "https://cdn/x.gif");
    }

    #[test]
    fn test_ansi_printer_wraps_text() {
        let printer = Printer { ansi: true };
        assert_eq!(printer.muted("x"), "\x1b[2mx\x1b[0m");
    }
}
