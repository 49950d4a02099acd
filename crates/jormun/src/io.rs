//! Output handling for the `console` global.
//!
//! Implement [`PrintWriter`] to capture or redirect console output from
//! sandboxed JavaScript code. The default implementation [`StdPrint`] writes
//! `console.log` to stdout and `console.warn`/`console.error` to stderr.

use std::io::{self, Write as _};

/// Destination stream for a console call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// `console.log`.
    Log,
    /// `console.warn`.
    Warn,
    /// `console.error`.
    Error,
}

/// Trait for handling output from `console.log`/`console.warn`/`console.error`.
pub trait PrintWriter {
    /// Called once per console call with the fully formatted line
    /// (arguments joined by single spaces, no trailing newline).
    fn write_line(&mut self, stream: ConsoleStream, line: &str);
}

/// Default `PrintWriter` that writes to stdout/stderr.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_line(&mut self, stream: ConsoleStream, line: &str) {
        match stream {
            ConsoleStream::Log => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            ConsoleStream::Warn | ConsoleStream::Error => {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// `PrintWriter` that collects all output into a string, used for testing.
///
/// Each console call becomes one line terminated by `\n`; warn/error lines
/// are included in-order with log lines.
#[derive(Debug, Default)]
pub struct CollectStringPrint {
    output: String,
}

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected output so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.output
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_line(&mut self, _stream: ConsoleStream, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_writer_accumulates_lines() {
        let mut w = CollectStringPrint::new();
        w.write_line(ConsoleStream::Log, "a");
        w.write_line(ConsoleStream::Error, "b");
        assert_eq!(w.output(), "a\nb\n");
    }
}
