//! Progress output for the monitor loop.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::client::ClientError;

use super::format_elapsed;

/// Spinner glyphs cycled while a run is in flight.
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Width of the blank overwrite used to clear the spinner line.
const CLEAR_WIDTH: usize = 80;

/// Glyph for a given spinner phase; wraps around.
#[must_use]
pub fn spinner_glyph(phase: usize) -> char {
    SPINNER[phase % SPINNER.len()]
}

/// Sink for user-facing monitor output.
///
/// Injected into the poll loop so tests can capture output deterministically.
/// The console implementation owns the rewrite-in-place spinner line.
pub trait ProgressSink {
    /// A non-terminal poll: redraw the progress line.
    fn tick(&mut self, phase: usize, state: &str, elapsed_secs: u64);
    /// The observed state differs from the previous poll.
    fn state_changed(&mut self, state: &str);
    /// A poll failed; the loop will retry on the next interval.
    fn fetch_error(&mut self, error: &ClientError);
    /// Terminal state reached; the progress line must be left clean.
    fn finished(&mut self, state: &str, elapsed_secs: u64);
}

/// Writes the spinner line to stdout and routes reports through tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    fn clear_line() {
        print!("\r{}\r", " ".repeat(CLEAR_WIDTH));
        let _ = io::stdout().flush();
    }
}

impl ProgressSink for ConsoleProgress {
    fn tick(&mut self, phase: usize, state: &str, elapsed_secs: u64) {
        print!(
            "\r{} State: {} (elapsed: {elapsed_secs}s)",
            spinner_glyph(phase).cyan(),
            state.bold()
        );
        let _ = io::stdout().flush();
    }

    fn state_changed(&mut self, state: &str) {
        Self::clear_line();
        tracing::info!(state = %state, "DAG state changed");
    }

    fn fetch_error(&mut self, error: &ClientError) {
        Self::clear_line();
        tracing::error!(error = %error, "Error monitoring DAG");
    }

    fn finished(&mut self, state: &str, elapsed_secs: u64) {
        Self::clear_line();
        tracing::info!(state = %state, "DAG reached terminal state");
        tracing::info!("Total time: {}", format_elapsed(elapsed_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_wraps_around() {
        assert_eq!(spinner_glyph(0), spinner_glyph(SPINNER.len()));
        assert_ne!(spinner_glyph(0), spinner_glyph(1));
    }
}
