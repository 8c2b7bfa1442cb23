//! Terminal output shared by every build thread.
//!
//! All writes made while a build is running go through one [`Console`] so
//! that a job's captured output lands as a single uninterrupted block.

use crate::process::ProcessOutput;
use colored::*;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Console {
    lock: Mutex<()>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `text` to stdout under the output lock.
    pub fn print(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        if !text.ends_with('\n') {
            let _ = out.write_all(b"\n");
        }
        let _ = out.flush();
    }

    /// Write `text` to stderr under the output lock.
    pub fn eprint(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut err = io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
        if !text.ends_with('\n') {
            let _ = err.write_all(b"\n");
        }
        let _ = err.flush();
    }

    /// Print one job's captured output as a single block.
    pub fn print_block(&self, output: &ProcessOutput) {
        if output.is_empty() {
            return;
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        let _ = out.write_all(output.stdout.as_bytes());
        let _ = out.flush();
        let mut err = io::stderr().lock();
        let _ = err.write_all(output.stderr.as_bytes());
        if let Some(e) = &output.capture_error {
            let _ = writeln!(err, "{} output capture failed: {}", "!".yellow(), e);
        }
        let _ = err.flush();
    }

    pub fn success(&self, msg: &str) {
        self.print(&format!("{} {}", "✓".green(), msg));
    }

    pub fn warn(&self, msg: &str) {
        self.print(&format!("{} {}", "!".yellow(), msg));
    }

    pub fn error(&self, msg: &str) {
        self.eprint(&format!("{} {}", "x".red(), msg));
    }
}

/// `path` relative to the current directory when it lies below it.
pub fn relative_display(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(|p| p.display().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}
