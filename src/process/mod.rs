//! Subprocess execution with optional output capture.
//!
//! [`ProcessRunner::run`] spawns a tool, waits for it and returns its exit
//! code. Calls are independent of each other and safe to make from many
//! worker threads at once: the only shared state is the [`Console`] used to
//! echo command lines, and response files get a unique path per call.

mod capture;
mod response;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

pub use capture::ProcessOutput;
pub use response::{ResponseFile, ResponseInvocation, quote_arg};

use crate::error::{BuildError, Result};
use crate::ui::Console;
use capture::CaptureThread;
use std::process::{Command, Stdio};
use tracing::debug;

/// Exit code reported when a process was killed by a signal.
pub const ABNORMAL_EXIT: i32 = -1;

pub struct ProcessRunner<'a> {
    console: &'a Console,
    cmdline_max: usize,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self {
            console,
            cmdline_max: platform::CMDLINE_MAX,
        }
    }

    /// Override the command-line ceiling of the host platform.
    pub fn with_cmdline_max(mut self, max: usize) -> Self {
        self.cmdline_max = max;
        self
    }

    /// Run `program` with `args` and wait for it to exit.
    ///
    /// With `capture`, stdout and stderr are drained into it (the command
    /// echo too, when not `silent`); otherwise the child inherits the
    /// terminal. When the command line is over the platform ceiling, it is
    /// rewritten through `fallback`, and without one that is an error.
    pub fn run(
        &self,
        program: &str,
        args: &[String],
        fallback: Option<ResponseFile>,
        silent: bool,
        mut capture: Option<&mut ProcessOutput>,
    ) -> Result<i32> {
        let mut response = None;
        let len = platform::command_line_len(program, args);
        if len > self.cmdline_max {
            let Some(style) = fallback else {
                return Err(BuildError::CommandLineTooLong {
                    program: program.to_string(),
                    len,
                    max: self.cmdline_max,
                });
            };
            let inv = style.write(args)?;
            let short_len = platform::command_line_len(program, &inv.args);
            if short_len > self.cmdline_max {
                return Err(BuildError::CommandLineTooLong {
                    program: program.to_string(),
                    len: short_len,
                    max: self.cmdline_max,
                });
            }
            debug!(program, len, path = %inv.path.display(), "using response file");
            response = Some(inv);
        }

        if !silent {
            let line = echo_line(program, args);
            match capture.as_deref_mut() {
                Some(out) => {
                    out.stdout.push_str(&line);
                    out.stdout.push('\n');
                }
                None => self.console.print(&line),
            }
        }

        let effective_args = response.as_ref().map_or(args, |r| r.args.as_slice());
        let mut cmd = Command::new(program);
        cmd.args(effective_args);
        if capture.is_some() {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let spawn_err = |source: std::io::Error| BuildError::Spawn {
            program: program.to_string(),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        let drain = match (capture.is_some(), child.stdout.take(), child.stderr.take()) {
            (true, Some(out), Some(err)) => match CaptureThread::start(out, err) {
                Ok(t) => Some(t),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(spawn_err(e));
                }
            },
            _ => None,
        };

        let status = child.wait().map_err(spawn_err)?;
        if let (Some(thread), Some(out)) = (drain, capture) {
            out.append(thread.stop());
        }
        drop(response);

        let code = status.code().unwrap_or(ABNORMAL_EXIT);
        debug!(program, code, "process exited");
        Ok(code)
    }
}

fn echo_line(program: &str, args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|a| quote_arg(a)).collect();
    format!("{} {}", program, quoted.join(" "))
}
