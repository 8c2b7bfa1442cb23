use std::io::{self, Read};
use std::process::{ChildStderr, ChildStdout};
use std::thread::{self, JoinHandle};

/// Text a child process wrote while its output was being captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Set when the capture thread itself failed
    pub capture_error: Option<String>,
}

impl ProcessOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty() && self.capture_error.is_none()
    }

    pub fn append(&mut self, other: ProcessOutput) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        if other.capture_error.is_some() {
            self.capture_error = other.capture_error;
        }
    }

    /// stdout followed by stderr, for failure analysis.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Background drain of a child's stdout and stderr.
///
/// Reads until both pipes reach end-of-file, which happens only after the
/// child (and anything it handed the pipes to) exits, so nothing written
/// before exit is lost. [`CaptureThread::stop`] joins and hands back the text.
pub(crate) struct CaptureThread {
    handle: JoinHandle<ProcessOutput>,
}

impl CaptureThread {
    pub(crate) fn start(stdout: ChildStdout, stderr: ChildStderr) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("rbuild-capture".into())
            .spawn(move || drain(stdout, stderr))?;
        Ok(Self { handle })
    }

    pub(crate) fn stop(self) -> ProcessOutput {
        self.handle.join().unwrap_or_else(|_| ProcessOutput {
            capture_error: Some("capture thread panicked".to_string()),
            ..Default::default()
        })
    }
}

fn drain(stdout: ChildStdout, stderr: ChildStderr) -> ProcessOutput {
    thread::scope(|s| {
        let err_reader = s.spawn(move || read_lossy(stderr));
        let out = read_lossy(stdout);
        let err = err_reader
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));

        let mut output = ProcessOutput::default();
        let mut failures = Vec::new();
        match out {
            Ok(s) => output.stdout = s,
            Err(e) => failures.push(format!("stdout: {e}")),
        }
        match err {
            Ok(s) => output.stderr = s,
            Err(e) => failures.push(format!("stderr: {e}")),
        }
        if !failures.is_empty() {
            output.capture_error = Some(failures.join(", "));
        }
        output
    })
}

fn read_lossy(mut pipe: impl Read) -> io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
