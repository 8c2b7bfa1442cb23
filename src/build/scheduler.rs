//! Bounded parallel execution of compile jobs.
//!
//! The coordinator thread owns dispatch: it keeps at most `num_jobs` jobs in
//! flight on a rayon pool and blocks on a channel for their results. Once a
//! job reports failure nothing new is dispatched, but jobs already running
//! finish and are reported. Reports come back in submission order whatever
//! order the jobs completed in.

use super::BuildContext;
use crate::driver::CompilerDriver;
use crate::error::{BuildError, Result};
use crate::process::ProcessOutput;
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use tracing::debug;

/// A unit of work the scheduler can run on a worker thread.
pub trait Job: Send + 'static {
    /// Name used in reports, normally the source file.
    fn label(&self) -> String;

    /// Run the job, writing all tool output into `output`.
    fn execute(&mut self, output: &mut ProcessOutput) -> Result<bool>;
}

#[derive(Debug)]
pub struct JobReport {
    pub label: String,
    pub succeeded: bool,
    pub output: ProcessOutput,
    /// Set when the job could not run its tool at all
    pub error: Option<BuildError>,
}

#[derive(Debug, Clone)]
pub struct JobScheduler {
    num_jobs: usize,
    progress: bool,
}

impl JobScheduler {
    pub fn new(num_jobs: usize) -> Self {
        Self {
            num_jobs: num_jobs.max(1),
            progress: false,
        }
    }

    /// Show a progress bar while jobs run.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    /// Run `jobs` and return a report for every job that was dispatched.
    ///
    /// Jobs left in the queue after a failure get no report.
    pub fn run<J: Job>(&self, jobs: Vec<J>) -> Result<Vec<JobReport>> {
        let total = jobs.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_jobs.min(total))
            .thread_name(|i| format!("rbuild-worker-{i}"))
            .build()
            .map_err(|e| BuildError::Scheduler(e.to_string()))?;

        let pb = self.progress_bar(total);
        let (tx, rx) = mpsc::channel::<(usize, JobReport)>();
        let mut pending = jobs.into_iter().enumerate();
        let mut reports: Vec<Option<JobReport>> = (0..total).map(|_| None).collect();
        let mut in_flight = 0usize;
        let mut failed = false;

        loop {
            while !failed && in_flight < self.num_jobs {
                let Some((idx, mut job)) = pending.next() else {
                    break;
                };
                let tx = tx.clone();
                in_flight += 1;
                debug!(job = idx, label = %job.label(), "dispatch");
                pool.spawn(move || {
                    let report = run_job(&mut job);
                    // The receiver outlives every worker.
                    let _ = tx.send((idx, report));
                });
            }
            if in_flight == 0 {
                break;
            }

            let (idx, report) = rx
                .recv()
                .map_err(|e| BuildError::Scheduler(e.to_string()))?;
            in_flight -= 1;
            if !report.succeeded && !failed {
                debug!(label = %report.label, "job failed, draining running jobs");
                failed = true;
            }
            pb.set_message(report.label.clone());
            pb.inc(1);
            reports[idx] = Some(report);
        }

        pb.finish_and_clear();
        Ok(reports.into_iter().flatten().collect())
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        ProgressBar::new(total as u64).with_style(style)
    }
}

/// Run `job` on the calling thread, capturing its output and any panic.
pub(crate) fn run_job<J: Job>(job: &mut J) -> JobReport {
    let label = job.label();
    let mut output = ProcessOutput::default();
    let result = panic::catch_unwind(AssertUnwindSafe(|| job.execute(&mut output)));
    let (succeeded, error) = match result {
        Ok(Ok(ok)) => (ok, None),
        Ok(Err(e)) => (false, Some(e)),
        Err(_) => (
            false,
            Some(BuildError::JobPanicked {
                label: label.clone(),
            }),
        ),
    };
    JobReport {
        label,
        succeeded,
        output,
        error,
    }
}

/// Compile one stale source into its object file.
pub struct CompileJob {
    pub ctx: Arc<BuildContext>,
    pub driver: Arc<CompilerDriver>,
    pub working_dir: PathBuf,
    pub source_base: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub extra_args: Vec<String>,
}

impl Job for CompileJob {
    fn label(&self) -> String {
        self.input.display().to_string()
    }

    fn execute(&mut self, output: &mut ProcessOutput) -> Result<bool> {
        self.driver.compile(
            &self.ctx,
            &self.working_dir,
            &self.source_base,
            &self.input,
            &self.output,
            &self.extra_args,
            Some(output),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct FakeJob {
        id: usize,
        ok: bool,
        delay_ms: u64,
        started: Arc<Mutex<Vec<usize>>>,
    }

    impl Job for FakeJob {
        fn label(&self) -> String {
            format!("job{}", self.id)
        }

        fn execute(&mut self, output: &mut ProcessOutput) -> Result<bool> {
            self.started.lock().unwrap().push(self.id);
            thread::sleep(Duration::from_millis(self.delay_ms));
            output.stdout.push_str(&format!("out{}\n", self.id));
            Ok(self.ok)
        }
    }

    fn jobs(plan: &[(bool, u64)], started: &Arc<Mutex<Vec<usize>>>) -> Vec<FakeJob> {
        plan.iter()
            .enumerate()
            .map(|(i, &(ok, delay_ms))| FakeJob {
                id: i + 1,
                ok,
                delay_ms,
                started: Arc::clone(started),
            })
            .collect()
    }

    #[test]
    fn test_reports_follow_submission_order() {
        let started = Arc::new(Mutex::new(Vec::new()));
        // Earlier jobs sleep longer, so completion order is reversed.
        let plan = [(true, 60), (true, 40), (true, 20), (true, 0)];
        let reports = JobScheduler::new(4).run(jobs(&plan, &started)).unwrap();
        let labels: Vec<_> = reports.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["job1", "job2", "job3", "job4"]);
        assert!(reports.iter().all(|r| r.succeeded));
        assert_eq!(reports[2].output.stdout, "out3\n");
    }

    #[test]
    fn test_failure_stops_new_dispatch() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let plan = [(true, 0), (false, 0), (true, 0), (true, 0), (true, 0)];
        let reports = JobScheduler::new(1).run(jobs(&plan, &started)).unwrap();
        assert_eq!(*started.lock().unwrap(), vec![1, 2]);
        assert_eq!(reports.len(), 2);
        assert!(!reports[1].succeeded);
    }

    #[test]
    fn test_running_jobs_finish_after_failure() {
        let started = Arc::new(Mutex::new(Vec::new()));
        // job2 fails immediately while job1 is still running
        let plan = [(true, 150), (false, 0), (true, 0), (true, 0), (true, 0)];
        let reports = JobScheduler::new(2).run(jobs(&plan, &started)).unwrap();
        let job1 = reports.iter().find(|r| r.label == "job1").unwrap();
        assert!(job1.succeeded);
        assert_eq!(job1.output.stdout, "out1\n");
        assert!(reports.iter().any(|r| r.label == "job2" && !r.succeeded));
        // the slot job2 freed is never refilled
        assert_eq!(reports.len(), 2);
    }

    struct Panicker;

    impl Job for Panicker {
        fn label(&self) -> String {
            "boom".to_string()
        }

        fn execute(&mut self, _: &mut ProcessOutput) -> Result<bool> {
            panic!("worker exploded");
        }
    }

    #[test]
    fn test_panicking_job_is_reported() {
        let reports = JobScheduler::new(2).run(vec![Panicker]).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            reports[0].error,
            Some(BuildError::JobPanicked { .. })
        ));
    }

    #[test]
    fn test_never_exceeds_slot_count() {
        static RUNNING: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        struct Counted;
        impl Job for Counted {
            fn label(&self) -> String {
                "counted".to_string()
            }
            fn execute(&mut self, _: &mut ProcessOutput) -> Result<bool> {
                let now = RUNNING.fetch_add(1, Ordering::SeqCst) + 1;
                PEAK.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                RUNNING.fetch_sub(1, Ordering::SeqCst);
                Ok(true)
            }
        }

        let reports = JobScheduler::new(3)
            .run((0..12).map(|_| Counted).collect())
            .unwrap();
        assert_eq!(reports.len(), 12);
        assert!(PEAK.load(Ordering::SeqCst) <= 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_compile_job_captures_tool_output() {
        use crate::build::FeedbackAnalyzer;
        use crate::config::BuildOptions;
        use crate::driver::CompilerKind;
        use crate::driver::test_support::{retry_busy, write_tool};

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("main.c"), "#include <gone.h>\n").unwrap();
        let cc = write_tool(
            dir.path(),
            "cc.sh",
            "echo 'main.c:1: fatal error: gone.h: No such file or directory' >&2\nexit 1\n",
        );

        let mut job = CompileJob {
            ctx: Arc::new(BuildContext::new(BuildOptions::default())),
            driver: Arc::new(CompilerDriver::new(
                CompilerKind::Generic,
                cc.display().to_string(),
                vec![],
                &[],
            )),
            working_dir: dir.path().join("work"),
            source_base: src.clone(),
            input: src.join("main.c"),
            output: dir.path().join("work/obj/main.c.o"),
            extra_args: Vec::new(),
        };
        let report = retry_busy(|| {
            let mut report = run_job(&mut job);
            match report.error.take() {
                Some(e @ BuildError::Spawn { .. }) => Err(e),
                other => {
                    report.error = other;
                    Ok(report)
                }
            }
        })
        .unwrap();

        assert!(!report.succeeded);
        assert!(report.error.is_none());
        assert!(report.output.stdout.contains("main.c"));
        assert!(report.output.stderr.contains("fatal error: gone.h"));
        assert!(FeedbackAnalyzer::analyze(&report.output.combined()).is_some());
    }
}
