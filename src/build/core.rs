use super::clean::clean_working_path;
use super::feedback::FeedbackAnalyzer;
use super::scheduler::{CompileJob, JobReport, JobScheduler, run_job};
use super::utils::{SourceBuckets, gather_sources, link_order_for};
use super::BuildContext;
use crate::config::{BuildOptions, Language, ProjectDescriptor, TargetDescriptor};
use crate::driver::{CompilerDriver, LinkerDriver, object_path};
use crate::error::{BuildError, Result};
use crate::process::ProcessOutput;
use crate::toolchain;
use colored::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const STAGING_SUFFIX: &str = ".partial";

/// Outcome of building or cleaning several targets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl BuildSummary {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives targets of one project from sources to a linked artifact.
pub struct BuildCoordinator<'p> {
    project: &'p ProjectDescriptor,
    ctx: Arc<BuildContext>,
}

impl<'p> BuildCoordinator<'p> {
    pub fn new(project: &'p ProjectDescriptor, options: BuildOptions) -> Self {
        Self {
            project,
            ctx: Arc::new(BuildContext::new(options)),
        }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Build every requested target in order. `all` expands to every target.
    ///
    /// An unknown name fails before anything is built. Target failures are
    /// reported and collected; with `fail_exit` the first one stops the run.
    pub fn build_targets(&self, names: &[String]) -> Result<BuildSummary> {
        let names = self.project.resolve_targets(names)?;
        let console = &self.ctx.console;
        let mut summary = BuildSummary::default();
        for name in names {
            console.print(&format!("{} target '{}'", "Building".cyan().bold(), name));
            let start = Instant::now();
            match self.build_target(&name) {
                Ok(artifact) => {
                    console.success(&format!(
                        "{} -> {} in {:.2?}",
                        name,
                        artifact.display(),
                        start.elapsed()
                    ));
                    summary.succeeded.push(name);
                }
                Err(e) => {
                    console.error(&format!("target '{name}': {e}"));
                    summary.failed.push(name);
                    if self.ctx.options.fail_exit {
                        break;
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Compile the stale sources of `name` and link it. Returns the artifact path.
    pub fn build_target(&self, name: &str) -> Result<PathBuf> {
        let project = self.project;
        let target = project.target(name)?;
        let source_root = project.source_root();
        let working = project.working_path(name);

        let buckets = gather_sources(&source_root, &target.sources, &project.extensions)?;
        debug!(target = name, sources = buckets.len(), "gathered sources");

        // Every toolchain is resolved before the first process is spawned.
        let compilers = self.compilers_for(target, &buckets)?;
        let mut linker = self.linker_for(target)?;

        for extra in target.extra_link_inputs() {
            linker.add_file(extra.weight, &extra.name);
        }

        if self.ctx.options.num_jobs == 0 {
            self.compile_sequential(target, &buckets, &compilers, &working, &source_root, &mut linker)?;
        } else {
            self.compile_parallel(target, &buckets, &compilers, &working, &source_root, &mut linker)?;
        }

        self.link(name, target, &linker, &working)
    }

    fn compilers_for(
        &self,
        target: &TargetDescriptor,
        buckets: &SourceBuckets,
    ) -> Result<HashMap<Language, Arc<CompilerDriver>>> {
        let mut compilers = HashMap::new();
        for (lang, files) in buckets.iter() {
            if files.is_empty() {
                continue;
            }
            let driver = toolchain::get_compiler(
                self.project.compiler_for(lang),
                lang,
                target.flags(lang),
                &target.defines(lang),
                self.project.overrides.for_language(lang),
            )?;
            compilers.insert(lang, Arc::new(driver));
        }
        Ok(compilers)
    }

    fn linker_for(&self, target: &TargetDescriptor) -> Result<LinkerDriver> {
        let linker = toolchain::get_linker(
            self.project.linker_name(),
            target.linker_flags.clone(),
            target.linker_libs.clone(),
            &self.project.overrides,
        )?;
        let ext = target
            .binary_ext_override
            .as_ref()
            .or(self.project.project_ext.as_ref());
        Ok(match ext {
            Some(ext) => linker.with_ext(ext.clone()),
            None => linker,
        })
    }

    /// Compile one source at a time; the first failure aborts the target.
    ///
    /// Each compile is captured and reported like a scheduled job.
    fn compile_sequential(
        &self,
        target: &TargetDescriptor,
        buckets: &SourceBuckets,
        compilers: &HashMap<Language, Arc<CompilerDriver>>,
        working: &Path,
        source_root: &Path,
        linker: &mut LinkerDriver,
    ) -> Result<()> {
        let ctx = &*self.ctx;
        let obj_base = working.join("obj");
        for (lang, files) in buckets.iter() {
            let Some(driver) = compilers.get(&lang) else {
                continue;
            };
            for src in files {
                let obj = object_path(working, source_root, src)?;
                if driver.needs_compile(ctx, working, source_root, src, &obj) {
                    let mut job = CompileJob {
                        ctx: Arc::clone(&self.ctx),
                        driver: Arc::clone(driver),
                        working_dir: working.to_path_buf(),
                        source_base: source_root.to_path_buf(),
                        input: src.clone(),
                        output: obj.clone(),
                        extra_args: Vec::new(),
                    };
                    if !report_job(ctx, &run_job(&mut job)) {
                        return Err(BuildError::CompileFailed {
                            files: vec![src.clone()],
                        });
                    }
                }
                linker.add_file(link_order_for(&target.linker_order, &obj_base, &obj), obj);
            }
        }
        Ok(())
    }

    /// Register every object up front, then compile the stale ones on the
    /// scheduler. Failures are collected and reported together.
    fn compile_parallel(
        &self,
        target: &TargetDescriptor,
        buckets: &SourceBuckets,
        compilers: &HashMap<Language, Arc<CompilerDriver>>,
        working: &Path,
        source_root: &Path,
        linker: &mut LinkerDriver,
    ) -> Result<()> {
        let ctx = &self.ctx;
        let obj_base = working.join("obj");
        let mut jobs = Vec::new();
        for (lang, files) in buckets.iter() {
            let Some(driver) = compilers.get(&lang) else {
                continue;
            };
            for src in files {
                let obj = object_path(working, source_root, src)?;
                if driver.needs_compile(ctx, working, source_root, src, &obj) {
                    jobs.push(CompileJob {
                        ctx: Arc::clone(ctx),
                        driver: Arc::clone(driver),
                        working_dir: working.to_path_buf(),
                        source_base: source_root.to_path_buf(),
                        input: src.clone(),
                        output: obj.clone(),
                        extra_args: Vec::new(),
                    });
                }
                linker.add_file(link_order_for(&target.linker_order, &obj_base, &obj), obj);
            }
        }
        if jobs.is_empty() {
            return Ok(());
        }

        let inputs: Vec<PathBuf> = jobs.iter().map(|j| j.input.clone()).collect();
        let scheduler = JobScheduler::new(ctx.options.num_jobs).with_progress(ctx.silent());
        let reports = scheduler.run(jobs)?;

        // Reports are a prefix of the submitted jobs, in submission order.
        let mut failed = Vec::new();
        for (input, report) in inputs.into_iter().zip(reports) {
            if !report_job(ctx, &report) {
                failed.push(input);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BuildError::CompileFailed { files: failed })
        }
    }

    /// Link into a staging file and move it over the artifact on success.
    fn link(
        &self,
        name: &str,
        target: &TargetDescriptor,
        linker: &LinkerDriver,
        working: &Path,
    ) -> Result<PathBuf> {
        let ctx = &*self.ctx;
        let artifact = self.artifact_path(target, linker, working);
        let staging = staging_path(&artifact);
        if staging.exists() {
            fs::remove_file(&staging).map_err(|e| BuildError::io(&staging, e))?;
        }

        let mut output = ProcessOutput::default();
        let linked = linker.link(ctx, &staging, &[], Some(&mut output));
        ctx.console.print_block(&output);

        match linked {
            Ok(true) => {
                fs::rename(&staging, &artifact).map_err(|e| BuildError::io(&artifact, e))?;
                debug!(target = name, artifact = %artifact.display(), "linked");
                Ok(artifact)
            }
            Ok(false) => {
                print_hint(ctx, &output);
                discard_staging(&staging);
                Err(BuildError::LinkFailed {
                    target: name.to_string(),
                })
            }
            Err(e) => {
                discard_staging(&staging);
                Err(e)
            }
        }
    }

    /// `<folder>/<binary><ext>`, each part falling back target, project, default.
    fn artifact_path(&self, target: &TargetDescriptor, linker: &LinkerDriver, working: &Path) -> PathBuf {
        let folder = target
            .binary_folder_override
            .clone()
            .or_else(|| self.project.binary_folder_override.clone())
            .unwrap_or_else(|| working.join("bin"));
        let binary = target
            .project_binary_override
            .as_deref()
            .unwrap_or(&self.project.project_binary);
        folder.join(format!("{}{}", binary, linker.get_ext()))
    }

    /// Clean every requested target in order. `all` expands to every target.
    pub fn clean_targets(&self, names: &[String]) -> Result<BuildSummary> {
        let names = self.project.resolve_targets(names)?;
        let mut summary = BuildSummary::default();
        for name in names {
            match self.clean_target(&name) {
                Ok(true) => {
                    self.ctx.console.success(&format!("cleaned '{name}'"));
                    summary.succeeded.push(name);
                }
                Ok(false) => {
                    self.ctx.console.warn(&format!("nothing to clean for '{name}'"));
                    summary.succeeded.push(name);
                }
                Err(e) => {
                    self.ctx.console.error(&format!("target '{name}': {e}"));
                    summary.failed.push(name);
                    if self.ctx.options.fail_exit {
                        break;
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Remove the object and dependency-record folders of `name`.
    pub fn clean_target(&self, name: &str) -> Result<bool> {
        self.project.target(name)?;
        clean_working_path(&self.project.working_path(name))
    }
}

fn staging_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn discard_staging(staging: &Path) {
    if let Err(e) = fs::remove_file(staging)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %staging.display(), error = %e, "could not remove staging file");
    }
}

/// Print a finished job's output, then its error and a hint if it failed.
/// Returns whether the job succeeded.
fn report_job(ctx: &BuildContext, report: &JobReport) -> bool {
    ctx.console.print_block(&report.output);
    if report.succeeded {
        return true;
    }
    if let Some(e) = &report.error {
        ctx.console.error(&e.to_string());
    }
    print_hint(ctx, &report.output);
    false
}

fn print_hint(ctx: &BuildContext, output: &ProcessOutput) {
    if let Some(hint) = FeedbackAnalyzer::analyze(&output.combined()) {
        ctx.console.warn(&hint);
    }
}
