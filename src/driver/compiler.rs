use super::{dependency_path, ensure_parent};
use crate::build::BuildContext;
use crate::depfile::DependencyRecord;
use crate::error::Result;
use crate::process::{ProcessOutput, ResponseFile};
use crate::ui::relative_display;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerKind {
    /// Always rebuilds; `{bin, -c, in, -o, out, ...}`
    Generic,
    /// GCC-compatible frontend writing a dependency record on every compile
    Gnu,
    /// GNU `as`: `--defsym` defines, `--MD` dependency record
    Gas,
    /// NASM: `-D` defines, `-MD -MF` dependency record, `-@` response files
    Nasm,
}

#[derive(Debug, Clone)]
pub struct CompilerDriver {
    kind: CompilerKind,
    binary: String,
    flags: Vec<String>,
    defines: Vec<String>,
}

impl CompilerDriver {
    pub fn new(kind: CompilerKind, binary: impl Into<String>, flags: Vec<String>, defines: &[String]) -> Self {
        let defines = match kind {
            CompilerKind::Gas => defines
                .iter()
                .flat_map(|d| {
                    let value = if d.contains('=') { d.clone() } else { format!("{d}=1") };
                    ["--defsym".to_string(), value]
                })
                .collect(),
            _ => defines.iter().map(|d| format!("-D{d}")).collect(),
        };
        Self {
            kind,
            binary: binary.into(),
            flags,
            defines,
        }
    }

    pub fn kind(&self) -> CompilerKind {
        self.kind
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn tracks_dependencies(&self) -> bool {
        self.kind != CompilerKind::Generic
    }

    /// Whether `output` must be rebuilt from `input`.
    ///
    /// Any doubt (missing or malformed record, unreadable file) means yes.
    pub fn needs_compile(
        &self,
        ctx: &BuildContext,
        working_dir: &Path,
        source_base: &Path,
        input: &Path,
        output: &Path,
    ) -> bool {
        if !self.tracks_dependencies() || ctx.options.rebuild {
            return true;
        }
        match self.stale_reason(ctx, working_dir, source_base, input, output) {
            Some(reason) => {
                debug!(source = %input.display(), %reason, "needs compile");
                true
            }
            None => {
                debug!(source = %input.display(), "up to date");
                false
            }
        }
    }

    fn stale_reason(
        &self,
        ctx: &BuildContext,
        working_dir: &Path,
        source_base: &Path,
        input: &Path,
        output: &Path,
    ) -> Option<String> {
        let dep_path = match dependency_path(working_dir, source_base, input) {
            Ok(p) => p,
            Err(e) => return Some(e.to_string()),
        };
        if !dep_path.exists() {
            return Some("no dependency record".to_string());
        }
        // The object changes within a run, so it is never cached.
        let built = match fs::metadata(output).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => return Some(format!("object {}: {e}", output.display())),
        };
        match ctx.mtimes.modified(input) {
            Ok(t) if t > built => return Some("source is newer than object".to_string()),
            Ok(_) => {}
            Err(e) => return Some(format!("source: {e}")),
        }
        let content = match fs::read_to_string(&dep_path) {
            Ok(c) => c,
            Err(e) => return Some(format!("dependency record: {e}")),
        };
        let Some(record) = DependencyRecord::parse(&content) else {
            return Some("malformed dependency record".to_string());
        };
        for prereq in &record.prerequisites {
            match ctx.mtimes.modified(prereq) {
                Ok(t) if t > built => return Some(format!("{} is newer", prereq.display())),
                Ok(_) => {}
                Err(e) => return Some(format!("{}: {e}", prereq.display())),
            }
        }
        None
    }

    /// Compile `input` into `output`. Returns whether the compiler exited with 0.
    #[allow(clippy::too_many_arguments)]
    pub fn compile(
        &self,
        ctx: &BuildContext,
        working_dir: &Path,
        source_base: &Path,
        input: &Path,
        output: &Path,
        extra_args: &[String],
        mut capture: Option<&mut ProcessOutput>,
    ) -> Result<bool> {
        ensure_parent(output)?;

        let mut args: Vec<String> = Vec::new();
        if matches!(self.kind, CompilerKind::Generic | CompilerKind::Gnu) {
            args.push("-c".to_string());
        }
        args.push(input.display().to_string());
        args.push("-o".to_string());
        args.push(output.display().to_string());
        args.extend(self.flags.iter().cloned());
        args.extend(self.defines.iter().cloned());

        if self.tracks_dependencies() {
            let dep_path = dependency_path(working_dir, source_base, input)?;
            ensure_parent(&dep_path)?;
            let dep = dep_path.display().to_string();
            match self.kind {
                CompilerKind::Gnu => {
                    args.extend([ctx.options.dep_mode.flag().to_string(), "-MF".to_string(), dep])
                }
                CompilerKind::Gas => args.extend(["--MD".to_string(), dep]),
                CompilerKind::Nasm => args.extend(["-MD".to_string(), "-MF".to_string(), dep]),
                CompilerKind::Generic => {}
            }
        }
        args.extend(extra_args.iter().cloned());

        let silent = ctx.silent();
        if silent {
            let line = format!("{}\n", relative_display(input));
            match capture.as_deref_mut() {
                Some(out) => out.stdout.push_str(&line),
                None => ctx.console.print(&line),
            }
        }

        let fallback = match self.kind {
            CompilerKind::Nasm => ResponseFile::Nasm,
            _ => ResponseFile::At,
        };
        let code = ctx
            .runner()
            .run(&self.binary, &args, Some(fallback), silent, capture)?;
        Ok(code == 0)
    }
}

impl std::fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompilerKind::Generic => "generic",
            CompilerKind::Gnu => "gnu",
            CompilerKind::Gas => "as",
            CompilerKind::Nasm => "nasm",
        })
    }
}
