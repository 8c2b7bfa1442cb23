use super::ensure_parent;
use crate::build::BuildContext;
use crate::error::Result;
use crate::process::{ProcessOutput, ResponseFile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const CPP_OBJECT_SUFFIXES: [&str; 5] = [".cpp.o", ".cc.o", ".cxx.o", ".c++.o", ".C.o"];

/// Whether an object file name says it was compiled from C++.
pub fn is_cpp_object(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| CPP_OBJECT_SUFFIXES.iter().any(|s| n.ends_with(s)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkerKind {
    /// `{bin, -o, out, libs, flags, extra, inputs}`
    Generic,
    /// C frontend that switches to its C++ twin once a C++ object shows up
    Gnu { cpp_binary: String, switched: bool },
    /// `{bin, flags, out, libs, extra, inputs}`
    Archiver,
}

/// Collects link inputs in weight groups and runs the linker.
///
/// Groups are concatenated by ascending weight; inside a group inputs keep
/// the order they were added in.
#[derive(Debug, Clone)]
pub struct LinkerDriver {
    kind: LinkerKind,
    binary: String,
    flags: Vec<String>,
    libs: Vec<String>,
    groups: BTreeMap<i64, Vec<PathBuf>>,
    ext_override: Option<String>,
}

impl LinkerDriver {
    pub fn new(kind: LinkerKind, binary: impl Into<String>, flags: Vec<String>, libs: Vec<String>) -> Self {
        Self {
            kind,
            binary: binary.into(),
            flags,
            libs,
            groups: BTreeMap::new(),
            ext_override: None,
        }
    }

    pub fn gnu(c_binary: impl Into<String>, cpp_binary: impl Into<String>, flags: Vec<String>, libs: Vec<String>) -> Self {
        Self::new(
            LinkerKind::Gnu {
                cpp_binary: cpp_binary.into(),
                switched: false,
            },
            c_binary,
            flags,
            libs,
        )
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext_override = Some(ext.into());
        self
    }

    pub fn kind(&self) -> &LinkerKind {
        &self.kind
    }

    /// The executable `link` will run right now.
    pub fn binary(&self) -> &str {
        match &self.kind {
            LinkerKind::Gnu {
                cpp_binary,
                switched: true,
            } => cpp_binary,
            _ => &self.binary,
        }
    }

    pub fn add_file(&mut self, order: i64, path: impl Into<PathBuf>) {
        let path = path.into();
        if let LinkerKind::Gnu { switched, .. } = &mut self.kind
            && !*switched
            && is_cpp_object(&path)
        {
            debug!(object = %path.display(), "switching to the C++ link frontend");
            *switched = true;
        }
        self.groups.entry(order).or_default().push(path);
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Every registered input in link order.
    pub fn ordered_inputs(&self) -> Vec<PathBuf> {
        self.groups.values().flatten().cloned().collect()
    }

    pub fn get_ext(&self) -> String {
        if let Some(ext) = &self.ext_override {
            return ext.clone();
        }
        match self.kind {
            LinkerKind::Archiver => ".a".to_string(),
            _ if cfg!(windows) => ".exe".to_string(),
            _ => String::new(),
        }
    }

    /// Link every registered input into `output`. Returns whether the tool exited with 0.
    pub fn link(
        &self,
        ctx: &BuildContext,
        output: &Path,
        extra_flags: &[String],
        mut capture: Option<&mut ProcessOutput>,
    ) -> Result<bool> {
        ensure_parent(output)?;

        let inputs = self.ordered_inputs().into_iter().map(|p| p.display().to_string());
        let out = output.display().to_string();
        let mut args: Vec<String> = Vec::new();
        match self.kind {
            LinkerKind::Archiver => {
                args.extend(self.flags.iter().cloned());
                args.push(out);
                args.extend(self.libs.iter().cloned());
            }
            LinkerKind::Generic | LinkerKind::Gnu { .. } => {
                args.push("-o".to_string());
                args.push(out);
                args.extend(self.libs.iter().cloned());
                args.extend(self.flags.iter().cloned());
                if ctx.options.static_link && matches!(self.kind, LinkerKind::Gnu { .. }) {
                    args.push("-static".to_string());
                }
            }
        }
        args.extend(extra_flags.iter().cloned());
        args.extend(inputs);

        let silent = ctx.silent();
        if silent {
            match capture.as_deref_mut() {
                Some(c) => c.stdout.push_str("linking\n"),
                None => ctx.console.print("linking"),
            }
        }
        let code = ctx
            .runner()
            .run(self.binary(), &args, Some(ResponseFile::At), silent, capture)?;
        Ok(code == 0)
    }
}
