//! Project descriptor and run configuration.
//!
//! The descriptor types here are the fully resolved form consumed by the
//! build engine: every target already carries its own flags, defines and
//! link rules. They deserialize from TOML or JSON.

use crate::error::{BuildError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source language, used to pick a compiler driver.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[serde(alias = "c++")]
    Cpp,
    Asm,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Asm => "assembly",
        }
    }
}

/// File extensions (with leading dot) recognized per language.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LanguageExtensions {
    pub c: Vec<String>,
    pub cpp: Vec<String>,
    pub asm: Vec<String>,
}

impl Default for LanguageExtensions {
    fn default() -> Self {
        let mut cpp: Vec<String> = [".cpp", ".c++", ".cxx", ".cc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Case-insensitive filesystems can't tell `.C` from `.c`
        if cfg!(target_os = "linux") {
            cpp.push(".C".to_string());
        }
        Self {
            c: vec![".c".to_string()],
            cpp,
            asm: [".asm", ".s", ".S"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LanguageExtensions {
    pub fn classify(&self, path: &Path) -> Option<Language> {
        let ext = format!(".{}", path.extension()?.to_str()?);
        if self.c.contains(&ext) {
            Some(Language::C)
        } else if self.cpp.contains(&ext) {
            Some(Language::Cpp)
        } else if self.asm.contains(&ext) {
            Some(Language::Asm)
        } else {
            None
        }
    }
}

/// Which dependency-record flag the dependency-tracking drivers pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepMode {
    /// `-MD`: system headers are tracked too
    #[default]
    All,
    /// `-MMD`: system headers are left out of incremental checks
    UserOnly,
}

impl DepMode {
    pub fn flag(self) -> &'static str {
        match self {
            DepMode::All => "-MD",
            DepMode::UserOnly => "-MMD",
        }
    }
}

/// Run configuration shared by every component of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Echo full command lines instead of short progress lines
    pub verbose: bool,
    /// Ignore dependency records and rebuild everything
    pub rebuild: bool,
    /// Worker slots; 0 compiles sequentially
    pub num_jobs: usize,
    /// Serve modification times from the shared cache
    pub mtime_cache: bool,
    pub dep_mode: DepMode,
    /// Pass `-static` to C/C++ frontend links
    pub static_link: bool,
    /// Stop at the first failed target
    pub fail_exit: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            rebuild: false,
            num_jobs: default_num_jobs(),
            mtime_cache: true,
            dep_mode: DepMode::All,
            static_link: false,
            fail_exit: false,
        }
    }
}

pub fn default_num_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Literal executables substituted for the defaults of a toolchain.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BinaryOverrides {
    pub c: Option<String>,
    pub cpp: Option<String>,
    pub asm: Option<String>,
    pub linker: Option<String>,
    pub linker_cpp: Option<String>,
}

impl BinaryOverrides {
    pub fn for_language(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::C => self.c.as_deref(),
            Language::Cpp => self.cpp.as_deref(),
            Language::Asm => self.asm.as_deref(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkOrderKind {
    /// Matches the object's file name
    #[default]
    Name,
    /// Matches the object's path relative to the target's `obj` folder
    Path,
    /// A literal link input registered before any compiled object
    Extra,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkOrderRule {
    pub name: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub kind: LinkOrderKind,
}

/// A source path relative to the project source folder, optionally tagged
/// with its language. Directories are expanded recursively.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceEntry {
    Path(PathBuf),
    Tagged {
        path: PathBuf,
        language: Option<Language>,
    },
}

impl SourceEntry {
    pub fn path(&self) -> &Path {
        match self {
            SourceEntry::Path(p) => p,
            SourceEntry::Tagged { path, .. } => path,
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            SourceEntry::Path(_) => None,
            SourceEntry::Tagged { language, .. } => *language,
        }
    }
}

/// Resolved description of one build target.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TargetDescriptor {
    pub sources: Vec<SourceEntry>,

    pub defines_all: Vec<String>,
    pub defines_asm: Vec<String>,
    pub defines_c_cpp: Vec<String>,
    pub defines_c: Vec<String>,
    pub defines_cpp: Vec<String>,

    pub flags_all: Vec<String>,
    pub flags_asm: Vec<String>,
    pub flags_c_cpp: Vec<String>,
    pub flags_c: Vec<String>,
    pub flags_cpp: Vec<String>,

    pub linker_flags: Vec<String>,
    pub linker_libs: Vec<String>,
    pub linker_order: Vec<LinkOrderRule>,

    pub binary_folder_override: Option<PathBuf>,
    pub project_binary_override: Option<String>,
    pub binary_ext_override: Option<String>,
}

impl TargetDescriptor {
    /// Compiler flags for `lang`, inherited as all, then C/C++, then the language's own.
    pub fn flags(&self, lang: Language) -> Vec<String> {
        match lang {
            Language::C => concat(&[&self.flags_all, &self.flags_c_cpp, &self.flags_c]),
            Language::Cpp => concat(&[&self.flags_all, &self.flags_c_cpp, &self.flags_cpp]),
            Language::Asm => concat(&[&self.flags_all, &self.flags_asm]),
        }
    }

    pub fn defines(&self, lang: Language) -> Vec<String> {
        match lang {
            Language::C => concat(&[&self.defines_all, &self.defines_c_cpp, &self.defines_c]),
            Language::Cpp => concat(&[&self.defines_all, &self.defines_c_cpp, &self.defines_cpp]),
            Language::Asm => concat(&[&self.defines_all, &self.defines_asm]),
        }
    }

    /// Link inputs outside the source tree, in declaration order.
    pub fn extra_link_inputs(&self) -> impl Iterator<Item = &LinkOrderRule> {
        self.linker_order
            .iter()
            .filter(|r| r.kind == LinkOrderKind::Extra)
    }
}

fn concat(parts: &[&Vec<String>]) -> Vec<String> {
    parts.iter().flat_map(|p| p.iter().cloned()).collect()
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum DefaultTargets {
    One(String),
    Many(Vec<String>),
}

/// Project-level settings plus every target.
#[derive(Deserialize, Debug, Clone)]
pub struct ProjectDescriptor {
    pub project_name: Option<String>,
    #[serde(default)]
    pub src_folder: PathBuf,
    pub working_folder: PathBuf,
    pub project_binary: String,
    pub project_ext: Option<String>,
    pub binary_folder_override: Option<PathBuf>,
    #[serde(default)]
    pub noarch: bool,

    pub compiler_all: Option<String>,
    pub compiler_c_cpp: Option<String>,
    pub compiler_c: Option<String>,
    pub compiler_cpp: Option<String>,
    pub compiler_asm: Option<String>,
    pub linker: Option<String>,

    #[serde(default)]
    pub overrides: BinaryOverrides,
    #[serde(default)]
    pub extensions: LanguageExtensions,

    pub targets_default: Option<DefaultTargets>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDescriptor>,
}

const DEFAULT_TOOLCHAIN: &str = "gcc";

impl ProjectDescriptor {
    pub fn compiler_for(&self, lang: Language) -> &str {
        let chain = match lang {
            Language::C => [&self.compiler_c, &self.compiler_c_cpp, &self.compiler_all],
            Language::Cpp => [&self.compiler_cpp, &self.compiler_c_cpp, &self.compiler_all],
            Language::Asm => [&self.compiler_asm, &self.compiler_all, &None],
        };
        chain
            .into_iter()
            .find_map(|c| c.as_deref())
            .unwrap_or(DEFAULT_TOOLCHAIN)
    }

    pub fn linker_name(&self) -> &str {
        self.linker.as_deref().unwrap_or(DEFAULT_TOOLCHAIN)
    }

    pub fn source_root(&self) -> PathBuf {
        if self.src_folder.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.src_folder.clone()
        }
    }

    /// `<working_folder>/<arch>/<target>`
    pub fn working_path(&self, target: &str) -> PathBuf {
        let mut path = self.working_folder.clone();
        if !self.noarch {
            path.push(host_arch_folder());
        }
        path.join(target)
    }

    pub fn target(&self, name: &str) -> Result<&TargetDescriptor> {
        self.targets
            .get(name)
            .ok_or_else(|| BuildError::Config(format!("invalid target '{name}'")))
    }

    /// Targets built when none are requested explicitly.
    ///
    /// Declared defaults that name no target are left out, see
    /// [`invalid_default_targets`](Self::invalid_default_targets).
    pub fn default_targets(&self) -> Vec<String> {
        self.declared_defaults()
            .into_iter()
            .filter(|name| self.is_target_name(name))
            .collect()
    }

    /// Declared defaults that name no target of this project.
    pub fn invalid_default_targets(&self) -> Vec<String> {
        self.declared_defaults()
            .into_iter()
            .filter(|name| !self.is_target_name(name))
            .collect()
    }

    fn declared_defaults(&self) -> Vec<String> {
        match &self.targets_default {
            None => self.targets.keys().cloned().collect(),
            Some(DefaultTargets::One(name)) if name == "all" => {
                self.targets.keys().cloned().collect()
            }
            Some(DefaultTargets::One(name)) => vec![name.clone()],
            Some(DefaultTargets::Many(names)) => names.clone(),
        }
    }

    fn is_target_name(&self, name: &str) -> bool {
        name == "all" || self.targets.contains_key(name)
    }

    /// Expand `all` and reject names that are not targets of this project.
    pub fn resolve_targets(&self, requested: &[String]) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for name in requested {
            if name == "all" {
                out.extend(self.targets.keys().cloned());
            } else if self.targets.contains_key(name) {
                out.push(name.clone());
            } else {
                return Err(BuildError::Config(format!("invalid target '{name}'")));
            }
        }
        Ok(out)
    }
}

fn host_arch_folder() -> &'static str {
    if cfg!(target_os = "windows") {
        "win"
    } else if cfg!(target_os = "linux") {
        "lin"
    } else if cfg!(target_os = "macos") {
        "mac"
    } else {
        "unknown"
    }
}

/// Load a project descriptor, picking the format from the file extension.
pub fn load_project(path: &Path) -> Result<ProjectDescriptor> {
    let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    let is_json = path.extension().is_some_and(|e| e == "json");
    let project: ProjectDescriptor = if is_json {
        serde_json::from_str(&text)
            .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?
    } else {
        toml::from_str(&text)
            .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?
    };
    Ok(project)
}
