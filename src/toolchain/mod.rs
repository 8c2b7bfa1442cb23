//! Driver factory
//!
//! Maps the toolchain names used in project descriptors to configured
//! compiler and linker drivers. Names are matched exactly.

pub mod types;

pub use types::{CompilerFamily, LinkerFamily};

use crate::config::{BinaryOverrides, Language};
use crate::driver::{CompilerDriver, LinkerDriver};
use crate::error::{BuildError, Result};
use tracing::debug;

const DEFAULT_ARCHIVER_FLAGS: &str = "rcs";

fn compiler_role(lang: Language) -> &'static str {
    match lang {
        Language::C => "C compiler",
        Language::Cpp => "C++ compiler",
        Language::Asm => "assembler",
    }
}

/// Build the compiler driver named `name` for sources in `lang`.
///
/// `binary_override` replaces the toolchain's default executable; the
/// `generic` toolchain has none and fails without it.
pub fn get_compiler(
    name: &str,
    lang: Language,
    flags: Vec<String>,
    defines: &[String],
    binary_override: Option<&str>,
) -> Result<CompilerDriver> {
    let family = CompilerFamily::parse(name)
        .filter(|f| f.supports(lang))
        .ok_or_else(|| BuildError::UnknownToolchain {
            role: compiler_role(lang),
            name: name.to_string(),
        })?;

    let binary = match binary_override.or(family.default_binary(lang)) {
        Some(b) => b,
        None => {
            return Err(BuildError::Config(format!(
                "{} '{name}' requires an explicit binary override",
                compiler_role(lang)
            )));
        }
    };
    debug!(toolchain = name, language = lang.name(), binary, "compiler selected");
    Ok(CompilerDriver::new(family.driver_kind(), binary, flags, defines))
}

/// Build the linker driver named `name`.
///
/// Archivers default to `rcs` when no flags are given. GCC-style linkers
/// take both frontends from `overrides.linker` / `overrides.linker_cpp`.
pub fn get_linker(
    name: &str,
    flags: Vec<String>,
    libs: Vec<String>,
    overrides: &BinaryOverrides,
) -> Result<LinkerDriver> {
    let family = LinkerFamily::parse(name).ok_or_else(|| BuildError::UnknownToolchain {
        role: "linker",
        name: name.to_string(),
    })?;

    if let Some((c, cpp)) = family.frontends() {
        let c = overrides.linker.as_deref().unwrap_or(c);
        let cpp = overrides.linker_cpp.as_deref().unwrap_or(cpp);
        debug!(toolchain = name, c, cpp, "linker selected");
        return Ok(LinkerDriver::gnu(c, cpp, flags, libs));
    }

    let Some(binary) = overrides.linker.as_deref().or(family.default_binary()) else {
        return Err(BuildError::Config(format!(
            "linker '{name}' requires an explicit binary override"
        )));
    };
    let flags = if family.is_archiver() && flags.is_empty() {
        vec![DEFAULT_ARCHIVER_FLAGS.to_string()]
    } else {
        flags
    };
    debug!(toolchain = name, binary, "linker selected");
    Ok(LinkerDriver::new(family.plain_kind(), binary, flags, libs))
}
