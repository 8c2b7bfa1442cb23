//! Compiler and linker drivers.
//!
//! Each driver is a small closed set of variants behind one capability set:
//! compilers decide staleness and compile one source into one object,
//! linkers collect ordered inputs and produce the final artifact.

mod compiler;
mod linker;

pub use compiler::{CompilerDriver, CompilerKind};
pub use linker::{LinkerDriver, LinkerKind, is_cpp_object};

use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};

/// Path of `source` relative to `source_base`. Both must exist.
///
/// Only the folder of `source` is resolved, so a symlinked file keeps its
/// own name instead of its target's.
pub fn relative_source(source_base: &Path, source: &Path) -> Result<PathBuf> {
    let base = source_base
        .canonicalize()
        .map_err(|e| BuildError::io(source_base, e))?;
    let file = match (source.parent(), source.file_name()) {
        (Some(dir), Some(name)) => {
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            dir.canonicalize()
                .map_err(|e| BuildError::io(dir, e))?
                .join(name)
        }
        _ => source.canonicalize().map_err(|e| BuildError::io(source, e))?,
    };
    file.strip_prefix(&base)
        .map(Path::to_path_buf)
        .map_err(|_| BuildError::OutsideSourceRoot {
            source_file: source.to_path_buf(),
            root: source_base.to_path_buf(),
        })
}

/// `<working_dir>/obj/<relative source>.o`
pub fn object_path(working_dir: &Path, source_base: &Path, source: &Path) -> Result<PathBuf> {
    let rel = relative_source(source_base, source)?;
    Ok(append_ext(working_dir.join("obj").join(rel), ".o"))
}

/// `<working_dir>/tmp/<relative source>.d`
pub fn dependency_path(working_dir: &Path, source_base: &Path, source: &Path) -> Result<PathBuf> {
    let rel = relative_source(source_base, source)?;
    Ok(append_ext(working_dir.join("tmp").join(rel), ".d"))
}

fn append_ext(path: PathBuf, ext: &str) -> PathBuf {
    let mut s = path.into_os_string();
    s.push(ext);
    PathBuf::from(s)
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))
        }
        _ => Ok(()),
    }
}
