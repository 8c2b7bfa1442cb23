//! Target cleanup.
//!
//! Removes the object and dependency-record folders of a target's working
//! path. Sources and the binary output folder are never touched.

use crate::error::{BuildError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const CLEANED_FOLDERS: [&str; 2] = ["obj", "tmp"];

/// Delete `<working_path>/obj` and `<working_path>/tmp`. Returns whether
/// anything was removed.
pub fn clean_working_path(working_path: &Path) -> Result<bool> {
    let mut cleaned = false;
    for folder in CLEANED_FOLDERS {
        let dir = working_path.join(folder);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
            debug!(dir = %dir.display(), "removed");
            cleaned = true;
        }
    }
    Ok(cleaned)
}
