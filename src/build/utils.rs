use crate::config::{Language, LanguageExtensions, LinkOrderKind, LinkOrderRule, SourceEntry};
use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Sources of one target split by language, each bucket in gather order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceBuckets {
    pub c: Vec<PathBuf>,
    pub cpp: Vec<PathBuf>,
    pub asm: Vec<PathBuf>,
}

impl SourceBuckets {
    /// Buckets in build order: C, then C++, then assembly.
    pub fn iter(&self) -> impl Iterator<Item = (Language, &[PathBuf])> {
        [
            (Language::C, self.c.as_slice()),
            (Language::Cpp, self.cpp.as_slice()),
            (Language::Asm, self.asm.as_slice()),
        ]
        .into_iter()
    }

    pub fn len(&self) -> usize {
        self.c.len() + self.cpp.len() + self.asm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, lang: Language, path: PathBuf) {
        match lang {
            Language::C => self.c.push(path),
            Language::Cpp => self.cpp.push(path),
            Language::Asm => self.asm.push(path),
        }
    }
}

/// Expand `entries` below `root` and classify every file.
///
/// Directories are walked recursively in path order, following symlinks.
/// An unreadable folder or a link loop fails the whole gather. An entry's
/// explicit language wins over its extension; files matching no language
/// are skipped.
pub fn gather_sources(
    root: &Path,
    entries: &[SourceEntry],
    extensions: &LanguageExtensions,
) -> Result<SourceBuckets> {
    let mut buckets = SourceBuckets::default();
    for entry in entries {
        let path = root.join(entry.path());
        let files: Vec<PathBuf> = if path.is_dir() {
            let mut files = Vec::new();
            for item in WalkDir::new(&path).follow_links(true).sort_by_file_name() {
                let entry = item.map_err(|e| walk_error(&path, e))?;
                if entry.path().is_file() {
                    files.push(entry.into_path());
                }
            }
            files
        } else if path.is_file() {
            vec![path]
        } else {
            return Err(BuildError::Config(format!(
                "source '{}' does not exist",
                path.display()
            )));
        };

        for file in files {
            match entry.language().or_else(|| extensions.classify(&file)) {
                Some(lang) => buckets.push(lang, file),
                None => debug!(file = %file.display(), "skipping file with unknown extension"),
            }
        }
    }
    Ok(buckets)
}

fn walk_error(root: &Path, err: walkdir::Error) -> BuildError {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(io) => BuildError::io(path, io),
        None => BuildError::Config(format!(
            "symlink loop while expanding '{}'",
            path.display()
        )),
    }
}

/// Weight of `object` under `rules`, `0` when no rule matches.
///
/// `name` rules compare the file name, `path` rules the path relative to
/// `obj_base`. The first matching rule wins.
pub fn link_order_for(rules: &[LinkOrderRule], obj_base: &Path, object: &Path) -> i64 {
    let file_name = object.file_name().and_then(|n| n.to_str());
    let relative = object.strip_prefix(obj_base).ok();
    rules
        .iter()
        .find(|rule| match rule.kind {
            LinkOrderKind::Name => file_name == Some(rule.name.as_str()),
            LinkOrderKind::Path => relative.is_some_and(|r| r == Path::new(&rule.name)),
            LinkOrderKind::Extra => false,
        })
        .map_or(0, |rule| rule.weight)
}
