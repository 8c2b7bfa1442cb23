use crate::cache::MtimeCache;
use crate::config::BuildOptions;
use crate::process::ProcessRunner;
use crate::ui::Console;

/// State shared by every driver and job of one build invocation.
///
/// Created once per run and handed around by reference (or `Arc` across
/// worker threads); nothing in it is global.
#[derive(Debug)]
pub struct BuildContext {
    pub options: BuildOptions,
    pub mtimes: MtimeCache,
    pub console: Console,
}

impl BuildContext {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            mtimes: MtimeCache::new(options.mtime_cache),
            options,
            console: Console::new(),
        }
    }

    /// Short progress lines instead of full command echoes.
    pub fn silent(&self) -> bool {
        !self.options.verbose
    }

    pub fn runner(&self) -> ProcessRunner<'_> {
        ProcessRunner::new(&self.console)
    }
}
