use colored::*;

/// Turns well-known compiler and linker failures into a short hint.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. No entry point
        if output.contains("undefined reference to `main'")
            || output.contains("undefined symbol: main")
        {
            return Some(format!(
                "The target has no {} function.\nAdd one, or link with an archiver ({}) if this is a library.",
                "main()".bold().yellow(),
                "linker = \"ar\"".bold().green()
            ));
        }

        // 2. Unresolved symbols
        if output.contains("undefined reference to") || output.contains("undefined symbol") {
            return Some(format!(
                "It looks like a {} error.\nCheck {} and {} of this target, and whether an object is linked too early.",
                "Linker".bold().red(),
                "linker_libs".bold().yellow(),
                "linker_order".bold().yellow()
            ));
        }

        // 3. Missing header
        if output.contains("fatal error: ") && output.contains("No such file or directory") {
            return Some(format!(
                "It looks like a {} error.\nAdd the include folder to {} or {}.",
                "Missing Header".bold().red(),
                "flags_all".bold().yellow(),
                "flags_c_cpp".bold().yellow()
            ));
        }

        None
    }
}
