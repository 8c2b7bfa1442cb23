/// Stay well under `ARG_MAX`, which also has to hold the environment.
pub const CMDLINE_MAX: usize = 1024 * 1024;

/// Bytes the argument vector occupies once handed to `execve`.
pub fn command_line_len(program: &str, args: &[String]) -> usize {
    program.len() + 1 + args.iter().map(|a| a.len() + 1).sum::<usize>()
}
