use super::response::quote_arg;

/// `CreateProcess` rejects command lines of 32K characters or more.
pub const CMDLINE_MAX: usize = 32 * 1024;

/// Length of the quoted, space-joined command line `CreateProcess` receives.
pub fn command_line_len(program: &str, args: &[String]) -> usize {
    quote_arg(program).len() + args.iter().map(|a| quote_arg(a).len() + 1).sum::<usize>()
}
