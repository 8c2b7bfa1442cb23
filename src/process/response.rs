use crate::error::{BuildError, Result};
use std::io::Write;
use tempfile::TempPath;

/// How a tool accepts arguments from a response file when the command line
/// would be too long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFile {
    /// `tool @file` (GCC, Clang, binutils)
    At,
    /// `tool -@ file` (NASM)
    Nasm,
}

/// A written response file and the arguments that replace the originals.
/// The file is removed when this is dropped.
#[derive(Debug)]
pub struct ResponseInvocation {
    pub args: Vec<String>,
    pub path: TempPath,
}

impl ResponseFile {
    /// Write one quoted argument per line to a fresh temporary file.
    ///
    /// Each call gets its own file, so concurrent jobs never share one.
    pub fn write(self, args: &[String]) -> Result<ResponseInvocation> {
        let mut file = tempfile::Builder::new()
            .prefix("rbuild-")
            .suffix(".args")
            .tempfile()
            .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;
        let body = args.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join("\n");
        file.write_all(body.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BuildError::io(file.path(), e))?;

        let path = file.into_temp_path();
        let location = path.display().to_string();
        let args = match self {
            ResponseFile::At => vec![format!("@{location}")],
            ResponseFile::Nasm => vec!["-@".to_string(), location],
        };
        Ok(ResponseInvocation { args, path })
    }
}

/// Double-quote `arg`, escaping backslashes and quotes.
pub fn quote_arg(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("-O2"), "\"-O2\"");
        assert_eq!(quote_arg("a \"b\""), "\"a \\\"b\\\"\"");
        assert_eq!(quote_arg("C:\\x"), "\"C:\\\\x\"");
    }

    #[test]
    fn test_at_file_contents_and_cleanup() {
        let args = vec!["-c".to_string(), "my file.c".to_string()];
        let inv = ResponseFile::At.write(&args).unwrap();
        assert_eq!(inv.args.len(), 1);
        assert!(inv.args[0].starts_with('@'));
        let path = inv.path.to_path_buf();
        assert_eq!(fs::read_to_string(&path).unwrap(), "\"-c\"\n\"my file.c\"");
        drop(inv);
        assert!(!path.exists());
    }

    #[test]
    fn test_nasm_separator_and_unique_paths() {
        let a = ResponseFile::Nasm.write(&["x.asm".to_string()]).unwrap();
        let b = ResponseFile::Nasm.write(&["x.asm".to_string()]).unwrap();
        assert_eq!(a.args[0], "-@");
        assert_ne!(a.args[1], b.args[1]);
    }
}
