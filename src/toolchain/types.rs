use crate::config::Language;
use crate::driver::{CompilerKind, LinkerKind};

/// Compiler toolchains a project can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    Gcc,
    Clang,
    /// GNU assembler
    Gas,
    Nasm,
    /// Any other tool taking `-c in -o out`; needs an explicit binary
    Generic,
}

impl CompilerFamily {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gcc" => Some(CompilerFamily::Gcc),
            "clang" => Some(CompilerFamily::Clang),
            "as" => Some(CompilerFamily::Gas),
            "nasm" => Some(CompilerFamily::Nasm),
            "generic" => Some(CompilerFamily::Generic),
            _ => None,
        }
    }

    /// Whether this toolchain can build `lang` at all.
    pub fn supports(self, lang: Language) -> bool {
        match self {
            CompilerFamily::Gas | CompilerFamily::Nasm => lang == Language::Asm,
            _ => true,
        }
    }

    pub fn driver_kind(self) -> CompilerKind {
        match self {
            CompilerFamily::Gcc | CompilerFamily::Clang => CompilerKind::Gnu,
            CompilerFamily::Gas => CompilerKind::Gas,
            CompilerFamily::Nasm => CompilerKind::Nasm,
            CompilerFamily::Generic => CompilerKind::Generic,
        }
    }

    /// Executable used when the project does not override it.
    pub fn default_binary(self, lang: Language) -> Option<&'static str> {
        match (self, lang) {
            (CompilerFamily::Gcc, Language::Cpp) => Some("g++"),
            (CompilerFamily::Gcc, _) => Some("gcc"),
            (CompilerFamily::Clang, Language::Cpp) => Some("clang++"),
            (CompilerFamily::Clang, _) => Some("clang"),
            (CompilerFamily::Gas, _) => Some("as"),
            (CompilerFamily::Nasm, _) => Some("nasm"),
            (CompilerFamily::Generic, _) => None,
        }
    }
}

/// Linker toolchains a project can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerFamily {
    Gcc,
    Clang,
    Ld,
    LdGold,
    LdLld,
    Ar,
    LlvmAr,
    Generic,
}

impl LinkerFamily {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gcc" => Some(LinkerFamily::Gcc),
            "clang" => Some(LinkerFamily::Clang),
            "ld" => Some(LinkerFamily::Ld),
            "ld.gold" => Some(LinkerFamily::LdGold),
            "ld.lld" => Some(LinkerFamily::LdLld),
            "ar" => Some(LinkerFamily::Ar),
            "llvm-ar" => Some(LinkerFamily::LlvmAr),
            "generic" => Some(LinkerFamily::Generic),
            _ => None,
        }
    }

    /// `(C frontend, C++ frontend)` for the split GCC-style linkers.
    pub fn frontends(self) -> Option<(&'static str, &'static str)> {
        match self {
            LinkerFamily::Gcc => Some(("gcc", "g++")),
            LinkerFamily::Clang => Some(("clang", "clang++")),
            _ => None,
        }
    }

    pub fn default_binary(self) -> Option<&'static str> {
        match self {
            LinkerFamily::Gcc => Some("gcc"),
            LinkerFamily::Clang => Some("clang"),
            LinkerFamily::Ld => Some("ld"),
            LinkerFamily::LdGold => Some("ld.gold"),
            LinkerFamily::LdLld => Some("ld.lld"),
            LinkerFamily::Ar => Some("ar"),
            LinkerFamily::LlvmAr => Some("llvm-ar"),
            LinkerFamily::Generic => None,
        }
    }

    pub fn is_archiver(self) -> bool {
        matches!(self, LinkerFamily::Ar | LinkerFamily::LlvmAr)
    }

    /// Driver kind for every family without a split frontend.
    pub fn plain_kind(self) -> LinkerKind {
        if self.is_archiver() {
            LinkerKind::Archiver
        } else {
            LinkerKind::Generic
        }
    }
}
