//! Symbolic shell tokens and their per-family literals.
//!
//! Statements are written against placeholders such as `{varl}PATH{varr}` or
//! `{fs}` so a single statement tree renders for both shell families. The
//! literal table is an exhaustive `match`, so every token has a value for
//! every [`OsFamily`].

use crate::family::OsFamily;

/// A placeholder that renders to a family specific literal.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ShellToken {
    /// File separator.
    Fs,
    /// Path list separator.
    Ps,
    /// Line terminator.
    Lf,
    /// Script file suffix.
    Sh,
    /// Sources another script into the current shell.
    Source,
    /// Comment leader.
    Rem,
    /// All positional arguments.
    Args,
    /// Left delimiter of a variable reference.
    Varl,
    /// Right delimiter of a variable reference.
    Varr,
    /// Returns from a function.
    Return,
    /// Exits the script.
    Exit,
    /// Exports a variable.
    Export,
    /// Temporary directory.
    Temp,
    /// Name of the invoking user.
    Uid,
    /// Filesystem root.
    Root,
    /// Discards a redirected stream.
    CloseFd,
    /// Creates a directory including parents.
    Md,
    /// Removes a file without prompting.
    Rm,
    /// Changes the working directory.
    Cd,
    /// Prints a file.
    Cat,
    /// Name of the executable search path variable.
    PathVariable,
    /// Name of the Java home variable.
    JavaHomeVariable,
    /// Name of the shared library search path variable.
    LibraryPathVariable,
    /// Script preamble.
    BeginScript,
    /// Script terminator.
    EndScript,
    /// Opens the function definition section.
    BeginFunctions,
    /// Closes the function definition section.
    EndFunctions,
}

impl ShellToken {
    /// Every token, in declaration order.
    pub const ALL: [Self; 27] = [
        Self::Fs,
        Self::Ps,
        Self::Lf,
        Self::Sh,
        Self::Source,
        Self::Rem,
        Self::Args,
        Self::Varl,
        Self::Varr,
        Self::Return,
        Self::Exit,
        Self::Export,
        Self::Temp,
        Self::Uid,
        Self::Root,
        Self::CloseFd,
        Self::Md,
        Self::Rm,
        Self::Cd,
        Self::Cat,
        Self::PathVariable,
        Self::JavaHomeVariable,
        Self::LibraryPathVariable,
        Self::BeginScript,
        Self::EndScript,
        Self::BeginFunctions,
        Self::EndFunctions,
    ];

    /// Placeholder name as written between braces.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fs => "fs",
            Self::Ps => "ps",
            Self::Lf => "lf",
            Self::Sh => "sh",
            Self::Source => "source",
            Self::Rem => "rem",
            Self::Args => "args",
            Self::Varl => "varl",
            Self::Varr => "varr",
            Self::Return => "return",
            Self::Exit => "exit",
            Self::Export => "export",
            Self::Temp => "temp",
            Self::Uid => "uid",
            Self::Root => "root",
            Self::CloseFd => "closeFd",
            Self::Md => "md",
            Self::Rm => "rm",
            Self::Cd => "cd",
            Self::Cat => "cat",
            Self::PathVariable => "pathVariable",
            Self::JavaHomeVariable => "javaHomeVariable",
            Self::LibraryPathVariable => "libraryPathVariable",
            Self::BeginScript => "beginScript",
            Self::EndScript => "endScript",
            Self::BeginFunctions => "beginFunctions",
            Self::EndFunctions => "endFunctions",
        }
    }

    /// Resolves a placeholder name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.name() == name)
    }

    /// Literal for the given family.
    #[must_use]
    pub const fn to(self, family: OsFamily) -> &'static str {
        match family {
            OsFamily::Unix => self.unix(),
            OsFamily::Windows => self.windows(),
        }
    }

    const fn unix(self) -> &'static str {
        match self {
            Self::Fs => "/",
            Self::Ps => ":",
            Self::Lf => "\n",
            Self::Sh => "sh",
            Self::Source => ".",
            Self::Rem => "#",
            Self::Args => "$@",
            Self::Varl => "$",
            Self::Varr | Self::BeginFunctions | Self::EndFunctions => "",
            Self::Return => "return",
            Self::Exit => "exit",
            Self::Export => "export",
            Self::Temp => "/tmp",
            Self::Uid => "$USER",
            Self::Root => "/",
            Self::CloseFd => ">&-",
            Self::Md => "mkdir -p",
            Self::Rm => "rm -f",
            Self::Cd => "cd",
            Self::Cat => "cat",
            Self::PathVariable => "PATH",
            Self::JavaHomeVariable => "JAVA_HOME",
            Self::LibraryPathVariable => "LD_LIBRARY_PATH",
            Self::BeginScript => "#!/bin/sh\nset +u\n",
            Self::EndScript => "exit $?\n",
        }
    }

    const fn windows(self) -> &'static str {
        match self {
            Self::Fs => "\\",
            Self::Ps => ";",
            Self::Lf => "\r\n",
            Self::Sh => "cmd",
            Self::Source => "@call",
            Self::Rem => "@rem",
            Self::Args => "%*",
            Self::Varl | Self::Varr => "%",
            Self::Return | Self::Exit => "exit /b",
            Self::Export => "set",
            Self::Temp => "%TEMP%",
            Self::Uid => "%USERNAME%",
            Self::Root => "c:\\",
            Self::CloseFd => ">NUL",
            Self::Md => "md",
            Self::Rm => "del /F /Q",
            Self::Cd => "cd /d",
            Self::Cat => "type",
            Self::PathVariable | Self::LibraryPathVariable => "PATH",
            Self::JavaHomeVariable => "JAVA_HOME",
            Self::BeginScript => "@echo off\r\n",
            Self::EndScript => "exit /b %ERRORLEVEL%\r\n",
            Self::BeginFunctions => "GOTO FUNCTION_END\r\n",
            Self::EndFunctions => ":FUNCTION_END\r\n",
        }
    }
}

/// Resolves an OS variable alias such as `path` or `libraryPath` to the
/// family's real variable name, via the `{aliasVariable}` tokens.
#[must_use]
pub fn resolve_variable_alias(alias: &str, family: OsFamily) -> Option<&'static str> {
    let mut name = String::with_capacity(alias.len() + "Variable".len());
    name.push_str(alias);
    name.push_str("Variable");
    ShellToken::from_name(&name).map(|token| token.to(family))
}
