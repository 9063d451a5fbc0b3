//! Command-line interface definitions for the `scriptgen` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, ValueEnum};

/// Top-level CLI for the `scriptgen` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scriptgen",
    about = "Render portable lifecycle scripts for Unix and Windows hosts",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Render an instance control script.
    #[command(name = "render", about = "Render an instance control script")]
    Render(RenderCommand),
    /// List the library functions shipped with scripts.
    #[command(name = "functions", about = "List the library functions shipped with scripts")]
    Functions(FunctionsCommand),
}

/// Target family accepted on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum FamilyArg {
    /// POSIX `sh`.
    Unix,
    /// Windows `cmd.exe`.
    Windows,
}

/// Arguments for the `scriptgen render` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RenderCommand {
    /// Instance name; also names the generated run script.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Instance home directory. Placeholders such as `{temp}` are allowed.
    ///
    /// Defaults to `default_instance_home` from configuration, then to a
    /// directory named after the instance under the system temporary
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub(crate) home: Option<String>,
    /// Directory receiving `stdout.log`, `stderr.log` and `rc`.
    #[arg(long, value_name = "DIR")]
    pub(crate) log_dir: Option<String>,
    /// Target family. Defaults to `default_family` from configuration.
    #[arg(long, value_enum)]
    pub(crate) family: Option<FamilyArg>,
    /// Variable exported to the run script, as KEY=VALUE. Repeatable.
    #[arg(long = "export", value_name = "KEY=VALUE")]
    pub(crate) exports: Vec<String>,
    /// Line executed once by the `init` action. Repeatable.
    #[arg(long = "init", value_name = "LINE")]
    pub(crate) init: Vec<String>,
    /// Line executed by the run script. Repeatable; at least one is required.
    #[arg(long = "run", value_name = "LINE", required = true)]
    pub(crate) run: Vec<String>,
    /// Write the script to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub(crate) output: Option<String>,
    /// Print payload diagnostics as JSON on stderr.
    #[arg(long)]
    pub(crate) diagnostics: bool,
}

/// Arguments for the `scriptgen functions` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct FunctionsCommand {
    /// Print the definitions for this family instead of the names.
    #[arg(long, value_enum)]
    pub(crate) family: Option<FamilyArg>,
}
