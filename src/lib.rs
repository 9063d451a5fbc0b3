//! Retargetable shell script generation.
//!
//! Scripts are composed from [`statement::Statement`] trees written once with
//! portable `{token}` placeholders and rendered for either a POSIX shell or
//! the Windows command shell. [`ScriptBuilder`] assembles complete scripts
//! with only the helper functions they call; [`InitBuilder`] produces
//! lifecycle control scripts (`init`, `start`, `status`, `stop`, ...) for a
//! named instance.

pub mod builder;
pub mod config;
pub mod error;
pub mod family;
pub mod functions;
pub mod init_script;
pub mod statement;
pub mod token;
pub mod utils;

pub use builder::{Script, ScriptBuilder, ScriptDiagnostics};
pub use config::{ConfigError, ScriptgenConfig};
pub use error::{RenderError, ScriptError};
pub use family::{OsFamily, UnknownFamily};
pub use functions::LibraryFunction;
pub use init_script::{InitBuilder, InitScript};
pub use statement::{Statement, StatementList, Variables};
pub use token::ShellToken;
