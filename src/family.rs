//! Target shell families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shell family a script is rendered for.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// POSIX `sh` compatible shells.
    Unix,
    /// The Windows command shell (`cmd.exe`).
    Windows,
}

impl OsFamily {
    /// Both families, in a stable order.
    pub const ALL: [Self; 2] = [Self::Unix, Self::Windows];

    /// Lowercase name used in configuration and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a family name is not recognised.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown OS family `{0}`: expected `unix` or `windows`")]
pub struct UnknownFamily(pub String);

impl FromStr for OsFamily {
    type Err = UnknownFamily;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unix" => Ok(Self::Unix),
            "windows" => Ok(Self::Windows),
            _ => Err(UnknownFamily(value.to_owned())),
        }
    }
}
