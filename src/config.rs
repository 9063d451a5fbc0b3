//! Configuration loading via `ortho-config`.
//!
//! Settings merge defaults, `scriptgen.toml`, and `SCRIPTGEN_*` environment
//! variables. They supply defaults for the CLI; flags passed on the command
//! line always win.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::family::OsFamily;

/// Payload size above which a rendered script is reported as oversized.
///
/// Matches the common 16 KiB ceiling on instance user data.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 16_384;

/// Rendering defaults loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SCRIPTGEN",
    discovery(
        app_name = "scriptgen",
        env_var = "SCRIPTGEN_CONFIG_PATH",
        config_file_name = "scriptgen.toml",
        dotfile_name = ".scriptgen.toml",
        project_file_name = "scriptgen.toml"
    )
)]
pub struct ScriptgenConfig {
    /// Family rendered when `--family` is omitted (`unix` or `windows`).
    #[ortho_config(default = "unix".to_owned())]
    pub default_family: String,
    /// Instance home used when `--home` is omitted. Tokens are allowed.
    pub default_instance_home: Option<String>,
    /// Log directory used when `--log-dir` is omitted. Tokens are allowed.
    pub default_log_dir: Option<String>,
    /// Payload size, in bytes, above which a warning is logged.
    #[ortho_config(default = DEFAULT_MAX_PAYLOAD_BYTES)]
    pub max_payload_bytes: u64,
    /// Whether an oversized payload fails the command instead of warning.
    ///
    /// Not a CLI flag: a generated `SetTrue` flag always serializes `false`
    /// over the file and environment layers.
    #[ortho_config(default = false, skip_cli)]
    pub fail_on_oversize: bool,
}

/// Metadata for a configuration field, used to generate actionable error
/// messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or {} in scriptgen.toml",
            self.env_var, self.toml_key
        )
    }
}

impl ScriptgenConfig {
    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("scriptgen")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    fn require_optional(
        value: Option<&str>,
        metadata: &FieldMetadata,
    ) -> Result<(), ConfigError> {
        if value.is_some_and(|present| present.trim().is_empty()) {
            return Err(ConfigError::MissingField(format!(
                "{} must not be blank: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    /// Resolves the configured default family.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFamily`] for an unrecognised name.
    pub fn family(&self) -> Result<OsFamily, ConfigError> {
        self.default_family.parse().map_err(|_| {
            let metadata =
                FieldMetadata::new("family", "SCRIPTGEN_DEFAULT_FAMILY", "default_family");
            ConfigError::InvalidFamily(format!(
                "unknown family `{}` (expected unix or windows): {}",
                self.default_family,
                metadata.hint()
            ))
        })
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and TOML key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the family is unknown, an optional
    /// directory is blank, or the payload limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.family()?;
        Self::require_optional(
            self.default_instance_home.as_deref(),
            &FieldMetadata::new(
                "instance home",
                "SCRIPTGEN_DEFAULT_INSTANCE_HOME",
                "default_instance_home",
            ),
        )?;
        Self::require_optional(
            self.default_log_dir.as_deref(),
            &FieldMetadata::new("log directory", "SCRIPTGEN_DEFAULT_LOG_DIR", "default_log_dir"),
        )?;
        if self.max_payload_bytes == 0 {
            let metadata = FieldMetadata::new(
                "payload limit",
                "SCRIPTGEN_MAX_PAYLOAD_BYTES",
                "max_payload_bytes",
            );
            return Err(ConfigError::MissingField(format!(
                "{} must be greater than zero: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }
}

impl Default for ScriptgenConfig {
    fn default() -> Self {
        Self {
            default_family: OsFamily::Unix.as_str().to_owned(),
            default_instance_home: None,
            default_log_dir: None,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            fail_on_oversize: false,
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configured value is empty or out of range.
    #[error("invalid configuration field: {0}")]
    MissingField(String),
    /// Indicates the default family is not recognised.
    #[error("invalid configuration field: {0}")]
    InvalidFamily(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
