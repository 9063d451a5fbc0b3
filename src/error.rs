//! Error types for statement rendering and script construction.

use thiserror::Error;

use crate::family::OsFamily;

/// Errors raised while rendering a statement tree to text.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RenderError {
    /// Raised when text references a placeholder with no literal.
    #[error("unresolved token `{{{token}}}` while rendering for {family}")]
    UnresolvedToken {
        /// Placeholder name without braces.
        token: String,
        /// Family being rendered.
        family: OsFamily,
    },
    /// Raised when a statement calls a function nothing defines.
    #[error("function `{name}` is not defined for {family} scripts")]
    UnknownFunction {
        /// Name of the called function.
        name: String,
        /// Family being rendered.
        family: OsFamily,
    },
}

/// Errors raised while assembling a script.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptError {
    /// Raised when a required argument is empty.
    #[error("missing required argument: {field}")]
    MissingArgument {
        /// Name of the offending argument.
        field: &'static str,
    },
    /// Raised when an init script has nothing to run.
    #[error("at least one run statement required for instance `{instance_name}`")]
    NoRunStatements {
        /// Instance the script was built for.
        instance_name: String,
    },
    /// Raised when a scope name would shadow a library function, the default
    /// scope of a control script, or a label the renderer emits.
    #[error("scope name `{name}` is reserved")]
    ReservedName {
        /// Offending scope name.
        name: String,
    },
    /// Raised when two scope names render to the same function or label.
    #[error("scope name `{name}` clashes with scope `{existing}`")]
    NameConflict {
        /// Name being registered.
        name: String,
        /// Name already registered.
        existing: String,
    },
    /// Raised when rendering the assembled statements fails.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Returns [`ScriptError::MissingArgument`] when `value` is blank.
pub(crate) fn require(value: &str, field: &'static str) -> Result<(), ScriptError> {
    if value.trim().is_empty() {
        return Err(ScriptError::MissingArgument { field });
    }
    Ok(())
}
