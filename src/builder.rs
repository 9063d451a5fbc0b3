//! Assembly of complete scripts.
//!
//! A [`ScriptBuilder`] collects variable scopes, variables to clear, free
//! statements and a dispatch table, then renders them in a fixed order:
//!
//! 1. script header
//! 2. unset section
//! 3. function definitions (`abort`, scopes, required library functions)
//! 4. zero-`PATH` statement
//! 5. free statements
//! 6. dispatch table
//! 7. script footer

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{ScriptError, require};
use crate::family::OsFamily;
use crate::functions::{LibraryFunction, resolve_library_functions};
use crate::statement::{EnvironmentScope, Statement, StatementList, Switch, Variables};
use crate::token::ShellToken;
use crate::utils::{function_name, is_reserved_label, write_unset_variables, write_zero_path};

/// Variables cleared at the start of every script unless removed.
pub const DEFAULT_UNSET_VARIABLES: [&str; 3] = ["path", "javaHome", "libraryPath"];

/// Builder for a self-contained script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScriptBuilder {
    scopes: Vec<EnvironmentScope>,
    variables_to_unset: Vec<String>,
    statements: StatementList,
    switch: Option<Switch>,
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptBuilder {
    /// Creates a builder that clears [`DEFAULT_UNSET_VARIABLES`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            variables_to_unset: DEFAULT_UNSET_VARIABLES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            statements: StatementList::new(),
            switch: None,
        }
    }

    /// Registers a function named `name` that exports `variables`.
    ///
    /// Registering an existing name replaces that scope in place. Names are
    /// compared as rendered labels, ignoring case, because Windows labels
    /// are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MissingArgument`] when `name` is blank,
    /// [`ScriptError::ReservedName`] when it would shadow a library function
    /// or internal label, and [`ScriptError::NameConflict`] when it renders
    /// to the same label as a different registered scope.
    pub fn add_environment_variable_scope(
        mut self,
        name: impl Into<String>,
        variables: Variables,
    ) -> Result<Self, ScriptError> {
        let scope = EnvironmentScope::new(name.into(), variables);
        require(scope.name(), "scope_name")?;
        check_scope_name(scope.name())?;
        let label = function_name(scope.name());
        if let Some(slot) = self
            .scopes
            .iter_mut()
            .find(|existing| function_name(existing.name()).eq_ignore_ascii_case(&label))
        {
            if slot.name() != scope.name() {
                return Err(ScriptError::NameConflict {
                    name: scope.name().to_owned(),
                    existing: slot.name().to_owned(),
                });
            }
            *slot = scope;
            return Ok(self);
        }
        self.scopes.push(scope);
        Ok(self)
    }

    /// Clears `name` before anything else runs. Aliases such as `path` are
    /// resolved to the family's variable name.
    #[must_use]
    pub fn unset_environment_variable(mut self, name: impl Into<String>) -> Self {
        self.variables_to_unset.push(name.into());
        self
    }

    /// Appends a statement rendered ahead of the dispatch table.
    #[must_use]
    pub fn add_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Dispatches on `variable` over `cases`, replacing any earlier table.
    #[must_use]
    pub fn switch_on<I, K>(mut self, variable: impl Into<String>, cases: I) -> Self
    where
        I: IntoIterator<Item = (K, Statement)>,
        K: Into<String>,
    {
        let switch = cases
            .into_iter()
            .fold(Switch::new(variable), |switch, (value, statement)| {
                switch.case(value, statement)
            });
        self.switch = Some(switch);
        self
    }

    /// Registered scopes in insertion order.
    #[must_use]
    pub fn scopes(&self) -> &[EnvironmentScope] {
        &self.scopes
    }

    /// Dispatch table, if one was registered.
    #[must_use]
    pub const fn switch(&self) -> Option<&Switch> {
        self.switch.as_ref()
    }

    /// Renders the script for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Render`] when a statement references an unknown
    /// token or calls a function that is neither a scope nor a library
    /// function.
    pub fn build(&self, family: OsFamily) -> Result<Script, ScriptError> {
        let defined: Vec<String> = self
            .scopes
            .iter()
            .map(|scope| function_name(scope.name()))
            .collect();

        let mut required = self.statements.function_dependencies(family);
        if let Some(switch) = &self.switch {
            required.extend(switch.function_dependencies(family));
        }
        required.insert(LibraryFunction::Abort.name().to_owned());
        let library =
            resolve_library_functions(required.iter().map(String::as_str), &defined, family)?;

        let mut text = String::from(ShellToken::BeginScript.to(family));
        text.push_str(&write_unset_variables(&self.variables_to_unset, family));

        let mut functions = Vec::with_capacity(library.len() + self.scopes.len());
        text.push_str(ShellToken::BeginFunctions.to(family));
        text.push_str(LibraryFunction::Abort.definition(family));
        functions.push(LibraryFunction::Abort.name().to_owned());
        for scope in &self.scopes {
            text.push_str(&scope.render(family)?);
            functions.push(function_name(scope.name()));
        }
        for function in library
            .iter()
            .filter(|function| **function != LibraryFunction::Abort)
        {
            text.push_str(function.definition(family));
            functions.push(function.name().to_owned());
        }
        text.push_str(ShellToken::EndFunctions.to(family));

        text.push_str(&write_zero_path(family));
        text.push_str(&self.statements.render(family)?);
        if let Some(switch) = &self.switch {
            text.push_str(&switch.render(family)?);
        }
        text.push_str(ShellToken::EndScript.to(family));

        debug!(
            family = %family,
            bytes = text.len(),
            functions = ?functions,
            "rendered script"
        );

        Ok(Script {
            family,
            text,
            functions,
        })
    }
}

/// Rejects scope names that would render to a library function or to a
/// label the Windows renderer emits.
pub(crate) fn check_scope_name(name: &str) -> Result<(), ScriptError> {
    let label = function_name(name);
    let shadows_library = LibraryFunction::ALL
        .iter()
        .any(|function| function.name().eq_ignore_ascii_case(&label));
    if shadows_library || is_reserved_label(name) {
        return Err(ScriptError::ReservedName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// A rendered script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Script {
    family: OsFamily,
    text: String,
    functions: Vec<String>,
}

impl Script {
    /// Family the script was rendered for.
    #[must_use]
    pub const fn family(&self) -> OsFamily {
        self.family
    }

    /// Script text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the script, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    /// Functions defined by the script, in definition order.
    #[must_use]
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns `true` when the script has no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns `true` when the payload is larger than `limit` bytes.
    #[must_use]
    pub fn exceeds(&self, limit: u64) -> bool {
        u64::try_from(self.text.len()).map_or(true, |bytes| bytes > limit)
    }

    /// Size and content summary.
    #[must_use]
    pub fn diagnostics(&self) -> ScriptDiagnostics {
        ScriptDiagnostics {
            family: self.family,
            bytes: self.text.len(),
            lines: self.text.lines().count(),
            functions: self.functions.clone(),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Payload size diagnostics for a rendered script.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ScriptDiagnostics {
    /// Target family.
    pub family: OsFamily,
    /// Payload size in bytes.
    pub bytes: usize,
    /// Number of lines.
    pub lines: usize,
    /// Functions defined by the script.
    pub functions: Vec<String>,
}
