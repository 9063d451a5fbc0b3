//! Statement model: the unit of script composition.
//!
//! A [`Statement`] renders to text for one [`OsFamily`] and reports the shell
//! functions it needs. The set of statement kinds is closed, so rendering and
//! dependency collection are exhaustive matches rather than runtime dispatch.

mod env;
mod process;
mod run_script;
mod switch;

use std::collections::BTreeSet;

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::functions::LibraryFunction;
use crate::token::ShellToken;
use crate::utils::{function_name, replace_tokens, replace_whole_word};

pub use env::{EnvironmentScope, Variables};
pub use run_script::{CaptureExitStatus, CreateRunScript};
pub use switch::Switch;

/// Names of shell functions a statement calls.
pub type FunctionDependencies = BTreeSet<String>;

/// A renderable piece of a script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    /// Portable lines written with `{token}` placeholders; each line is
    /// terminated with the family's line feed.
    Interpret(Vec<String>),
    /// Ordered sequence of statements.
    List(StatementList),
    /// Renders the delegate with every `return` rewritten to `exit`.
    ExitInsteadOfReturn(Box<Statement>),
    /// Function exporting a named set of variables.
    EnvironmentScope(EnvironmentScope),
    /// Invocation of a shell function.
    Call {
        /// Function to invoke.
        function: String,
        /// Arguments, which may contain placeholders.
        args: Vec<String>,
    },
    /// Dispatch table keyed on one variable.
    Switch(Switch),
    /// Resolves a running process into `FOUND_PID`.
    FindPid {
        /// Pattern identifying the process.
        pattern: String,
    },
    /// Terminates the process held in `FOUND_PID`.
    Kill,
    /// Detaches a script so it outlives the invoking shell.
    Forget {
        /// Name the process is found by.
        instance_name: String,
        /// Script to run in the background.
        script: String,
        /// Directory receiving `stdout.log` and `stderr.log`.
        log_dir: String,
    },
    /// Writes a standalone run script to disk.
    CreateRunScript(CreateRunScript),
    /// Records the exit status of the wrapped statements in an `rc` file.
    CaptureExitStatus(CaptureExitStatus),
    /// Separate statements for each family.
    Dialect {
        /// Statement rendered for Unix.
        unix: Box<Statement>,
        /// Statement rendered for Windows.
        windows: Box<Statement>,
    },
}

impl Statement {
    /// Renders the statement for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when text references an unknown token or a
    /// nested run script needs a function that is not available.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        match self {
            Self::Interpret(lines) => {
                let mut rendered = String::new();
                for line in lines {
                    rendered.push_str(&replace_tokens(line, family)?);
                    rendered.push_str(ShellToken::Lf.to(family));
                }
                Ok(rendered)
            }
            Self::List(list) => list.render(family),
            Self::ExitInsteadOfReturn(delegate) => {
                let rendered = delegate.render(family)?;
                Ok(replace_whole_word(
                    &rendered,
                    ShellToken::Return.to(family),
                    ShellToken::Exit.to(family),
                ))
            }
            Self::EnvironmentScope(scope) => scope.render(family),
            Self::Call { function, args } => render_call(function, args, family),
            Self::Switch(switch) => switch.render(family),
            Self::FindPid { pattern } => process::render_find_pid(pattern, family),
            Self::Kill => Ok(process::render_kill(family)),
            Self::Forget {
                instance_name,
                script,
                log_dir,
            } => process::render_forget(instance_name, script, log_dir, family),
            Self::CreateRunScript(run_script) => run_script.render(family),
            Self::CaptureExitStatus(capture) => capture.render(family),
            Self::Dialect { unix, windows } => match family {
                OsFamily::Unix => unix.render(family),
                OsFamily::Windows => windows.render(family),
            },
        }
    }

    /// Shell functions this statement calls when rendered for `family`.
    #[must_use]
    pub fn function_dependencies(&self, family: OsFamily) -> FunctionDependencies {
        match self {
            // A run script embeds what it needs; the parent script does not.
            Self::Interpret(_)
            | Self::EnvironmentScope(_)
            | Self::Kill
            | Self::CreateRunScript(_) => BTreeSet::new(),
            Self::List(list) => list.function_dependencies(family),
            Self::ExitInsteadOfReturn(delegate) => delegate.function_dependencies(family),
            Self::Call { function, .. } => BTreeSet::from([function_name(function)]),
            Self::Switch(switch) => switch.function_dependencies(family),
            Self::FindPid { .. } => BTreeSet::from([LibraryFunction::FindPid.name().to_owned()]),
            Self::Forget { .. } => BTreeSet::from([LibraryFunction::Forget.name().to_owned()]),
            Self::CaptureExitStatus(capture) => capture.function_dependencies(family),
            Self::Dialect { unix, windows } => match family {
                OsFamily::Unix => unix.function_dependencies(family),
                OsFamily::Windows => windows.function_dependencies(family),
            },
        }
    }
}

fn render_call(function: &str, args: &[String], family: OsFamily) -> Result<String, RenderError> {
    let name = function_name(function);
    let mut rendered = match family {
        OsFamily::Unix => name,
        OsFamily::Windows => format!("call :{name}"),
    };
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&replace_tokens(arg, family)?);
    }
    rendered.push_str(ShellToken::Lf.to(family));
    Ok(rendered)
}

/// An ordered list of statements rendered back to back.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StatementList(Vec<Statement>);

impl StatementList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a statement.
    pub fn push(&mut self, statement: Statement) {
        self.0.push(statement);
    }

    /// Number of direct children.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the list has no children.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over direct children.
    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.0.iter()
    }

    /// Concatenates the children's renders in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RenderError`] raised by a child.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        let mut rendered = String::new();
        for statement in &self.0 {
            rendered.push_str(&statement.render(family)?);
        }
        Ok(rendered)
    }

    /// Union of the children's dependencies.
    #[must_use]
    pub fn function_dependencies(&self, family: OsFamily) -> FunctionDependencies {
        self.0
            .iter()
            .flat_map(|statement| statement.function_dependencies(family))
            .collect()
    }
}

impl From<Vec<Statement>> for StatementList {
    fn from(statements: Vec<Statement>) -> Self {
        Self(statements)
    }
}

impl FromIterator<Statement> for StatementList {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a StatementList {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<StatementList> for Statement {
    fn from(list: StatementList) -> Self {
        Self::List(list)
    }
}

/// Lines of portable text, one per entry.
#[must_use]
pub fn interpret<I, S>(lines: I) -> Statement
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Statement::Interpret(lines.into_iter().map(Into::into).collect())
}

/// Calls `function` with the given arguments.
#[must_use]
pub fn call<I, S>(function: impl Into<String>, args: I) -> Statement
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Statement::Call {
        function: function.into(),
        args: args.into_iter().map(Into::into).collect(),
    }
}

/// Wraps statements in a [`StatementList`].
#[must_use]
pub fn new_statement_list<I>(statements: I) -> Statement
where
    I: IntoIterator<Item = Statement>,
{
    Statement::List(statements.into_iter().collect())
}

/// Rewrites `return` to `exit` in the rendered delegate.
#[must_use]
pub fn exit_instead_of_return(delegate: Statement) -> Statement {
    Statement::ExitInsteadOfReturn(Box::new(delegate))
}

/// Resolves the process matching `pattern` into `FOUND_PID`.
#[must_use]
pub fn find_pid(pattern: impl Into<String>) -> Statement {
    Statement::FindPid {
        pattern: pattern.into(),
    }
}

/// Terminates the process previously resolved by [`find_pid`].
#[must_use]
pub const fn kill() -> Statement {
    Statement::Kill
}

/// Detaches `script` in the background, logging into `log_dir`.
#[must_use]
pub fn forget(
    instance_name: impl Into<String>,
    script: impl Into<String>,
    log_dir: impl Into<String>,
) -> Statement {
    Statement::Forget {
        instance_name: instance_name.into(),
        script: script.into(),
        log_dir: log_dir.into(),
    }
}

/// Picks a statement per family.
#[must_use]
pub fn dialect(unix: Statement, windows: Statement) -> Statement {
    Statement::Dialect {
        unix: Box::new(unix),
        windows: Box::new(windows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::count_whole_word;
    use rstest::rstest;

    #[rstest]
    #[case(OsFamily::Unix, "echo $HOME/bin\n")]
    #[case(OsFamily::Windows, "echo %HOME%\\bin\r\n")]
    fn interpret_substitutes_tokens(#[case] family: OsFamily, #[case] expected: &str) {
        let statement = interpret(["echo {varl}HOME{varr}{fs}bin"]);
        assert_eq!(statement.render(family).as_deref(), Ok(expected));
    }

    #[test]
    fn list_concatenates_in_order() {
        let list = new_statement_list([interpret(["one"]), interpret(["two"])]);
        assert_eq!(list.render(OsFamily::Unix).as_deref(), Ok("one\ntwo\n"));
    }

    #[test]
    fn list_unions_dependencies() {
        let list = new_statement_list([
            find_pid("foo"),
            call("default", Vec::<String>::new()),
            find_pid("bar"),
        ]);
        let deps = list.function_dependencies(OsFamily::Unix);
        assert_eq!(
            deps.into_iter().collect::<Vec<_>>(),
            vec![String::from("default"), String::from("findPid")]
        );
    }

    #[rstest]
    #[case(OsFamily::Unix)]
    #[case(OsFamily::Windows)]
    fn exit_instead_of_return_rewrites_every_return(#[case] family: OsFamily) {
        let delegate = interpret([
            "{return} 1",
            "echo returned",
            "[ -f x ] || {return}",
        ]);
        let original = delegate.render(family).expect("renders");
        let return_literal = ShellToken::Return.to(family);
        let exit_literal = ShellToken::Exit.to(family);
        let occurrences = count_whole_word(&original, return_literal);
        assert_eq!(occurrences, 2);

        let rewritten = exit_instead_of_return(delegate)
            .render(family)
            .expect("renders");
        assert!(rewritten.contains("echo returned"));
        if return_literal != exit_literal {
            assert_eq!(count_whole_word(&rewritten, return_literal), 0);
            assert_eq!(
                count_whole_word(&rewritten, exit_literal),
                count_whole_word(&original, exit_literal) + occurrences
            );
        } else {
            assert_eq!(rewritten, original);
        }
    }

    #[rstest]
    #[case(OsFamily::Unix, "default $INSTANCE_NAME\n")]
    #[case(OsFamily::Windows, "call :default %INSTANCE_NAME%\r\n")]
    fn call_renders_per_family(#[case] family: OsFamily, #[case] expected: &str) {
        let statement = call("default", ["{varl}INSTANCE_NAME{varr}"]);
        assert_eq!(statement.render(family).as_deref(), Ok(expected));
    }

    #[test]
    fn dialect_picks_family_and_dependencies() {
        let statement = dialect(find_pid("foo"), interpret(["echo windows"]));
        assert_eq!(
            statement.render(OsFamily::Windows).as_deref(),
            Ok("echo windows\r\n")
        );
        assert!(statement.function_dependencies(OsFamily::Windows).is_empty());
        assert!(
            statement
                .function_dependencies(OsFamily::Unix)
                .contains("findPid")
        );
    }

    #[test]
    fn unresolved_token_fails_render() {
        let err = interpret(["echo {bogus}"])
            .render(OsFamily::Windows)
            .expect_err("bogus is not a token");
        assert!(err.to_string().contains("bogus"), "message: {err}");
    }
}
