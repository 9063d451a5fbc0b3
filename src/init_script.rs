//! Lifecycle control scripts for a named instance.
//!
//! An [`InitScript`] renders a control script dispatching on its first
//! argument. The `init` action writes a standalone run script; the other
//! actions start, inspect and stop the process that script becomes.

use std::hash::{Hash, Hasher};

use crate::builder::{Script, ScriptBuilder, check_scope_name};
use crate::error::{ScriptError, require};
use crate::family::OsFamily;
use crate::statement::{
    CaptureExitStatus, CreateRunScript, Statement, StatementList, Variables, call, dialect,
    find_pid, forget, interpret, kill, new_statement_list,
};
use crate::utils::function_name;

/// Default instance home, under the family's temporary directory.
pub const DEFAULT_INSTANCE_HOME: &str = "{temp}{fs}{varl}INSTANCE_NAME{varr}";
/// Default log directory, the instance home itself.
pub const DEFAULT_LOG_DIR: &str = "{varl}INSTANCE_HOME{varr}";

/// Actions understood by a rendered control script, in dispatch order.
pub const ACTIONS: [&str; 10] = [
    "init",
    "status",
    "stop",
    "start",
    "stdout",
    "stderr",
    "exitstatus",
    "tail",
    "tailerr",
    "run",
];

const DEFAULT_SCOPE: &str = "default";
const DEFAULT_SCOPE_KEYS: [&str; 3] = ["instanceName", "instanceHome", "logDir"];

/// A validated instance description ready to render.
///
/// Two scripts are equal when they manage the same instance name.
#[derive(Clone, Debug)]
pub struct InitScript {
    instance_name: String,
    instance_home: String,
    log_dir: String,
    exports: Variables,
    init: StatementList,
    run: StatementList,
}

impl InitScript {
    /// Validates and stores an instance description.
    ///
    /// `instance_home` and `log_dir` may contain tokens and references to
    /// `INSTANCE_NAME` or `INSTANCE_HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MissingArgument`] when a name or directory is
    /// blank, [`ScriptError::ReservedName`] when the instance name would
    /// render to the same function as `default`, a library function or an
    /// internal label, and [`ScriptError::NoRunStatements`] when `run` is
    /// empty.
    pub fn new(
        instance_name: impl Into<String>,
        instance_home: impl Into<String>,
        log_dir: impl Into<String>,
        exports: Variables,
        init: StatementList,
        run: StatementList,
    ) -> Result<Self, ScriptError> {
        let script = Self {
            instance_name: instance_name.into(),
            instance_home: instance_home.into(),
            log_dir: log_dir.into(),
            exports,
            init,
            run,
        };
        require(&script.instance_name, "instance_name")?;
        check_scope_name(&script.instance_name)?;
        if function_name(&script.instance_name).eq_ignore_ascii_case(DEFAULT_SCOPE) {
            return Err(ScriptError::ReservedName {
                name: script.instance_name,
            });
        }
        require(&script.instance_home, "instance_home")?;
        require(&script.log_dir, "log_dir")?;
        if script.run.is_empty() {
            return Err(ScriptError::NoRunStatements {
                instance_name: script.instance_name,
            });
        }
        Ok(script)
    }

    /// Instance the script manages.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Instance home, unrendered.
    #[must_use]
    pub fn instance_home(&self) -> &str {
        &self.instance_home
    }

    /// Log directory, unrendered.
    #[must_use]
    pub fn log_dir(&self) -> &str {
        &self.log_dir
    }

    /// Variables exported to the run script.
    #[must_use]
    pub const fn exports(&self) -> &Variables {
        &self.exports
    }

    /// Statements run once by `init` before the run script is written.
    #[must_use]
    pub const fn init_statements(&self) -> &StatementList {
        &self.init
    }

    /// Statements executed by the run script.
    #[must_use]
    pub const fn run_statements(&self) -> &StatementList {
        &self.run
    }

    /// Assembles the control script builder.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MissingArgument`] if a scope name is blank,
    /// which validation in [`InitScript::new`] already rules out.
    pub fn script_builder(&self) -> Result<ScriptBuilder, ScriptError> {
        let [name_key, home_key, log_dir_key] = DEFAULT_SCOPE_KEYS;
        let defaults: Variables = [
            (name_key, self.instance_name.as_str()),
            (home_key, self.instance_home.as_str()),
            (log_dir_key, self.log_dir.as_str()),
        ]
        .into_iter()
        .collect();

        let builder = ScriptBuilder::new()
            .add_environment_variable_scope(DEFAULT_SCOPE, defaults)?
            .add_environment_variable_scope(self.instance_name.as_str(), self.exports.clone())?;

        Ok(builder.switch_on("1", self.actions()))
    }

    /// Renders the control script for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Render`] when a statement fails to render, for
    /// example because a run statement calls a function the run script cannot
    /// reach.
    pub fn build(&self, family: OsFamily) -> Result<Script, ScriptError> {
        self.script_builder()?.build(family)
    }

    fn actions(&self) -> Vec<(&'static str, Statement)> {
        let instance_name = "{varl}INSTANCE_NAME{varr}";
        let log_dir = "{varl}LOG_DIR{varr}";
        let run_script_path = "{varl}INSTANCE_HOME{varr}{fs}{varl}INSTANCE_NAME{varr}.{sh}";

        let with_defaults = |statements: Vec<Statement>| {
            new_statement_list(
                std::iter::once(call(DEFAULT_SCOPE, Vec::<String>::new())).chain(statements),
            )
        };

        let exports = self
            .exports
            .keys()
            .map(str::to_owned)
            .chain(DEFAULT_SCOPE_KEYS.iter().map(|key| (*key).to_owned()));
        let run_script = CreateRunScript::new(
            self.instance_name.as_str(),
            exports,
            "{varl}INSTANCE_HOME{varr}",
            Statement::CaptureExitStatus(CaptureExitStatus::new(
                log_dir,
                Statement::List(self.run.clone()),
            )),
        );

        let mut init = vec![call(self.instance_name.as_str(), Vec::<String>::new())];
        init.extend(self.init.iter().cloned());
        init.push(Statement::CreateRunScript(run_script));

        vec![
            ("init", with_defaults(init)),
            (
                "status",
                with_defaults(vec![
                    find_pid(instance_name),
                    interpret(["echo [{varl}FOUND_PID{varr}]"]),
                ]),
            ),
            ("stop", with_defaults(vec![find_pid(instance_name), kill()])),
            (
                "start",
                with_defaults(vec![forget(instance_name, run_script_path, log_dir)]),
            ),
            (
                "stdout",
                with_defaults(vec![interpret([
                    "{cat} {varl}LOG_DIR{varr}{fs}stdout.log",
                ])]),
            ),
            (
                "stderr",
                with_defaults(vec![interpret([
                    "{cat} {varl}LOG_DIR{varr}{fs}stderr.log",
                ])]),
            ),
            (
                "exitstatus",
                with_defaults(vec![dialect(
                    interpret(["[ -f \"$LOG_DIR/rc\" ] && cat \"$LOG_DIR/rc\""]),
                    interpret(["if exist \"%LOG_DIR%\\rc\" type \"%LOG_DIR%\\rc\""]),
                )]),
            ),
            ("tail", with_defaults(vec![tail_log("stdout.log")])),
            ("tailerr", with_defaults(vec![tail_log("stderr.log")])),
            (
                "run",
                with_defaults(vec![dialect(
                    interpret([format!("\"{run_script_path}\"")]),
                    interpret([format!("call \"{run_script_path}\"")]),
                )]),
            ),
        ]
    }
}

fn tail_log(file: &str) -> Statement {
    dialect(
        interpret([format!("tail \"$LOG_DIR/{file}\"")]),
        interpret([format!(
            "powershell -NoProfile -Command \"Get-Content -Tail 10 '%LOG_DIR%\\{file}'\""
        )]),
    )
}

impl PartialEq for InitScript {
    fn eq(&self, other: &Self) -> bool {
        self.instance_name == other.instance_name
    }
}

impl Eq for InitScript {}

impl Hash for InitScript {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instance_name.hash(state);
    }
}

/// Fluent construction of an [`InitScript`] with defaults for the instance
/// home and log directory.
///
/// ```
/// use scriptgen::{InitBuilder, OsFamily, statement::interpret};
///
/// let script = InitBuilder::new("foo")
///     .run_statement(interpret(["echo hello"]))
///     .build()?
///     .build(OsFamily::Unix)?;
/// assert!(script.as_str().contains("export INSTANCE_NAME=\"foo\""));
/// # Ok::<(), scriptgen::ScriptError>(())
/// ```
#[derive(Clone, Debug)]
pub struct InitBuilder {
    instance_name: String,
    instance_home: String,
    log_dir: String,
    exports: Variables,
    init: StatementList,
    run: StatementList,
}

impl InitBuilder {
    /// Starts a builder for `instance_name`.
    #[must_use]
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            instance_home: DEFAULT_INSTANCE_HOME.to_owned(),
            log_dir: DEFAULT_LOG_DIR.to_owned(),
            exports: Variables::new(),
            init: StatementList::new(),
            run: StatementList::new(),
        }
    }

    /// Overrides the instance home.
    #[must_use]
    pub fn instance_home(mut self, instance_home: impl Into<String>) -> Self {
        self.instance_home = instance_home.into();
        self
    }

    /// Overrides the log directory.
    #[must_use]
    pub fn log_dir(mut self, log_dir: impl Into<String>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Exports `key` to the run script.
    #[must_use]
    pub fn export_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exports.insert(key, value);
        self
    }

    /// Exports every variable in `variables`, later keys replacing earlier
    /// ones.
    #[must_use]
    pub fn export_variables(mut self, variables: &Variables) -> Self {
        for (key, value) in variables.iter() {
            self.exports.insert(key, value);
        }
        self
    }

    /// Adds a statement executed once by `init`.
    #[must_use]
    pub fn init_statement(mut self, statement: Statement) -> Self {
        self.init.push(statement);
        self
    }

    /// Adds a statement executed by the run script.
    #[must_use]
    pub fn run_statement(mut self, statement: Statement) -> Self {
        self.run.push(statement);
        self
    }

    /// Validates the collected description.
    ///
    /// # Errors
    ///
    /// See [`InitScript::new`].
    pub fn build(self) -> Result<InitScript, ScriptError> {
        InitScript::new(
            self.instance_name,
            self.instance_home,
            self.log_dir,
            self.exports,
            self.init,
            self.run,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::collections::HashSet;

    #[fixture]
    fn foo() -> InitScript {
        InitBuilder::new("foo")
            .run_statement(interpret(["echo hello"]))
            .build()
            .expect("foo is valid")
    }

    #[rstest]
    fn unix_control_script_covers_lifecycle(foo: InitScript) {
        let script = foo.build(OsFamily::Unix).expect("renders");
        let text = script.as_str();
        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(text.contains("export INSTANCE_NAME=\"foo\"\n"), "{text}");
        assert!(text.contains("export INSTANCE_HOME=\"/tmp/$INSTANCE_NAME\"\n"));
        assert!(text.contains("export LOG_DIR=\"$INSTANCE_HOME\"\n"));
        for action in ACTIONS {
            assert!(text.contains(&format!("\n{action})\n")), "missing {action}");
        }
        assert!(text.contains("cat > \"$INSTANCE_HOME/foo.sh\""));
        assert!(text.contains("trap 'echo $?>\"$LOG_DIR/rc\"' 0"));
        assert!(text.contains("echo hello\n"));
        assert!(text.contains("forget \"$INSTANCE_NAME\" \"$INSTANCE_HOME/$INSTANCE_NAME.sh\""));
        assert!(text.contains("kill $FOUND_PID"));
    }

    #[rstest]
    fn windows_control_script_covers_lifecycle(foo: InitScript) {
        let script = foo.build(OsFamily::Windows).expect("renders");
        let text = script.as_str();
        assert!(text.starts_with("@echo off\r\n"));
        assert!(text.contains("set INSTANCE_NAME=foo\r\n"));
        assert!(text.contains("set INSTANCE_HOME=%TEMP%\\%INSTANCE_NAME%\r\n"));
        for (index, action) in ACTIONS.iter().enumerate() {
            assert!(
                text.contains(&format!("if \"%1\" == \"{action}\" goto CASE_{index}\r\n")),
                "missing {action}"
            );
        }
        assert!(text.contains("%INSTANCE_HOME%\\foo.cmd"));
        assert!(text.contains("call :forget"));
        assert!(text.contains("echo(echo hello\r\n"));
        let bare = text.replace("\r\n", "");
        assert!(!bare.contains('\n'));
    }

    #[rstest]
    fn run_script_exports_defaults_and_extras() {
        let script = InitBuilder::new("foo")
            .export_variable("javaHome", "/opt/java")
            .run_statement(interpret(["echo hello"]))
            .build()
            .expect("valid")
            .build(OsFamily::Unix)
            .expect("renders");
        let text = script.as_str();
        assert!(text.contains("export JAVA_HOME=\"/opt/java\"\n"));
        for name in ["JAVA_HOME", "INSTANCE_HOME", "LOG_DIR"] {
            assert!(
                text.contains(&format!("printf \"export {name}='%s'\\n\"")),
                "{name}"
            );
        }
        assert!(!text.contains("export INSTANCE_NAME='%s'"));
    }

    #[rstest]
    #[case(OsFamily::Unix)]
    #[case(OsFamily::Windows)]
    fn no_run_statements_is_rejected(#[case] family: OsFamily) {
        let err = InitBuilder::new("foo")
            .init_statement(interpret(["echo setup"]))
            .build()
            .and_then(|script| script.build(family))
            .expect_err("run list is empty");
        assert_eq!(
            err,
            ScriptError::NoRunStatements {
                instance_name: String::from("foo")
            }
        );
    }

    #[rstest]
    #[case("", "/srv", "/var/log", "instance_name")]
    #[case("foo", " ", "/var/log", "instance_home")]
    #[case("foo", "/srv", "", "log_dir")]
    fn blank_fields_are_rejected(
        #[case] name: &str,
        #[case] home: &str,
        #[case] log_dir: &str,
        #[case] field: &str,
    ) {
        let err = InitScript::new(
            name,
            home,
            log_dir,
            Variables::new(),
            StatementList::new(),
            [interpret(["true"])].into_iter().collect(),
        )
        .expect_err("blank field");
        assert!(matches!(err, ScriptError::MissingArgument { field: f } if f == field));
    }

    #[rstest]
    #[case("default")]
    #[case("Default")]
    #[case("forget")]
    #[case("findPid")]
    #[case("ABORT")]
    #[case("end_switch")]
    fn instance_names_clashing_with_functions_are_rejected(#[case] name: &str) {
        let err = InitBuilder::new(name)
            .run_statement(interpret(["true"]))
            .build()
            .expect_err("name clashes");
        assert_eq!(
            err,
            ScriptError::ReservedName {
                name: name.to_owned()
            }
        );
    }

    #[rstest]
    fn equality_uses_instance_name_only(foo: InitScript) {
        let other = InitBuilder::new("foo")
            .instance_home("/srv/foo")
            .run_statement(interpret(["echo other"]))
            .build()
            .expect("valid");
        assert_eq!(foo, other);
        let scripts: HashSet<InitScript> = [foo, other].into_iter().collect();
        assert_eq!(scripts.len(), 1);
    }

    #[test]
    fn init_statements_precede_run_script() {
        let script = InitBuilder::new("foo")
            .init_statement(interpret(["echo preparing"]))
            .run_statement(interpret(["echo hello"]))
            .build()
            .expect("valid")
            .build(OsFamily::Unix)
            .expect("renders");
        let text = script.as_str();
        let init = text.find("echo preparing").expect("init statement");
        let written = text.find("cat > \"$INSTANCE_HOME/foo.sh\"").expect("run script");
        assert!(init < written);
    }
}
