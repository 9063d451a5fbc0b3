//! Standalone run scripts and exit-status capture.
//!
//! [`CreateRunScript`] renders the commands that write a second script file
//! next to the control script. The file carries its own exports and any
//! library functions its body calls, so it runs without the control script.

use shell_escape::unix::escape;

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::functions::{resolve_library_functions, write_library_functions};
use crate::token::ShellToken;
use crate::utils::{
    CAPTURED_BODY_LABEL, escape_batch_echo, replace_tokens, to_upper_snake, write_zero_path,
};

use super::{FunctionDependencies, Statement};

const MARKER: &str = "END_OF_RUN_SCRIPT";
const INSTANCE_NAME: &str = "INSTANCE_NAME";
/// Shell variable holding a quoted export value while the run script is written.
const EXPORT_VALUE: &str = "SCRIPTGEN_VALUE";

/// Writes `<working_directory>/<instance_name>.<sh>` containing the body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateRunScript {
    instance_name: String,
    exports: Vec<String>,
    working_directory: String,
    body: Box<Statement>,
}

impl CreateRunScript {
    /// Describes a run script.
    ///
    /// `exports` name variables whose values are copied from the invoking
    /// shell into the run script when it is written; lowerCamelCase names are
    /// converted to shell style. `working_directory` may contain tokens.
    #[must_use]
    pub fn new<I, S>(
        instance_name: impl Into<String>,
        exports: I,
        working_directory: impl Into<String>,
        body: Statement,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instance_name: instance_name.into(),
            exports: exports.into_iter().map(Into::into).collect(),
            working_directory: working_directory.into(),
            body: Box::new(body),
        }
    }

    /// Path of the generated file for `family`, with tokens resolved.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the working directory references an
    /// unknown token.
    pub fn script_path(&self, family: OsFamily) -> Result<String, RenderError> {
        Ok(format!(
            "{}{}{}.{}",
            replace_tokens(&self.working_directory, family)?,
            ShellToken::Fs.to(family),
            self.instance_name,
            ShellToken::Sh.to(family)
        ))
    }

    fn export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.exports.len());
        for export in &self.exports {
            let name = to_upper_snake(export);
            if name != INSTANCE_NAME && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Renders the commands that write the run script.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownFunction`] when the body calls a function
    /// that is not a library function, since the run script cannot reach
    /// functions defined only in the control script.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        let dependencies = self.body.function_dependencies(family);
        let library =
            resolve_library_functions(dependencies.iter().map(String::as_str), &[], family)?;
        let functions = write_library_functions(&library, family);

        let body = Statement::ExitInsteadOfReturn(self.body.clone()).render(family)?;
        let directory = replace_tokens(&self.working_directory, family)?;
        let path = self.script_path(family)?;

        Ok(match family {
            OsFamily::Unix => self.render_unix(&directory, &path, &functions, &body),
            OsFamily::Windows => self.render_windows(&directory, &path, &functions, &body),
        })
    }

    fn render_unix(&self, directory: &str, path: &str, functions: &str, body: &str) -> String {
        let mut rendered = format!("mkdir -p \"{directory}\"\n");

        rendered.push_str(&format!("cat > \"{path}\" <<'{MARKER}'\n"));
        rendered.push_str(ShellToken::BeginScript.to(OsFamily::Unix));
        rendered.push_str(&write_zero_path(OsFamily::Unix));
        rendered.push_str(&format!(
            "export {INSTANCE_NAME}={}\n",
            escape(self.instance_name.as_str().into())
        ));
        rendered.push_str(&format!("{MARKER}\n"));

        // Values are single quoted at write time, embedded quotes as '\''.
        for name in self.export_names() {
            rendered.push_str(&format!(
                r#"{EXPORT_VALUE}=$(printf '%s' "${name}" | sed "s/'/'\\\\''/g")"#
            ));
            rendered.push('\n');
            rendered.push_str(&format!(
                r#"printf "export {name}='%s'\n" "${EXPORT_VALUE}" >> "{path}""#
            ));
            rendered.push('\n');
        }

        rendered.push_str(&format!("cat >> \"{path}\" <<'{MARKER}'\n"));
        rendered.push_str(functions);
        rendered.push_str(&format!("cd \"{directory}\"\n"));
        rendered.push_str(body);
        if !body.is_empty() && !body.ends_with('\n') {
            rendered.push('\n');
        }
        rendered.push_str(&format!("{MARKER}\n"));
        rendered.push_str(&format!("chmod u+x \"{path}\"\n"));
        rendered
    }

    fn render_windows(&self, directory: &str, path: &str, functions: &str, body: &str) -> String {
        let append = |line: &str| format!(">>\"{path}\" echo({}\r\n", escape_batch_echo(line));

        let mut rendered = format!("if not exist \"{directory}\" md \"{directory}\"\r\n");
        rendered.push_str(&format!("del /F /Q \"{path}\" 2>NUL\r\n"));

        let header = format!(
            "{}{}",
            ShellToken::BeginScript.to(OsFamily::Windows),
            write_zero_path(OsFamily::Windows)
        );
        for line in header.lines() {
            rendered.push_str(&append(line));
        }
        rendered.push_str(&append(&format!("set {INSTANCE_NAME}={}", self.instance_name)));

        // Delayed expansion substitutes values after the line is parsed, so
        // metacharacters in them are written literally.
        let exports = self.export_names();
        if !exports.is_empty() {
            rendered.push_str("setlocal EnableDelayedExpansion\r\n");
            for name in exports {
                rendered.push_str(&format!(">>\"{path}\" echo(set \"{name}=!{name}!\"\r\n"));
            }
            rendered.push_str("endlocal\r\n");
        }

        rendered.push_str(&append(&format!("cd /d \"{directory}\"")));
        for line in body.lines() {
            rendered.push_str(&append(line));
        }
        for line in ShellToken::EndScript.to(OsFamily::Windows).lines() {
            rendered.push_str(&append(line));
        }
        for line in functions.lines() {
            rendered.push_str(&append(line));
        }
        rendered
    }
}

/// Runs a body so its real exit status lands in `<log_dir>/rc`.
///
/// Any stale `rc` file is removed before the body starts. On Unix a trap
/// records the status on exit and on `HUP`, `INT`, `QUIT` and `TERM`; on
/// Windows the body runs as a subroutine whose error level is recorded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureExitStatus {
    log_dir: String,
    body: Box<Statement>,
}

impl CaptureExitStatus {
    /// Wraps `body`; `log_dir` may contain tokens.
    #[must_use]
    pub fn new(log_dir: impl Into<String>, body: Statement) -> Self {
        Self {
            log_dir: log_dir.into(),
            body: Box::new(body),
        }
    }

    /// Renders the capture preamble around the body.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the log directory or body fails to render.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        let log_dir = replace_tokens(&self.log_dir, family)?;
        let body = self.body.render(family)?;
        let rc = format!("{log_dir}{}rc", ShellToken::Fs.to(family));

        Ok(match family {
            OsFamily::Unix => {
                let mut rendered = format!("mkdir -p \"{log_dir}\"\nrm -f \"{rc}\"\n");
                rendered.push_str(&format!("trap 'echo $?>\"{rc}\"' 0\n"));
                for (signal, status) in [(1, 129), (2, 130), (3, 131), (15, 143)] {
                    rendered.push_str(&format!("trap 'exit {status}' {signal}\n"));
                }
                rendered.push_str(&body);
                rendered
            }
            OsFamily::Windows => format!(
                concat!(
                    "if not exist \"{log_dir}\" md \"{log_dir}\"\r\n",
                    "del /F /Q \"{rc}\" 2>NUL\r\n",
                    "call :{label} %*\r\n",
                    ">\"{rc}\" echo %ERRORLEVEL%\r\n",
                    "exit /b %ERRORLEVEL%\r\n",
                    ":{label}\r\n",
                    "{body}",
                    "exit /b 0\r\n",
                ),
                log_dir = log_dir,
                rc = rc,
                label = CAPTURED_BODY_LABEL,
                body = body,
            ),
        })
    }

    /// Dependencies of the wrapped body.
    #[must_use]
    pub fn function_dependencies(&self, family: OsFamily) -> FunctionDependencies {
        self.body.function_dependencies(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{call, find_pid, interpret, new_statement_list};
    use rstest::rstest;

    fn run_script(body: Statement) -> CreateRunScript {
        CreateRunScript::new(
            "yahooprod",
            ["javaHome", "instanceName"],
            "{varl}INSTANCE_HOME{varr}",
            body,
        )
    }

    #[test]
    fn unix_run_script_is_written_with_heredocs() {
        let rendered = run_script(interpret(["echo hello"]))
            .render(OsFamily::Unix)
            .expect("renders");
        assert_eq!(
            rendered,
            concat!(
                "mkdir -p \"$INSTANCE_HOME\"\n",
                "cat > \"$INSTANCE_HOME/yahooprod.sh\" <<'END_OF_RUN_SCRIPT'\n",
                "#!/bin/sh\n",
                "set +u\n",
                "export PATH=/usr/ucb/bin:/bin:/sbin:/usr/bin:/usr/sbin\n",
                "export INSTANCE_NAME=yahooprod\n",
                "END_OF_RUN_SCRIPT\n",
                "SCRIPTGEN_VALUE=$(printf '%s' \"$JAVA_HOME\" | sed \"s/'/'\\\\\\\\''/g\")\n",
                "printf \"export JAVA_HOME='%s'\\n\" \"$SCRIPTGEN_VALUE\" ",
                ">> \"$INSTANCE_HOME/yahooprod.sh\"\n",
                "cat >> \"$INSTANCE_HOME/yahooprod.sh\" <<'END_OF_RUN_SCRIPT'\n",
                "cd \"$INSTANCE_HOME\"\n",
                "echo hello\n",
                "END_OF_RUN_SCRIPT\n",
                "chmod u+x \"$INSTANCE_HOME/yahooprod.sh\"\n",
            )
        );
    }

    #[test]
    fn run_script_rewrites_return_to_exit() {
        let rendered = run_script(interpret(["[ -f lock ] && {return} 1"]))
            .render(OsFamily::Unix)
            .expect("renders");
        assert!(rendered.contains("[ -f lock ] && exit 1\n"), "{rendered}");
    }

    #[rstest]
    #[case(OsFamily::Unix, "findPid() {")]
    #[case(OsFamily::Windows, ":findPid")]
    fn run_script_embeds_library_functions(#[case] family: OsFamily, #[case] header: &str) {
        let statement = run_script(find_pid("{varl}INSTANCE_NAME{varr}"));
        let rendered = statement.render(family).expect("renders");
        assert!(rendered.contains(header), "{rendered}");
        assert!(rendered.contains("abort"), "{rendered}");
        assert!(
            Statement::CreateRunScript(statement)
                .function_dependencies(family)
                .is_empty()
        );
    }

    #[test]
    fn run_script_rejects_control_script_functions() {
        let err = run_script(call("default", Vec::<String>::new()))
            .render(OsFamily::Unix)
            .expect_err("default lives in the control script");
        assert!(matches!(err, RenderError::UnknownFunction { ref name, .. } if name == "default"));
    }

    #[test]
    fn windows_run_script_is_appended_line_by_line() {
        let rendered = run_script(interpret(["echo %JAVA_HOME% > out.txt"]))
            .render(OsFamily::Windows)
            .expect("renders");
        let path = "%INSTANCE_HOME%\\yahooprod.cmd";
        assert!(rendered.contains(&format!("del /F /Q \"{path}\" 2>NUL\r\n")));
        assert!(rendered.contains(&format!(">>\"{path}\" echo(@echo off\r\n")));
        assert!(rendered.contains(&format!(">>\"{path}\" echo(set INSTANCE_NAME=yahooprod\r\n")));
        assert!(rendered.contains(&format!(
            "setlocal EnableDelayedExpansion\r\n>>\"{path}\" echo(set \"JAVA_HOME=!JAVA_HOME!\"\r\nendlocal\r\n"
        )));
        assert!(rendered.contains(&format!(
            ">>\"{path}\" echo(echo %%JAVA_HOME%% ^> out.txt\r\n"
        )));
        assert!(!rendered.contains("chmod"));
    }

    #[rstest]
    #[case(OsFamily::Unix, "trap 'echo $?>\"$LOG_DIR/rc\"' 0\n")]
    #[case(OsFamily::Windows, ">\"%LOG_DIR%\\rc\" echo %ERRORLEVEL%\r\n")]
    fn capture_records_status_in_rc(#[case] family: OsFamily, #[case] snippet: &str) {
        let capture = CaptureExitStatus::new(
            "{varl}LOG_DIR{varr}",
            new_statement_list([interpret(["echo hello"])]),
        );
        let rendered = capture.render(family).expect("renders");
        assert!(rendered.contains(snippet), "{rendered}");
        let removal = rendered.find("rc\"").expect("rc removal");
        let body = rendered.find("echo hello").expect("body");
        assert!(removal < body, "{rendered}");
    }

    #[test]
    fn unix_capture_traps_termination_signals() {
        let rendered = CaptureExitStatus::new("/var/log/app", interpret(["true"]))
            .render(OsFamily::Unix)
            .expect("renders");
        for signal in ["1", "2", "3", "15"] {
            assert!(
                rendered.lines().any(|line| {
                    line.starts_with("trap 'exit ") && line.ends_with(&format!(" {signal}"))
                }),
                "missing trap for {signal}: {rendered}"
            );
        }
    }
}
