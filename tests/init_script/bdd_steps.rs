//! BDD step definitions for instance control scripts.

use rstest_bdd_macros::{given, then, when};
use scriptgen::init_script::ACTIONS;
use scriptgen::statement::interpret;
use scriptgen::{InitBuilder, OsFamily, Script, ScriptError};

use super::test_helpers::{RenderOutcome, ScriptContext};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("invalid step input: {0}")]
    Input(String),
}

fn builder(script_context: &ScriptContext) -> Result<InitBuilder, StepError> {
    script_context
        .builder
        .clone()
        .ok_or_else(|| StepError::Input(String::from("no instance configured")))
}

fn rendered(script_context: &ScriptContext) -> Result<&Script, StepError> {
    script_context.script().ok_or_else(|| {
        StepError::Assertion(format!(
            "expected a rendered script, got {:?}",
            script_context.outcome
        ))
    })
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion(message()))
    }
}

#[given("an instance named \"{name}\"")]
fn instance_named(mut script_context: ScriptContext, name: String) -> ScriptContext {
    script_context.builder = Some(InitBuilder::new(name));
    script_context
}

#[given("the run statement \"{line}\"")]
fn run_statement(
    mut script_context: ScriptContext,
    line: String,
) -> Result<ScriptContext, StepError> {
    let updated = builder(&script_context)?.run_statement(interpret([line]));
    script_context.builder = Some(updated);
    Ok(script_context)
}

#[given("the exported variable \"{key}\" set to \"{value}\"")]
fn exported_variable(
    mut script_context: ScriptContext,
    key: String,
    value: String,
) -> Result<ScriptContext, StepError> {
    let updated = builder(&script_context)?.export_variable(key, value);
    script_context.builder = Some(updated);
    Ok(script_context)
}

#[when("I render the control script for \"{family}\"")]
fn render_for(
    mut script_context: ScriptContext,
    family: String,
) -> Result<ScriptContext, StepError> {
    let target: OsFamily = family
        .parse()
        .map_err(|err: scriptgen::UnknownFamily| StepError::Input(err.to_string()))?;
    let outcome = builder(&script_context)?
        .build()
        .and_then(|script| script.build(target));
    script_context.outcome = Some(match outcome {
        Ok(script) => RenderOutcome::Rendered(script),
        Err(err) => RenderOutcome::Failed(err),
    });
    Ok(script_context)
}

#[then("the script starts with the \"{header}\" header")]
fn starts_with_header(script_context: &ScriptContext, header: String) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    ensure(script.as_str().starts_with(&header), || {
        format!("expected header {header}, got: {}", script.as_str())
    })
}

#[then("the instance name is exported as \"{name}\"")]
fn instance_name_exported(script_context: &ScriptContext, name: String) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    let expected = match script.family() {
        OsFamily::Unix => format!("export INSTANCE_NAME=\"{name}\"\n"),
        OsFamily::Windows => format!("set INSTANCE_NAME={name}\r\n"),
    };
    ensure(script.as_str().contains(&expected), || {
        format!("missing {expected:?} in: {}", script.as_str())
    })
}

#[then("the script contains \"{snippet}\"")]
fn contains_snippet(script_context: &ScriptContext, snippet: String) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    ensure(script.as_str().contains(&snippet), || {
        format!("missing {snippet:?} in: {}", script.as_str())
    })
}

#[then("the script dispatches every lifecycle action")]
fn dispatches_every_action(script_context: &ScriptContext) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    for (index, action) in ACTIONS.iter().enumerate() {
        let arm = match script.family() {
            OsFamily::Unix => format!("\n{action})\n"),
            OsFamily::Windows => format!("if \"%1\" == \"{action}\" goto CASE_{index}\r\n"),
        };
        ensure(script.as_str().contains(&arm), || {
            format!("missing dispatch for {action}")
        })?;
    }
    Ok(())
}

#[then("the run script records its exit status under the log directory")]
fn records_exit_status(script_context: &ScriptContext) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    let marker = match script.family() {
        OsFamily::Unix => "trap 'echo $?>\"$LOG_DIR/rc\"' 0",
        OsFamily::Windows => "^>\"%%LOG_DIR%%\\rc\" echo %%ERRORLEVEL%%",
    };
    ensure(script.as_str().contains(marker), || {
        format!("missing exit status capture {marker:?}")
    })
}

#[then("the script uses only CRLF line endings")]
fn crlf_only(script_context: &ScriptContext) -> Result<(), StepError> {
    let script = rendered(script_context)?;
    let bare = script.as_str().replace("\r\n", "");
    ensure(!bare.contains('\n'), || String::from("found a bare line feed"))
}

#[then("rendering fails because no run statements were given")]
fn fails_without_run_statements(script_context: &ScriptContext) -> Result<(), StepError> {
    match script_context.outcome {
        Some(RenderOutcome::Failed(ScriptError::NoRunStatements { .. })) => Ok(()),
        ref other => Err(StepError::Assertion(format!(
            "expected NoRunStatements, got {other:?}"
        ))),
    }
}

#[then("rendering fails because the instance name \"{name}\" is reserved")]
fn fails_with_reserved_name(script_context: &ScriptContext, name: String) -> Result<(), StepError> {
    match script_context.outcome {
        Some(RenderOutcome::Failed(ScriptError::ReservedName { name: ref reserved }))
            if *reserved == name =>
        {
            Ok(())
        }
        ref other => Err(StepError::Assertion(format!(
            "expected ReservedName for {name}, got {other:?}"
        ))),
    }
}
