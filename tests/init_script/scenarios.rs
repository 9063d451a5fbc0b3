//! BDD scenarios for instance control scripts.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ScriptContext, script_context};

#[scenario(
    path = "tests/features/init_script.feature",
    name = "Render a Unix lifecycle script"
)]
fn scenario_unix_lifecycle(script_context: ScriptContext) {
    let _ = script_context;
}

#[scenario(
    path = "tests/features/init_script.feature",
    name = "Render a Windows lifecycle script"
)]
fn scenario_windows_lifecycle(script_context: ScriptContext) {
    let _ = script_context;
}

#[scenario(
    path = "tests/features/init_script.feature",
    name = "Reject an instance without run statements"
)]
fn scenario_no_run_statements(script_context: ScriptContext) {
    let _ = script_context;
}

#[scenario(
    path = "tests/features/init_script.feature",
    name = "Reject an instance named after a library function"
)]
fn scenario_reserved_instance_name(script_context: ScriptContext) {
    let _ = script_context;
}
