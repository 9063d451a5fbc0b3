//! Shared fixtures for control script behavioural tests.

use rstest::fixture;
use scriptgen::{InitBuilder, Script, ScriptError};

/// Result of rendering the configured instance.
#[derive(Clone, Debug)]
pub enum RenderOutcome {
    Rendered(Script),
    Failed(ScriptError),
}

#[derive(Clone, Debug)]
pub struct ScriptContext {
    pub builder: Option<InitBuilder>,
    pub outcome: Option<RenderOutcome>,
}

impl ScriptContext {
    pub fn script(&self) -> Option<&Script> {
        match self.outcome {
            Some(RenderOutcome::Rendered(ref script)) => Some(script),
            _ => None,
        }
    }
}

#[fixture]
pub fn script_context() -> ScriptContext {
    ScriptContext {
        builder: None,
        outcome: None,
    }
}
