//! Dispatch tables keyed on a single variable.

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::utils::write_switch;

use super::{FunctionDependencies, Statement};

/// Runs the statement whose value matches `variable`.
///
/// Cases keep insertion order so rendered output is reproducible. There is
/// no default arm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Switch {
    variable: String,
    cases: Vec<(String, Statement)>,
}

impl Switch {
    /// Starts a table dispatching on `variable`; digits name a positional
    /// argument.
    #[must_use]
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            cases: Vec::new(),
        }
    }

    /// Adds a case, replacing an earlier case with the same value in place.
    #[must_use]
    pub fn case(mut self, value: impl Into<String>, statement: Statement) -> Self {
        let case = (value.into(), statement);
        if let Some(slot) = self.cases.iter_mut().find(|(existing, _)| *existing == case.0) {
            *slot = case;
            return self;
        }
        self.cases.push(case);
        self
    }

    /// Variable being dispatched on.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Case values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|(value, _)| value.as_str())
    }

    /// Renders the dispatch block.
    ///
    /// # Errors
    ///
    /// Returns the first [`RenderError`] raised by a case body.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        let rendered = self
            .cases
            .iter()
            .map(|(value, statement)| Ok((value.clone(), statement.render(family)?)))
            .collect::<Result<Vec<_>, RenderError>>()?;
        Ok(write_switch(&self.variable, &rendered, family))
    }

    /// Union of the case bodies' dependencies.
    #[must_use]
    pub fn function_dependencies(&self, family: OsFamily) -> FunctionDependencies {
        self.cases
            .iter()
            .flat_map(|(_, statement)| statement.function_dependencies(family))
            .collect()
    }
}

impl<K> FromIterator<(K, Statement)> for Switch
where
    K: Into<String>,
{
    /// Collects cases into a table on the first positional argument.
    fn from_iter<I: IntoIterator<Item = (K, Statement)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new("1"), |switch, (value, statement)| {
                switch.case(value, statement)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::interpret;

    #[test]
    fn repeated_value_replaces_case() {
        let switch = Switch::new("1")
            .case("a", interpret(["echo first"]))
            .case("b", interpret(["echo b"]))
            .case("a", interpret(["echo second"]));
        assert_eq!(switch.values().collect::<Vec<_>>(), vec!["a", "b"]);
        let rendered = switch.render(OsFamily::Unix).expect("renders");
        assert!(rendered.contains("echo second"));
        assert!(!rendered.contains("echo first"));
    }

    #[test]
    fn renders_cases_in_insertion_order() {
        let switch: Switch = [
            ("stop", interpret(["echo stop"])),
            ("start", interpret(["echo start"])),
        ]
        .into_iter()
        .collect();
        let rendered = switch.render(OsFamily::Unix).expect("renders");
        let stop = rendered.find("stop)").expect("stop arm");
        let start = rendered.find("start)").expect("start arm");
        assert!(stop < start, "rendered: {rendered}");
    }
}
