//! Environment variable scopes.

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::utils::{write_function, write_variable_exporters};

/// Insertion-ordered variable assignments.
///
/// Order is preserved because later values may reference earlier ones, for
/// example `INSTANCE_HOME=/tmp/$INSTANCE_NAME`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Variables(Vec<(String, String)>);

impl Variables {
    /// Creates an empty set of variables.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `key` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = (key.into(), value.into());
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == entry.0) {
            *slot = entry;
            return;
        }
        self.0.push(entry);
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    /// Number of variables.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no variables are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut variables = Self::new();
        for (key, value) in iter {
            variables.insert(key, value);
        }
        variables
    }
}

/// A named function that exports a set of variables when called.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvironmentScope {
    name: String,
    variables: Variables,
}

impl EnvironmentScope {
    /// Creates a scope.
    #[must_use]
    pub const fn new(name: String, variables: Variables) -> Self {
        Self { name, variables }
    }

    /// Name of the exporting function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables exported by the scope.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Renders the scope as a function definition.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when a value references an unknown token.
    pub fn render(&self, family: OsFamily) -> Result<String, RenderError> {
        let body = write_variable_exporters(&self.variables, family)?;
        Ok(write_function(&self.name, &body, family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut variables: Variables = [("a", "1"), ("b", "2")].into_iter().collect();
        variables.insert("a", "3");
        assert_eq!(
            variables.iter().collect::<Vec<_>>(),
            vec![("a", "3"), ("b", "2")]
        );
        assert_eq!(variables.get("a"), Some("3"));
    }

    #[test]
    fn scope_renders_exporting_function() {
        let scope = EnvironmentScope::new(
            String::from("default"),
            [("instanceName", "foo")].into_iter().collect(),
        );
        assert_eq!(
            scope.render(OsFamily::Unix).as_deref(),
            Ok("default() {\nexport INSTANCE_NAME=\"foo\"\n   return 0\n}\n")
        );
        assert_eq!(
            scope.render(OsFamily::Windows).as_deref(),
            Ok(":default\r\nset INSTANCE_NAME=foo\r\n   exit /b 0\r\n")
        );
    }
}
