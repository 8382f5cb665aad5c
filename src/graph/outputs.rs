//! Resolved stack outputs.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::value::ResolvedValue;

/// Named outputs of a resolved graph.
///
/// Serializing this type, or printing it, shows secret outputs as a
/// placeholder. Reading a secret's plaintext requires [`StackOutputs::reveal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StackOutputs {
    values: IndexMap<String, ResolvedValue>,
}

impl StackOutputs {
    /// Creates an empty set of outputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, value: ResolvedValue) {
        self.values.insert(name, value);
    }

    /// Looks up an output, secret or not.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.values.get(name)
    }

    /// Returns a non-secret output.
    #[must_use]
    pub fn plain(&self, name: &str) -> Option<&JsonValue> {
        self.get(name).and_then(ResolvedValue::plain)
    }

    /// Returns an output's plaintext, unwrapping secrets.
    #[must_use]
    pub fn reveal(&self, name: &str) -> Option<&JsonValue> {
        self.get(name).map(ResolvedValue::reveal)
    }

    /// Returns true if the named output is secret.
    #[must_use]
    pub fn is_secret(&self, name: &str) -> bool {
        self.get(name).is_some_and(ResolvedValue::is_secret)
    }

    /// Number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over outputs in export order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-secret view: secrets are replaced by a placeholder.
    #[must_use]
    pub fn redacted(&self) -> IndexMap<String, JsonValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.redacted()))
            .collect()
    }

    /// Plaintext view of every output, secrets included.
    #[must_use]
    pub fn revealed(&self) -> IndexMap<String, JsonValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.reveal().clone()))
            .collect()
    }
}

impl std::fmt::Display for StackOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> StackOutputs {
        let mut outputs = StackOutputs::new();
        outputs.insert(String::from("endpoint"), ResolvedValue::from("https://site"));
        outputs.insert(
            String::from("key"),
            ResolvedValue::from("s3cr3t").into_secret(),
        );
        outputs
    }

    #[test]
    fn test_redacted_view_hides_secrets() {
        let outputs = outputs();
        let view = outputs.redacted();
        assert_eq!(view["endpoint"], json!("https://site"));
        assert_eq!(view["key"], json!("[secret]"));

        let serialized = serde_json::to_string(&outputs).expect("serialize");
        assert!(!serialized.contains("s3cr3t"));
        assert!(!outputs.to_string().contains("s3cr3t"));
        assert!(!format!("{outputs:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_secret_requires_explicit_unwrap() {
        let outputs = outputs();
        assert!(outputs.is_secret("key"));
        assert_eq!(outputs.plain("key"), None);
        assert_eq!(outputs.reveal("key"), Some(&json!("s3cr3t")));
        assert_eq!(outputs.plain("endpoint"), Some(&json!("https://site")));
        assert_eq!(outputs.revealed()["key"], json!("s3cr3t"));
    }
}
