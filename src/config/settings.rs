//! Stack settings: the key/value configuration a stack reads.
//!
//! Settings are either plain or secret. Secret settings never appear in
//! `Debug` output and are handed out wrapped in [`Secret`].

use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ConfigError;
use crate::graph::{Secret, Value};

/// A single setting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// A value that may be logged.
    Plain(String),
    /// A value that must never be logged.
    Secret(Secret<String>),
}

/// A setting a stack reads, and whether it must be treated as secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingKey {
    /// Setting key.
    pub key: &'static str,
    /// Whether values for this key are secret.
    pub secret: bool,
}

/// Key/value settings for a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSettings {
    values: BTreeMap<String, Setting>,
}

impl Setting {
    /// Returns the plaintext.
    #[must_use]
    pub fn expose(&self) -> &str {
        match self {
            Self::Plain(v) => v,
            Self::Secret(s) => s.expose(),
        }
    }

    /// Returns true if the setting is secret.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

impl SettingKey {
    /// A plain setting key.
    #[must_use]
    pub const fn plain(key: &'static str) -> Self {
        Self { key, secret: false }
    }

    /// A secret setting key.
    #[must_use]
    pub const fn secret(key: &'static str) -> Self {
        Self { key, secret: true }
    }

    /// Environment variable that overrides this key.
    ///
    /// The key is upper-cased and every non-alphanumeric character becomes
    /// `_`, e.g. `azure-native:location` -> `STACKGRAPH_SETTING_AZURE_NATIVE_LOCATION`.
    #[must_use]
    pub fn env_var(&self) -> String {
        env_var_for(self.key)
    }
}

/// Environment variable name for a setting key.
#[must_use]
pub fn env_var_for(key: &str) -> String {
    let suffix: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("STACKGRAPH_SETTING_{suffix}")
}

impl StackSettings {
    /// Creates empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain setting.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Adds a secret setting.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_secret(key, value);
        self
    }

    /// Sets a plain setting.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Setting::Plain(value.into()));
    }

    /// Sets a secret setting.
    pub fn set_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), Setting::Secret(Secret::new(value.into())));
    }

    /// Returns a setting's plaintext.
    ///
    /// Reading a secret this way is allowed but logged, since the caller
    /// loses the wrapper.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let setting = self.values.get(key)?;
        if setting.is_secret() {
            warn!("Setting '{key}' is secret; read it with require_secret to keep it wrapped");
        }
        Some(setting.expose())
    }

    /// Returns a setting or a default.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Returns a required setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if the key is absent.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::missing(key))
    }

    /// Returns a setting wrapped as a secret, whether or not it was stored
    /// as one.
    #[must_use]
    pub fn get_secret(&self, key: &str) -> Option<Secret<String>> {
        self.values
            .get(key)
            .map(|setting| Secret::new(setting.expose().to_string()))
    }

    /// Returns a required setting wrapped as a secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if the key is absent.
    pub fn require_secret(&self, key: &str) -> Result<Secret<String>, ConfigError> {
        self.get_secret(key).ok_or_else(|| ConfigError::missing(key))
    }

    /// Returns a setting as a graph value, wrapped if it is stored secret.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|setting| match setting {
            Setting::Plain(v) => Value::from(v.as_str()),
            Setting::Secret(s) => Value::from(s.clone()),
        })
    }

    /// Returns a setting as a graph value, or a plain default.
    #[must_use]
    pub fn value_or(&self, key: &str, default: &str) -> Value {
        self.value(key).unwrap_or_else(|| Value::from(default))
    }

    /// Returns a required setting as a graph value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if the key is absent.
    pub fn require_value(&self, key: &str) -> Result<Value, ConfigError> {
        self.value(key).ok_or_else(|| ConfigError::missing(key))
    }

    /// Returns true if the key is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns true if the key is set and secret.
    #[must_use]
    pub fn is_secret(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(Setting::is_secret)
    }

    /// Number of settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Setting keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Inserts an already-built setting.
    pub(crate) fn insert(&mut self, key: String, setting: Setting) {
        self.values.insert(key, setting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_uses_default() {
        let settings = StackSettings::new().with("adminUsername", "ops");
        assert_eq!(settings.get_or("adminUsername", "azureuser"), "ops");
        assert_eq!(settings.get_or("sqlAdminUsername", "sqladminuser"), "sqladminuser");
    }

    #[test]
    fn test_require_fails_loudly() {
        let settings = StackSettings::new();
        let err = settings.require("sqlServerName").expect_err("missing");
        assert_eq!(err.to_string(), "Missing required setting: sqlServerName");
        assert!(settings.require_secret("adminPassword").is_err());
    }

    #[test]
    fn test_require_secret_wraps_plain_values() {
        let settings = StackSettings::new().with("adminPassword", "plain-pw");
        let secret = settings.require_secret("adminPassword").expect("present");
        assert_eq!(secret.expose(), "plain-pw");
        assert!(!settings.is_secret("adminPassword"));
    }

    #[test]
    fn test_value_keeps_secrecy() {
        let settings = StackSettings::new()
            .with("adminUsername", "ops")
            .with_secret("sqlServerName", "hidden-srv");

        assert_eq!(settings.value_or("adminUsername", "azureuser"), Value::from("ops"));
        assert_eq!(settings.value_or("location", "EastUS"), Value::from("EastUS"));

        let server = settings.require_value("sqlServerName").expect("present");
        assert_eq!(server, Value::from(Secret::new(String::from("hidden-srv"))));
        assert!(!format!("{server:?}").contains("hidden-srv"));
        assert!(settings.require_value("missing").is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = StackSettings::new()
            .with("location", "EastUS")
            .with_secret("adminPassword", "hunter2");
        let shown = format!("{settings:?}");
        assert!(shown.contains("EastUS"));
        assert!(!shown.contains("hunter2"));
        assert!(settings.is_secret("adminPassword"));
        assert_eq!(settings.keys().collect::<Vec<_>>(), vec!["adminPassword", "location"]);
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(
            SettingKey::plain("azure-native:location").env_var(),
            "STACKGRAPH_SETTING_AZURE_NATIVE_LOCATION"
        );
        assert_eq!(
            SettingKey::secret("adminPassword").env_var(),
            "STACKGRAPH_SETTING_ADMINPASSWORD"
        );
    }
}
