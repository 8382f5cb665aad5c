//! Settings parser for loading stack settings from YAML and the environment.
//!
//! A settings file looks like:
//!
//! ```yaml
//! settings:
//!   azure-native:location: WestEurope
//!   sqlServerName: contoso-sql
//!   adminPassword:
//!     secret: hunter2
//! ```
//!
//! Environment variables override file values; see [`SettingKey::env_var`].

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result, StackError};

use super::settings::{Setting, SettingKey, StackSettings};

/// Default settings file names to search for.
pub const DEFAULT_SETTINGS_FILES: &[&str] = &["stackgraph.yaml", "stackgraph.yml"];

/// Suffix that marks an environment override as secret.
const SECRET_SUFFIX: &str = "_SECRET";

/// On-disk settings document.
#[derive(Debug, Default, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    settings: BTreeMap<String, SettingEntry>,
}

/// A single entry: a scalar, or `{ secret: scalar }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SettingEntry {
    Secret { secret: serde_yaml::Value },
    Plain(serde_yaml::Value),
}

/// Parser for stack settings.
#[derive(Debug, Default)]
pub struct SettingsParser {
    /// Directory used to find the `.env` file.
    base_path: Option<PathBuf>,
}

impl SettingsParser {
    /// Creates a new settings parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory used to find the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackSettings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(StackError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a value is not a scalar.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackSettings> {
        debug!("Parsing YAML settings");
        let location = || source.map(|p| p.display().to_string());

        if content.trim().is_empty() {
            return Ok(StackSettings::new());
        }

        let document: Option<SettingsDocument> = serde_yaml::from_str(content).map_err(|e| {
            StackError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: location(),
            })
        })?;

        let mut settings = StackSettings::new();
        for (key, entry) in document.unwrap_or_default().settings {
            let setting = match entry {
                SettingEntry::Secret { secret } => {
                    Setting::Secret(scalar_to_string(&key, &secret, location())?.into())
                }
                SettingEntry::Plain(value) => {
                    Setting::Plain(scalar_to_string(&key, &value, location())?)
                }
            };
            settings.insert(key, setting);
        }

        debug!("Parsed {} settings", settings.len());
        Ok(settings)
    }

    /// Loads settings from a file, then applies environment overrides for
    /// the given keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(
        &self,
        path: impl AsRef<Path>,
        keys: &[SettingKey],
    ) -> Result<StackSettings> {
        let mut settings = self.load_file(path)?;
        Self::apply_env_overrides(&mut settings, keys);
        Ok(settings)
    }

    /// Applies process environment overrides for the given keys.
    pub fn apply_env_overrides(settings: &mut StackSettings, keys: &[SettingKey]) {
        Self::apply_overrides_from(settings, keys, |name| std::env::var(name).ok());
    }

    /// Applies overrides read through `lookup`.
    ///
    /// For each key, `STACKGRAPH_SETTING_<KEY>` replaces the value and
    /// `STACKGRAPH_SETTING_<KEY>_SECRET` replaces it as a secret. Keys
    /// declared secret stay secret whichever variable is used. Empty
    /// variables are ignored.
    pub fn apply_overrides_from<F>(settings: &mut StackSettings, keys: &[SettingKey], lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in keys {
            let var = key.env_var();
            let secret_var = format!("{var}{SECRET_SUFFIX}");

            let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

            if let Some(value) = read(&secret_var) {
                debug!("Overriding secret setting {} from {secret_var}", key.key);
                settings.set_secret(key.key, value);
            } else if let Some(value) = read(&var) {
                debug!("Overriding setting {} from {var}", key.key);
                if key.secret {
                    settings.set_secret(key.key, value);
                } else {
                    settings.set(key.key, value);
                }
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Settings are strings; numbers and booleans are accepted and stringified.
fn scalar_to_string(
    key: &str,
    value: &serde_yaml::Value,
    location: Option<String>,
) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        _ => Err(StackError::Config(ConfigError::ParseError {
            message: format!("Setting '{key}' must be a scalar value"),
            location,
        })),
    }
}

/// Finds the settings file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no settings file is found.
pub fn find_settings_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_SETTINGS_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found settings file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_SETTINGS_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_and_secret_settings() {
        let yaml = r"
settings:
  azure-native:location: WestEurope
  sqlServerName: contoso-sql
  port: 1433
  adminPassword:
    secret: hunter2
";
        let settings = SettingsParser::new().parse_yaml(yaml, None).expect("parse");

        assert_eq!(settings.len(), 4);
        assert_eq!(settings.get("azure-native:location"), Some("WestEurope"));
        assert_eq!(settings.get("port"), Some("1433"));
        assert!(settings.is_secret("adminPassword"));
        assert!(!settings.is_secret("sqlServerName"));
        assert_eq!(
            settings.require_secret("adminPassword").expect("secret").expose(),
            "hunter2"
        );
    }

    #[test]
    fn test_parse_empty_document() {
        let settings = SettingsParser::new().parse_yaml("", None).expect("parse");
        assert!(settings.is_empty());
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        let yaml = r"
settings:
  tags:
    - web
";
        let err = SettingsParser::new()
            .parse_yaml(yaml, Some(Path::new("stackgraph.yaml")))
            .expect_err("list is not a scalar");
        assert!(matches!(
            err,
            StackError::Config(ConfigError::ParseError { location: Some(_), .. })
        ));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut settings = StackSettings::new()
            .with("azure-native:location", "EastUS")
            .with("sqlServerName", "from-file");
        let env: HashMap<&str, &str> = HashMap::from([
            ("STACKGRAPH_SETTING_AZURE_NATIVE_LOCATION", "NorthEurope"),
            ("STACKGRAPH_SETTING_SQLADMINPASSWORD", "from-env"),
            ("STACKGRAPH_SETTING_SQLSERVERNAME_SECRET", "hidden-name"),
            ("STACKGRAPH_SETTING_ADMINPASSWORD", ""),
        ]);
        let keys = [
            SettingKey::plain("azure-native:location"),
            SettingKey::plain("sqlServerName"),
            SettingKey::secret("sqlAdminPassword"),
            SettingKey::secret("adminPassword"),
        ];

        SettingsParser::apply_overrides_from(&mut settings, &keys, |name| {
            env.get(name).map(|v| (*v).to_string())
        });

        assert_eq!(settings.get("azure-native:location"), Some("NorthEurope"));
        assert!(settings.is_secret("sqlAdminPassword"));
        assert!(settings.is_secret("sqlServerName"));
        assert_eq!(settings.require("sqlServerName").expect("set"), "hidden-name");
        assert!(!settings.contains("adminPassword"));
    }

    #[test]
    fn test_load_file_and_find() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("infra").join("web");
        std::fs::create_dir_all(&nested).expect("mkdir");
        let path = dir.path().join("stackgraph.yml");
        std::fs::write(&path, "settings:\n  sqlServerName: contoso-sql\n").expect("write");

        let found = find_settings_file(&nested).expect("found");
        assert_eq!(found, path);

        let settings = SettingsParser::new().load_file(&found).expect("load");
        assert_eq!(settings.get("sqlServerName"), Some("contoso-sql"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let err = SettingsParser::new()
            .load_file(dir.path().join("stackgraph.yaml"))
            .expect_err("missing");
        assert!(matches!(err, StackError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_dotenv_without_file_is_ok() {
        let dir = TempDir::new().expect("tempdir");
        let parser = SettingsParser::new().with_base_path(dir.path());
        assert!(parser.load_dotenv().is_ok());
    }
}
