//! Configuration module for stack settings.
//!
//! This module handles the settings a stack reads:
//! - Plain and secret key/value settings with defaults and required keys
//! - Loading `stackgraph.yaml` with environment and `.env` overrides

mod parser;
mod settings;

pub use parser::{DEFAULT_SETTINGS_FILES, SettingsParser, find_settings_file};
pub use settings::{Setting, SettingKey, StackSettings, env_var_for};
