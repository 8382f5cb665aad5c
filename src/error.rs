//! Error types for the stackgraph resource engine.
//!
//! This module provides the error hierarchy for every stage of a stack's
//! lifecycle: reading settings, declaring the graph, building the plan, and
//! resolving it against an executor.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stackgraph.
#[derive(Debug, Error)]
pub enum StackError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Graph declaration and planning errors.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// The executor failed to materialize a resource.
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file was not found.
    #[error("Settings file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("Failed to parse settings: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A required setting is absent.
    #[error("Missing required setting: {key}")]
    MissingSetting {
        /// Key of the missing setting.
        key: String,
    },
}

/// Errors raised while declaring, planning, or resolving a resource graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A resource name was declared twice.
    #[error("Duplicate resource name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// The resource type is not supported by the target provider.
    #[error("Unknown resource type '{resource_type}' for provider {provider}")]
    UnknownType {
        /// The unsupported type tag.
        resource_type: String,
        /// Provider the graph was built against.
        provider: String,
    },

    /// The graph contains a reference cycle.
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    Cycle {
        /// Resources participating in the cycle, in edge order.
        cycle: Vec<String>,
    },

    /// A deferred value refers to a resource that was never declared.
    #[error("Unresolved reference from {referrer}: resource '{resource}' is not declared")]
    UnresolvedReference {
        /// Resource or output holding the reference.
        referrer: String,
        /// The undeclared resource.
        resource: String,
    },

    /// An output name was exported twice.
    #[error("Duplicate output name: {name}")]
    DuplicateOutput {
        /// The duplicated output name.
        name: String,
    },

    /// A referenced property was not produced by its source resource.
    #[error("Resource '{resource}' has no output property '{property}'")]
    MissingOutput {
        /// Source resource.
        resource: String,
        /// Requested property.
        property: String,
    },
}

/// Failure returned by an executor while materializing one resource.
#[derive(Debug, Error)]
#[error("Failed to materialize {resource_type} '{resource}': {source}")]
pub struct ExecutorError {
    /// Logical name of the resource.
    pub resource: String,
    /// Type tag of the resource.
    pub resource_type: String,
    /// Provider-specific failure.
    #[source]
    pub source: ProviderError,
}

/// Provider-specific failures reported by an executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// A property the provider needs was not supplied.
    #[error("Missing property: {property}")]
    MissingProperty {
        /// Name of the property.
        property: String,
    },

    /// A property had a value the provider rejects.
    #[error("Invalid property {property}: {message}")]
    InvalidProperty {
        /// Name of the property.
        property: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The provider API rejected the request.
    #[error("Provider API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP-style status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// The provider could not be reached.
    #[error("Provider unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },
}

/// Result type alias for stackgraph operations.
pub type Result<T> = std::result::Result<T, StackError>;

/// Formats a cycle path for display, closing the loop on the first node.
fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        None => String::from("empty cycle"),
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
    }
}

impl StackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the graph error, if this is one.
    #[must_use]
    pub const fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a missing-setting error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingSetting { key: key.into() }
    }
}

impl ProviderError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a missing-property error.
    #[must_use]
    pub fn missing(property: impl Into<String>) -> Self {
        Self::MissingProperty {
            property: property.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = GraphError::Cycle {
            cycle: vec![String::from("a"), String::from("b")],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
    }

    #[test]
    fn test_executor_error_keeps_source() {
        let err = ExecutorError {
            resource: String::from("sa"),
            resource_type: String::from("storage-account"),
            source: ProviderError::api_error(409, "name taken"),
        };
        let message = err.to_string();
        assert!(message.contains("storage-account 'sa'"));
        assert!(message.contains("409"));

        let wrapped = StackError::from(err);
        assert!(wrapped.as_graph().is_none());
    }
}
