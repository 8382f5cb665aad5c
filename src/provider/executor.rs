//! Executor contract for materializing resources.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::graph::{PropertyMap, describe_properties};

/// A resource ready to be materialized, with every property resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Logical name of the resource.
    pub name: String,
    /// Type tag of the resource.
    pub resource_type: String,
    /// Fully resolved properties.
    pub properties: PropertyMap,
}

/// Capability that creates or updates one resource and reports its outputs.
///
/// The graph calls an executor once per resource, in plan order, and waits
/// for each call before starting the next. Retries against a real API are
/// the executor's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceExecutor: Send + Sync {
    /// Materializes a resource and returns its output properties.
    async fn materialize(&self, request: &ResourceRequest) -> Result<PropertyMap, ProviderError>;

    /// Name of the provider this executor talks to.
    fn provider_name(&self) -> &'static str;
}

impl ResourceRequest {
    /// Returns a plain string property.
    #[must_use]
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    /// Returns a string property's plaintext, secret or not.
    ///
    /// Executors need the plaintext to talk to the provider; they must not
    /// log it.
    #[must_use]
    pub fn expose_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.reveal().as_str())
    }

    /// Returns a string property's plaintext or a missing-property error.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingProperty`] if the property is absent
    /// or not a string.
    pub fn require_str(&self, key: &str) -> Result<&str, ProviderError> {
        self.expose_str(key).ok_or_else(|| ProviderError::missing(key))
    }
}

impl std::fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' {}",
            self.resource_type,
            self.name,
            describe_properties(&self.properties)
        )
    }
}

#[async_trait]
impl<E: ResourceExecutor + ?Sized> ResourceExecutor for Box<E> {
    async fn materialize(&self, request: &ResourceRequest) -> Result<PropertyMap, ProviderError> {
        (**self).materialize(request).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ResolvedValue, Secret};
    use serde_json::json;

    #[test]
    fn test_display_redacts_secret_properties() {
        let mut properties = PropertyMap::new();
        properties.insert(String::from("admin_username"), ResolvedValue::from("azureuser"));
        properties.insert(
            String::from("admin_password"),
            ResolvedValue::Secret(Secret::new(json!("hunter2"))),
        );
        let request = ResourceRequest {
            name: String::from("myVM"),
            resource_type: String::from("virtual-machine"),
            properties,
        };

        let shown = request.to_string();
        assert!(shown.contains("admin_username=azureuser"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(request.str_property("admin_password"), None);
        assert_eq!(request.require_str("admin_password"), Ok("hunter2"));
        assert!(request.require_str("location").is_err());
    }
}
