//! In-process executor that fabricates Azure-shaped outputs.
//!
//! Identifiers are derived from a SHA-256 of the logical name, so the same
//! graph always produces the same outputs. Every request is recorded for
//! inspection.

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::error::ProviderError;
use crate::graph::{PropertyMap, ResolvedValue, Secret};

use super::executor::{ResourceExecutor, ResourceRequest};
use super::schema::AzureResourceKind;

/// Subscription embedded in resource IDs.
const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Length of the generated name suffix.
const SUFFIX_LEN: usize = 8;

/// Properties that generated names and IDs are built from.
const NAMING_PROPERTIES: &[&str] = &[
    "name",
    "resource_group_name",
    "account_name",
    "container_name",
    "virtual_network_name",
    "server_name",
];

/// Deterministic executor that never leaves the process.
#[derive(Debug)]
pub struct SimulatedExecutor {
    /// Resources whose materialization should fail.
    fail_on: HashSet<String>,
    /// Requests received, in call order.
    calls: Mutex<Vec<ResourceRequest>>,
}

impl SimulatedExecutor {
    /// Creates a simulated executor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fail_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes materialization of the named resource fail.
    #[must_use]
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.fail_on.insert(name.into());
        self
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ResourceRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the names of materialized resources, in call order.
    #[must_use]
    pub fn call_order(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.name).collect()
    }

    fn record(&self, request: &ResourceRequest) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
    }

    fn outputs_for(
        kind: Option<AzureResourceKind>,
        request: &ResourceRequest,
    ) -> Result<PropertyMap, ProviderError> {
        let mut outputs = PropertyMap::new();

        let Some(kind) = kind else {
            let name = request
                .expose_str("name")
                .map_or_else(|| autoname(&request.name), str::to_string);
            outputs.insert(String::from("id"), ResolvedValue::from(format!("sim:{name}")));
            outputs.insert(String::from("name"), ResolvedValue::from(name));
            return Ok(outputs);
        };

        if kind == AzureResourceKind::ResourceGroup {
            let name = request
                .expose_str("resource_group_name")
                .map_or_else(|| autoname(&request.name), str::to_string);
            outputs.insert(String::from("id"), ResolvedValue::from(group_scope(&name)));
            outputs.insert(String::from("name"), ResolvedValue::from(name));
            return Ok(outputs);
        }

        let group = request.require_str("resource_group_name")?;
        let scope = format!("{}/providers", group_scope(group));

        match kind {
            AzureResourceKind::ResourceGroup => {}
            AzureResourceKind::StorageAccount => {
                let name = storage_account_name(&request.name);
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!("{scope}/{}/{name}", kind.namespace())),
                );
                outputs.insert(
                    String::from("primary_endpoints"),
                    ResolvedValue::from(json!({
                        "web": format!("https://{name}.z13.web.core.windows.net/"),
                        "blob": format!("https://{name}.blob.core.windows.net/"),
                    })),
                );
                outputs.insert(
                    String::from("primary_key"),
                    ResolvedValue::Secret(Secret::new(JsonValue::String(digest(&format!("key:{SUBSCRIPTION}:{name}"))))),
                );
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
            AzureResourceKind::StaticWebsite => {
                let account = request.require_str("account_name")?;
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!(
                        "{scope}/Microsoft.Storage/storageAccounts/{account}/staticWebsite"
                    )),
                );
                outputs.insert(String::from("container_name"), ResolvedValue::from("$web"));
            }
            AzureResourceKind::Blob => {
                let account = request.require_str("account_name")?;
                let container = request.require_str("container_name")?;
                let name = request.str_property("blob_name").unwrap_or(request.name.as_str());
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!(
                        "{scope}/Microsoft.Storage/storageAccounts/{account}/blobServices/default/containers/{container}/blobs/{name}"
                    )),
                );
                outputs.insert(
                    String::from("url"),
                    ResolvedValue::from(format!(
                        "https://{account}.blob.core.windows.net/{container}/{name}"
                    )),
                );
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
            AzureResourceKind::Subnet => {
                let network = request.require_str("virtual_network_name")?;
                let name = request
                    .str_property("subnet_name")
                    .map_or_else(|| autoname(&request.name), str::to_string);
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!(
                        "{scope}/Microsoft.Network/virtualNetworks/{network}/subnets/{name}"
                    )),
                );
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
            AzureResourceKind::SqlServer => {
                let name = request.require_str("server_name")?.to_string();
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!("{scope}/{}/{name}", kind.namespace())),
                );
                outputs.insert(
                    String::from("fully_qualified_domain_name"),
                    ResolvedValue::from(format!("{name}.database.windows.net")),
                );
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
            AzureResourceKind::SqlDatabase => {
                let server = request.require_str("server_name")?;
                let name = autoname(&request.name);
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!(
                        "{scope}/Microsoft.Sql/servers/{server}/databases/{name}"
                    )),
                );
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
            AzureResourceKind::VirtualNetwork
            | AzureResourceKind::NetworkInterface
            | AzureResourceKind::VirtualMachine => {
                let name = autoname(&request.name);
                outputs.insert(
                    String::from("id"),
                    ResolvedValue::from(format!("{scope}/{}/{name}", kind.namespace())),
                );
                if kind == AzureResourceKind::NetworkInterface {
                    outputs.insert(
                        String::from("private_ip_address"),
                        ResolvedValue::from("10.0.1.4"),
                    );
                }
                if kind == AzureResourceKind::VirtualMachine {
                    outputs.insert(
                        String::from("vm_id"),
                        ResolvedValue::from(uuid_like(&request.name)),
                    );
                }
                outputs.insert(String::from("name"), ResolvedValue::from(name));
            }
        }

        Ok(outputs)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceExecutor for SimulatedExecutor {
    async fn materialize(&self, request: &ResourceRequest) -> Result<PropertyMap, ProviderError> {
        self.record(request);
        debug!("Simulating {request}");

        if self.fail_on.contains(&request.name) {
            return Err(ProviderError::api_error(
                500,
                format!("simulated failure for '{}'", request.name),
            ));
        }

        let kind = AzureResourceKind::from_tag(&request.resource_type);
        let mut outputs = Self::outputs_for(kind, request)?;

        // Names and IDs built from a secret are secret too.
        let from_secret = NAMING_PROPERTIES.iter().any(|key| {
            request
                .properties
                .get(*key)
                .is_some_and(ResolvedValue::is_secret)
        });
        if from_secret {
            for value in outputs.values_mut() {
                *value = value.clone().into_secret();
            }
        }

        Ok(outputs)
    }

    fn provider_name(&self) -> &'static str {
        "simulated"
    }
}

/// Resource group scope of an Azure resource ID.
fn group_scope(group: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{group}")
}

/// Hex SHA-256 of the input.
fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Logical name plus a stable suffix, the way the provider auto-names.
fn autoname(logical: &str) -> String {
    format!("{logical}{}", &digest(logical)[..SUFFIX_LEN])
}

/// Storage account names are lowercase alphanumerics only.
fn storage_account_name(logical: &str) -> String {
    autoname(logical)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A UUID-shaped identifier derived from the name.
fn uuid_like(logical: &str) -> String {
    let hash = digest(&format!("vm:{logical}"));
    format!(
        "{}-{}-{}-{}-{}",
        &hash[0..8],
        &hash[8..12],
        &hash[12..16],
        &hash[16..20],
        &hash[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, resource_type: &str, props: &[(&str, &str)]) -> ResourceRequest {
        ResourceRequest {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            properties: props
                .iter()
                .map(|(k, v)| ((*k).to_string(), ResolvedValue::from(*v)))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_resource_group_outputs() {
        let executor = SimulatedExecutor::new();
        let outputs = executor
            .materialize(&request("resource_group", "resource-group", &[("location", "EastUS")]))
            .await
            .expect("materialize");

        let name = outputs["name"].as_str().expect("name");
        assert!(name.starts_with("resource_group"));
        assert_eq!(name.len(), "resource_group".len() + SUFFIX_LEN);
        assert_eq!(
            outputs["id"].as_str(),
            Some(format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{name}").as_str())
        );
    }

    #[tokio::test]
    async fn test_outputs_are_deterministic() {
        let first = SimulatedExecutor::new()
            .materialize(&request("sa", "storage-account", &[("resource_group_name", "rg1")]))
            .await
            .expect("first");
        let second = SimulatedExecutor::new()
            .materialize(&request("sa", "storage-account", &[("resource_group_name", "rg1")]))
            .await
            .expect("second");

        assert_eq!(first, second);
        assert!(first["primary_key"].is_secret());
        let web = first["primary_endpoints"].pointer("web").expect("web endpoint");
        assert!(web.as_str().is_some_and(|w| w.ends_with(".z13.web.core.windows.net/")));
    }

    #[tokio::test]
    async fn test_missing_group_is_rejected() {
        let executor = SimulatedExecutor::new();
        let err = executor
            .materialize(&request("myVNet", "virtual-network", &[]))
            .await
            .expect_err("should fail");
        assert_eq!(err, ProviderError::missing("resource_group_name"));
    }

    #[tokio::test]
    async fn test_failure_injection_and_recording() {
        let executor = SimulatedExecutor::new().failing_on("mySqlServer");
        let err = executor
            .materialize(&request(
                "mySqlServer",
                "sql-server",
                &[("resource_group_name", "rg1"), ("server_name", "srv")],
            ))
            .await
            .expect_err("should fail");

        assert!(matches!(err, ProviderError::ApiRequestFailed { status: 500, .. }));
        assert_eq!(executor.call_order(), vec!["mySqlServer"]);
    }

    #[tokio::test]
    async fn test_outputs_named_from_secret_are_secret() {
        let mut sql = request("mySqlServer", "sql-server", &[("resource_group_name", "rg1")]);
        sql.properties.insert(
            String::from("server_name"),
            ResolvedValue::Secret(Secret::new(json!("hidden-srv"))),
        );

        let outputs = SimulatedExecutor::new()
            .materialize(&sql)
            .await
            .expect("materialize");

        assert!(outputs.values().all(ResolvedValue::is_secret));
        assert_eq!(outputs["name"].reveal(), &json!("hidden-srv"));
        assert_eq!(
            outputs["fully_qualified_domain_name"].reveal(),
            &json!("hidden-srv.database.windows.net")
        );
    }

    #[test]
    fn test_storage_account_name_is_alphanumeric() {
        let name = storage_account_name("my_Store-1");
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_unknown_type_gets_generic_outputs() {
        let executor = SimulatedExecutor::new();
        let outputs = tokio_test::block_on(executor.materialize(&request(
            "bucket",
            "bucket",
            &[("name", "assets")],
        )))
        .expect("materialize");
        assert_eq!(outputs["id"].as_str(), Some("sim:assets"));
    }
}
