//! Azure web stack.
//!
//! A resource group holding a storage account that serves a static website,
//! a small Ubuntu VM on its own virtual network, and an Azure SQL server
//! with one database.

use serde_json::json;
use tracing::info;

use crate::config::{SettingKey, StackSettings};
use crate::error::Result;
use crate::graph::{ResourceGraph, ResourceHandle, Value};
use crate::provider::{AzureResourceKind, ProviderSchema};

/// Settings key for the deployment region.
pub const LOCATION_KEY: &str = "azure-native:location";

/// Region used when none is configured.
pub const DEFAULT_LOCATION: &str = "EastUS";

/// VM admin user used when none is configured.
pub const DEFAULT_ADMIN_USERNAME: &str = "azureuser";

/// SQL admin user used when none is configured.
pub const DEFAULT_SQL_ADMIN_USERNAME: &str = "sqladminuser";

/// Connection string template; args are server, database, user, password.
const SQL_CONNECTION_TEMPLATE: &str = "Server=tcp:{0}.database.windows.net;Database={1};User ID={2};Password={3};Encrypt=true;Connection Timeout=30;";

/// Handles to every resource of a declared web stack.
#[derive(Debug, Clone)]
pub struct AzureWebStack {
    /// Resource group holding everything else.
    pub resource_group: ResourceHandle,
    /// Storage account serving the website.
    pub storage_account: ResourceHandle,
    /// Static website configuration of the account.
    pub static_website: ResourceHandle,
    /// Uploaded `index.html`.
    pub index_html: ResourceHandle,
    /// Virtual network.
    pub vnet: ResourceHandle,
    /// Subnet of the virtual network.
    pub subnet: ResourceHandle,
    /// Network interface of the VM.
    pub nic: ResourceHandle,
    /// Virtual machine.
    pub vm: ResourceHandle,
    /// SQL server.
    pub sql_server: ResourceHandle,
    /// SQL database.
    pub sql_database: ResourceHandle,
}

impl AzureWebStack {
    /// Settings this stack reads.
    pub const SETTINGS: &'static [SettingKey] = &[
        SettingKey::plain(LOCATION_KEY),
        SettingKey::plain("adminUsername"),
        SettingKey::secret("adminPassword"),
        SettingKey::plain("sqlAdminUsername"),
        SettingKey::secret("sqlAdminPassword"),
        SettingKey::plain("sqlServerName"),
    ];

    /// Creates a graph over the `azure-native` schema and declares the stack
    /// into it.
    ///
    /// # Errors
    ///
    /// See [`AzureWebStack::declare`].
    pub fn build(settings: &StackSettings) -> Result<(ResourceGraph, Self)> {
        let mut graph = ResourceGraph::new(ProviderSchema::azure_native());
        let stack = Self::declare(&mut graph, settings)?;
        Ok((graph, stack))
    }

    /// Declares the stack's resources and outputs.
    ///
    /// # Errors
    ///
    /// Returns a config error if `adminPassword`, `sqlAdminPassword` or
    /// `sqlServerName` is not set, and a graph error if the graph already
    /// holds resources with the same names or lacks a resource type.
    pub fn declare(graph: &mut ResourceGraph, settings: &StackSettings) -> Result<Self> {
        let location = settings.value_or(LOCATION_KEY, DEFAULT_LOCATION);
        let admin_username = settings.value_or("adminUsername", DEFAULT_ADMIN_USERNAME);
        let admin_password = settings.require_secret("adminPassword")?;
        let sql_admin_username =
            settings.value_or("sqlAdminUsername", DEFAULT_SQL_ADMIN_USERNAME);
        let sql_admin_password = settings.require_secret("sqlAdminPassword")?;
        let sql_server_name = settings.require_value("sqlServerName")?;

        info!("Declaring web stack in {}", location.describe());

        let resource_group = graph.declare(
            "resource_group",
            AzureResourceKind::ResourceGroup.as_str(),
            [("location", location)],
        )?;
        let group_name = || Value::from(resource_group.output("name"));
        let group_location = || Value::from(resource_group.output("location"));

        let storage_account = graph.declare(
            "sa",
            AzureResourceKind::StorageAccount.as_str(),
            [
                ("resource_group_name", group_name()),
                ("location", group_location()),
                ("sku", Value::map([("name", Value::from("Standard_LRS"))])),
                ("kind", Value::from("StorageV2")),
            ],
        )?;
        let account_name = || Value::from(storage_account.output("name"));

        let static_website = graph.declare(
            "staticWebsite",
            AzureResourceKind::StaticWebsite.as_str(),
            [
                ("account_name", account_name()),
                ("resource_group_name", group_name()),
                ("index_document", Value::from("index.html")),
            ],
        )?;

        let index_html = graph.declare(
            "index.html",
            AzureResourceKind::Blob.as_str(),
            [
                ("resource_group_name", group_name()),
                ("account_name", account_name()),
                ("container_name", Value::from("$web")),
                ("source", Value::from("index.html")),
                ("content_type", Value::from("text/html")),
            ],
        )?;
        // "$web" only exists once static hosting is enabled.
        graph.depends_on(&index_html, &static_website)?;

        let vnet = graph.declare(
            "myVNet",
            AzureResourceKind::VirtualNetwork.as_str(),
            [
                ("resource_group_name", group_name()),
                ("location", group_location()),
                (
                    "address_space",
                    Value::from(json!({ "address_prefixes": ["10.0.0.0/16"] })),
                ),
            ],
        )?;

        let subnet = graph.declare(
            "mySubnet",
            AzureResourceKind::Subnet.as_str(),
            [
                ("resource_group_name", group_name()),
                ("virtual_network_name", Value::from(vnet.output("name"))),
                ("address_prefix", Value::from("10.0.1.0/24")),
            ],
        )?;

        let nic = graph.declare(
            "myNIC",
            AzureResourceKind::NetworkInterface.as_str(),
            [
                ("resource_group_name", group_name()),
                ("location", group_location()),
                (
                    "ip_configurations",
                    Value::list([Value::map([
                        ("name", Value::from("ipconfig1")),
                        (
                            "subnet",
                            Value::map([("id", Value::from(subnet.output("id")))]),
                        ),
                        ("private_ip_allocation_method", Value::from("Dynamic")),
                    ])]),
                ),
            ],
        )?;

        let vm = graph.declare(
            "myVM",
            AzureResourceKind::VirtualMachine.as_str(),
            [
                ("resource_group_name", group_name()),
                ("location", group_location()),
                (
                    "network_profile",
                    Value::map([(
                        "network_interfaces",
                        Value::list([Value::map([
                            ("id", Value::from(nic.output("id"))),
                            ("primary", Value::from(true)),
                        ])]),
                    )]),
                ),
                (
                    "hardware_profile",
                    Value::from(json!({ "vm_size": "Standard_DS1_v2" })),
                ),
                (
                    "os_profile",
                    Value::map([
                        ("computer_name", Value::from("myvm")),
                        ("admin_username", admin_username),
                        ("admin_password", Value::from(admin_password)),
                    ]),
                ),
                (
                    "storage_profile",
                    Value::from(json!({
                        "image_reference": {
                            "publisher": "Canonical",
                            "offer": "UbuntuServer",
                            "sku": "18.04-LTS",
                            "version": "latest",
                        },
                        "os_disk": {
                            "name": "myOSDisk",
                            "caching": "ReadWrite",
                            "create_option": "FromImage",
                            "managed_disk": { "storage_account_type": "Standard_LRS" },
                        },
                    })),
                ),
            ],
        )?;

        let sql_server = graph.declare(
            "mySqlServer",
            AzureResourceKind::SqlServer.as_str(),
            [
                ("resource_group_name", group_name()),
                ("location", group_location()),
                ("server_name", sql_server_name),
                ("administrator_login", sql_admin_username.clone()),
                (
                    "administrator_login_password",
                    Value::from(sql_admin_password.clone()),
                ),
                ("version", Value::from("12.0")),
                ("public_network_access", Value::from("Enabled")),
            ],
        )?;

        let sql_database = graph.declare(
            "mySqlDatabase",
            AzureResourceKind::SqlDatabase.as_str(),
            [
                ("resource_group_name", group_name()),
                ("server_name", Value::from(sql_server.output("name"))),
                (
                    "sku",
                    Value::from(json!({ "name": "S0", "tier": "Standard" })),
                ),
            ],
        )?;

        graph.export(
            "primary_storage_key",
            storage_account.output("primary_key"),
            true,
        )?;
        graph.export(
            "staticEndpoint",
            storage_account.output("primary_endpoints.web"),
            false,
        )?;
        graph.export("vm_id", vm.output("id"), false)?;
        graph.export(
            "sql_connection_string",
            Value::format(
                SQL_CONNECTION_TEMPLATE,
                [
                    Value::from(sql_server.output("name")),
                    Value::from(sql_database.output("name")),
                    sql_admin_username,
                    Value::from(sql_admin_password),
                ],
            ),
            true,
        )?;

        Ok(Self {
            resource_group,
            storage_account,
            static_website,
            index_html,
            vnet,
            subnet,
            nic,
            vm,
            sql_server,
            sql_database,
        })
    }
}
