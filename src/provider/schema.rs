//! Provider schemas: which resource types a provider supports and what they
//! produce.

use indexmap::IndexMap;
use std::fmt;

/// Schema of a single resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    /// Type tag used in declarations (e.g. `storage-account`).
    pub tag: String,
    /// Provider-side resource namespace.
    pub namespace: String,
    /// Output properties the provider reports.
    pub outputs: Vec<String>,
    /// Output properties that are always secret.
    pub secret_outputs: Vec<String>,
}

/// The set of resource types a provider supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSchema {
    name: String,
    types: IndexMap<String, TypeSchema>,
}

/// Resource kinds of the Azure native provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AzureResourceKind {
    /// Resource group.
    ResourceGroup,
    /// Storage account.
    StorageAccount,
    /// Static website settings of a storage account.
    StaticWebsite,
    /// Blob in a storage container.
    Blob,
    /// Virtual network.
    VirtualNetwork,
    /// Subnet of a virtual network.
    Subnet,
    /// Network interface.
    NetworkInterface,
    /// Virtual machine.
    VirtualMachine,
    /// SQL server.
    SqlServer,
    /// SQL database.
    SqlDatabase,
}

impl TypeSchema {
    /// Creates a type schema with no outputs.
    #[must_use]
    pub fn new(tag: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            namespace: namespace.into(),
            outputs: Vec::new(),
            secret_outputs: Vec::new(),
        }
    }

    /// Sets the reported outputs.
    #[must_use]
    pub fn with_outputs<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the outputs that are always secret.
    #[must_use]
    pub fn with_secret_outputs<S: Into<String>>(
        mut self,
        outputs: impl IntoIterator<Item = S>,
    ) -> Self {
        self.secret_outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the given output is always secret.
    #[must_use]
    pub fn is_secret_output(&self, property: &str) -> bool {
        self.secret_outputs.iter().any(|p| p == property)
    }
}

impl ProviderSchema {
    /// Creates an empty provider schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: IndexMap::new(),
        }
    }

    /// Adds a resource type.
    #[must_use]
    pub fn with_type(mut self, schema: TypeSchema) -> Self {
        self.types.insert(schema.tag.clone(), schema);
        self
    }

    /// Schema of the Azure native provider.
    #[must_use]
    pub fn azure_native() -> Self {
        AzureResourceKind::all()
            .into_iter()
            .fold(Self::new("azure-native"), |schema, kind| {
                schema.with_type(kind.schema())
            })
    }

    /// Provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the provider supports the type tag.
    #[must_use]
    pub fn supports(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Looks up a type schema.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TypeSchema> {
        self.types.get(tag)
    }

    /// Supported type tags, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl AzureResourceKind {
    /// Returns the type tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "resource-group",
            Self::StorageAccount => "storage-account",
            Self::StaticWebsite => "storage-static-website",
            Self::Blob => "storage-blob",
            Self::VirtualNetwork => "virtual-network",
            Self::Subnet => "subnet",
            Self::NetworkInterface => "network-interface",
            Self::VirtualMachine => "virtual-machine",
            Self::SqlServer => "sql-server",
            Self::SqlDatabase => "sql-database",
        }
    }

    /// Parses a type tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.as_str() == tag)
    }

    /// All kinds, in dependency-friendly order.
    #[must_use]
    pub const fn all() -> [Self; 10] {
        [
            Self::ResourceGroup,
            Self::StorageAccount,
            Self::StaticWebsite,
            Self::Blob,
            Self::VirtualNetwork,
            Self::Subnet,
            Self::NetworkInterface,
            Self::VirtualMachine,
            Self::SqlServer,
            Self::SqlDatabase,
        ]
    }

    /// Azure resource provider namespace.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "Microsoft.Resources/resourceGroups",
            Self::StorageAccount => "Microsoft.Storage/storageAccounts",
            Self::StaticWebsite => "Microsoft.Storage/storageAccounts/staticWebsite",
            Self::Blob => "Microsoft.Storage/storageAccounts/blobServices/containers/blobs",
            Self::VirtualNetwork => "Microsoft.Network/virtualNetworks",
            Self::Subnet => "Microsoft.Network/virtualNetworks/subnets",
            Self::NetworkInterface => "Microsoft.Network/networkInterfaces",
            Self::VirtualMachine => "Microsoft.Compute/virtualMachines",
            Self::SqlServer => "Microsoft.Sql/servers",
            Self::SqlDatabase => "Microsoft.Sql/servers/databases",
        }
    }

    /// Output properties reported after materialization.
    #[must_use]
    pub const fn outputs(&self) -> &'static [&'static str] {
        match self {
            Self::ResourceGroup => &["id", "name", "location"],
            Self::StorageAccount => &["id", "name", "location", "primary_endpoints", "primary_key"],
            Self::StaticWebsite => &["id", "account_name", "container_name", "index_document"],
            Self::Blob => &["id", "name", "url"],
            Self::VirtualNetwork | Self::Subnet => &["id", "name"],
            Self::NetworkInterface => &["id", "name", "private_ip_address"],
            Self::VirtualMachine => &["id", "name", "vm_id"],
            Self::SqlServer => &["id", "name", "fully_qualified_domain_name"],
            Self::SqlDatabase => &["id", "name"],
        }
    }

    /// Outputs that are always secret.
    #[must_use]
    pub const fn secret_outputs(&self) -> &'static [&'static str] {
        match self {
            Self::StorageAccount => &["primary_key"],
            Self::VirtualMachine => &["os_profile"],
            Self::SqlServer => &["administrator_login_password"],
            _ => &[],
        }
    }

    /// Builds the type schema for this kind.
    #[must_use]
    pub fn schema(&self) -> TypeSchema {
        TypeSchema::new(self.as_str(), self.namespace())
            .with_outputs(self.outputs().iter().copied())
            .with_secret_outputs(self.secret_outputs().iter().copied())
    }
}

impl fmt::Display for AzureResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
