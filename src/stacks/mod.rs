//! Built-in stacks declared through the resource graph.

mod azure_web;

pub use azure_web::{
    AzureWebStack, DEFAULT_ADMIN_USERNAME, DEFAULT_LOCATION, DEFAULT_SQL_ADMIN_USERNAME,
    LOCATION_KEY,
};
