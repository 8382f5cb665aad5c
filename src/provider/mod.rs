//! Provider module: resource type schemas and the executor contract.
//!
//! This module defines which resource types a provider supports, the
//! [`ResourceExecutor`] capability that materializes them, and a simulated
//! executor for running graphs without a cloud account.

mod executor;
mod schema;
mod simulated;

#[cfg(test)]
pub use executor::MockResourceExecutor;
pub use executor::{ResourceExecutor, ResourceRequest};
pub use schema::{AzureResourceKind, ProviderSchema, TypeSchema};
pub use simulated::SimulatedExecutor;
