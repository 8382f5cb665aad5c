// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests assert with expect()/panic!() freely
#![cfg_attr(test, allow(clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackgraph
//!
//! A declarative resource graph with deferred outputs, deterministic
//! execution plans, and secret propagation.
//!
//! ## Overview
//!
//! Resources are declared with properties, some of which refer to outputs
//! of other resources that do not exist yet. Stackgraph:
//!
//! - Orders the resources so every one comes after everything it references
//! - Hands each resource's resolved properties to a pluggable executor
//! - Substitutes produced outputs into the resources that reference them
//! - Keeps secret values wrapped from settings to final outputs
//!
//! ## Architecture
//!
//! 1. **Declare**: resources and exports go into a [`graph::ResourceGraph`]
//! 2. **Plan**: [`graph::ResourceGraph::build_plan`] sorts them into an
//!    [`graph::ExecutionPlan`] with a stable fingerprint
//! 3. **Resolve**: the plan is walked against a [`provider::ResourceExecutor`]
//!
//! ## Modules
//!
//! - [`graph`]: Values, declarations, plans, and resolution
//! - [`provider`]: Provider schemas, the executor contract, a simulated executor
//! - [`config`]: Stack settings from YAML and the environment
//! - [`stacks`]: The built-in Azure web stack
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```
//! use stackgraph::graph::{ResourceGraph, Value};
//! use stackgraph::provider::{ProviderSchema, SimulatedExecutor};
//!
//! # async fn demo() -> stackgraph::Result<()> {
//! let mut graph = ResourceGraph::new(ProviderSchema::azure_native());
//! let rg = graph.declare("rg", "resource-group", [("location", Value::from("EastUS"))])?;
//! let group = Value::from(graph.property_of(&rg, "name"));
//! let sa = graph.declare("sa", "storage-account", [("resource_group_name", group)])?;
//! graph.export("web", sa.output("primary_endpoints.web"), false)?;
//!
//! let plan = graph.build_plan()?;
//! assert_eq!(plan.order(), vec!["rg", "sa"]);
//!
//! let outputs = graph.resolve(&plan, &SimulatedExecutor::new()).await?;
//! assert!(outputs.plain("web").is_some());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod provider;
pub mod stacks;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{SettingsParser, StackSettings};
pub use error::{Result, StackError};
pub use graph::{
    DeferredValue, ExecutionPlan, ResolvedValue, ResourceGraph, Secret, StackOutputs, Value,
};
pub use provider::{ProviderSchema, ResourceExecutor, SimulatedExecutor};
pub use stacks::AzureWebStack;
