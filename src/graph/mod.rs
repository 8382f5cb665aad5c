//! Resource graph: declarations, deferred values, planning, and resolution.
//!
//! Resources are declared with properties that may reference other
//! resources' outputs. The builder orders them into an execution plan, and
//! the resolver walks that plan against an executor.

mod builder;
mod outputs;
mod plan;
mod resolver;
mod secret;
mod value;

pub use builder::{OutputDecl, ResourceDecl, ResourceGraph};
pub use outputs::StackOutputs;
pub use plan::{ExecutionPlan, PlannedOutput, PlannedStep};
pub use resolver::PlanResolver;
pub use secret::{REDACTED, Secret};
pub use value::{
    DeferredValue, Properties, PropertyMap, ResolvedValue, ResourceHandle, Value,
    describe_properties,
};
