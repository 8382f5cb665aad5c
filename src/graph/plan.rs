//! Execution plan types.
//!
//! A plan is the ordered list of resources to materialize, plus the outputs
//! to resolve once every resource is done. Plans are self-contained: they
//! carry the declared properties, so resolving one never consults the
//! builder again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::value::{Properties, Value};

/// A topologically ordered execution plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Provider the plan was built against.
    pub provider: String,
    /// Deterministic hash of the plan content.
    pub fingerprint: String,
    /// Resources in execution order.
    pub steps: Vec<PlannedStep>,
    /// Outputs resolved after the last step.
    pub outputs: Vec<PlannedOutput>,
}

/// A single resource in the plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    /// Logical name of the resource.
    pub name: String,
    /// Type tag of the resource.
    pub resource_type: String,
    /// Declared properties.
    pub properties: Properties,
    /// Resources this one depends on, in first-reference order.
    pub dependencies: Vec<String>,
}

/// A named output of the plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedOutput {
    /// Output name.
    pub name: String,
    /// Bound value.
    pub value: Value,
    /// Whether the resolved value must be returned wrapped.
    pub secret: bool,
}

impl ExecutionPlan {
    /// Creates a plan and computes its fingerprint.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        steps: Vec<PlannedStep>,
        outputs: Vec<PlannedOutput>,
    ) -> Self {
        let provider = provider.into();
        let fingerprint = fingerprint(&provider, &steps, &outputs);
        Self {
            created_at: Utc::now(),
            provider,
            fingerprint,
            steps,
            outputs,
        }
    }

    /// Returns true if the plan has no resources.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of resources in the plan.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Resource names in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Position of a resource in the plan.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Looks up a step by resource name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&PlannedStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Short form of the fingerprint for display.
    #[must_use]
    pub fn short_fingerprint(&self) -> &str {
        self.fingerprint.get(..12).unwrap_or(&self.fingerprint)
    }
}

/// Hashes everything that affects execution, in order.
///
/// The timestamp is excluded, and secrets contribute only their placeholder.
fn fingerprint(provider: &str, steps: &[PlannedStep], outputs: &[PlannedOutput]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());

    for step in steps {
        hasher.update([0u8]);
        hasher.update(step.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(step.resource_type.as_bytes());
        for dep in &step.dependencies {
            hasher.update([1u8]);
            hasher.update(dep.as_bytes());
        }
        for (key, value) in &step.properties {
            hasher.update([2u8]);
            hasher.update(key.as_bytes());
            hasher.update(value.describe().to_string().as_bytes());
        }
    }

    for output in outputs {
        hasher.update([3u8]);
        hasher.update(output.name.as_bytes());
        hasher.update(if output.secret { [1u8] } else { [0u8] });
        hasher.update(output.value.describe().to_string().as_bytes());
    }

    hex::encode(hasher.finalize())
}

impl std::fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.resource_type)?;
        if !self.dependencies.is_empty() {
            write!(f, " after {}", self.dependencies.join(", "))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "Empty plan");
        }

        writeln!(
            f,
            "Execution Plan ({} resources, {}):",
            self.steps.len(),
            self.short_fingerprint()
        )?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {step}", i + 1)?;
        }

        if !self.outputs.is_empty() {
            writeln!(f, "Outputs:")?;
            for output in &self.outputs {
                let marker = if output.secret { " (secret)" } else { "" };
                writeln!(f, "  - {}{marker}", output.name)?;
            }
        }

        Ok(())
    }
}
