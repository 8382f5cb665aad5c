//! Plan resolution.
//!
//! Walks a plan in order, substitutes already-resolved outputs into each
//! resource's properties, calls the executor once per resource, and finally
//! resolves the plan's outputs.

use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::error::{ExecutorError, GraphError, Result};
use crate::provider::{ProviderSchema, ResourceExecutor, ResourceRequest};

use super::outputs::StackOutputs;
use super::plan::{ExecutionPlan, PlannedStep};
use super::value::{DeferredValue, PropertyMap, ResolvedValue, describe_properties};

/// Resolves plans against an executor.
#[derive(Debug)]
pub struct PlanResolver<'a, E: ?Sized> {
    /// Executor that materializes resources.
    executor: &'a E,
    /// Schema used to mark secret outputs.
    schema: &'a ProviderSchema,
}

impl<'a, E> PlanResolver<'a, E>
where
    E: ResourceExecutor + ?Sized,
{
    /// Creates a resolver.
    #[must_use]
    pub const fn new(executor: &'a E, schema: &'a ProviderSchema) -> Self {
        Self { executor, schema }
    }

    /// Resolves a plan.
    ///
    /// # Errors
    ///
    /// Returns the first reference or executor failure. Resources after the
    /// failing one are not materialized.
    pub async fn resolve(&self, plan: &ExecutionPlan) -> Result<StackOutputs> {
        info!(
            "Resolving plan {} with {} resources via {}",
            plan.short_fingerprint(),
            plan.len(),
            self.executor.provider_name()
        );

        let mut materialized: HashMap<String, PropertyMap> = HashMap::new();

        for (idx, step) in plan.steps.iter().enumerate() {
            let request = Self::prepare(step, &materialized)?;
            info!(
                "[{}/{}] Materializing {} '{}'",
                idx + 1,
                plan.len(),
                step.resource_type,
                step.name
            );
            debug!("Resolved properties: {}", describe_properties(&request.properties));

            let produced = match self.executor.materialize(&request).await {
                Ok(produced) => produced,
                Err(source) => {
                    error!("Failed to materialize {}: {source}", step.name);
                    return Err(ExecutorError {
                        resource: step.name.clone(),
                        resource_type: step.resource_type.clone(),
                        source,
                    }
                    .into());
                }
            };

            let outputs = self.merge_outputs(&step.resource_type, request.properties, produced);
            debug!("Outputs of {}: {}", step.name, describe_properties(&outputs));
            materialized.insert(step.name.clone(), outputs);
        }

        let mut outputs = StackOutputs::new();
        for output in &plan.outputs {
            let referrer = format!("output '{}'", output.name);
            let lookup = |d: &DeferredValue| lookup_output(&materialized, &referrer, d);
            let value = output.value.resolve_with(&lookup)?;
            let value = if output.secret { value.into_secret() } else { value };
            outputs.insert(output.name.clone(), value);
        }

        info!("Resolved {} outputs", outputs.len());
        Ok(outputs)
    }

    /// Resolves a step's declared properties into a request.
    fn prepare(
        step: &PlannedStep,
        materialized: &HashMap<String, PropertyMap>,
    ) -> std::result::Result<ResourceRequest, GraphError> {
        let lookup = |d: &DeferredValue| lookup_output(materialized, &step.name, d);

        let mut properties = PropertyMap::new();
        for (key, value) in &step.properties {
            properties.insert(key.clone(), value.resolve_with(&lookup)?);
        }

        Ok(ResourceRequest {
            name: step.name.clone(),
            resource_type: step.resource_type.clone(),
            properties,
        })
    }

    /// Executor outputs win over inputs, but an output replacing a secret
    /// input stays secret. Schema-secret outputs are wrapped.
    fn merge_outputs(
        &self,
        resource_type: &str,
        inputs: PropertyMap,
        produced: PropertyMap,
    ) -> PropertyMap {
        let mut merged = inputs;
        for (key, value) in produced {
            let value = if merged.get(&key).is_some_and(ResolvedValue::is_secret) {
                value.into_secret()
            } else {
                value
            };
            merged.insert(key, value);
        }

        if let Some(type_schema) = self.schema.get(resource_type) {
            for (key, value) in &mut merged {
                if type_schema.is_secret_output(key) && !value.is_secret() {
                    *value = value.clone().into_secret();
                }
            }
        }

        merged
    }
}

/// Finds a resolved output, following dotted paths into nested objects.
fn lookup_output(
    materialized: &HashMap<String, PropertyMap>,
    referrer: &str,
    reference: &DeferredValue,
) -> std::result::Result<ResolvedValue, GraphError> {
    let outputs =
        materialized
            .get(&reference.resource)
            .ok_or_else(|| GraphError::UnresolvedReference {
                referrer: referrer.to_string(),
                resource: reference.resource.clone(),
            })?;

    if let Some(value) = outputs.get(&reference.property) {
        return Ok(value.clone());
    }

    let missing = || GraphError::MissingOutput {
        resource: reference.resource.clone(),
        property: reference.property.clone(),
    };

    let (head, rest) = reference.property.split_once('.').ok_or_else(missing)?;
    outputs
        .get(head)
        .and_then(|value| value.pointer(rest))
        .ok_or_else(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StackError};
    use crate::graph::{Properties, ResourceGraph, Secret, Value};
    use crate::provider::{MockResourceExecutor, SimulatedExecutor, TypeSchema};
    use mockall::Sequence;
    use serde_json::json;

    fn schema() -> ProviderSchema {
        ProviderSchema::new("test")
            .with_type(TypeSchema::new("resource-group", "Test/groups").with_outputs(["name"]))
            .with_type(
                TypeSchema::new("storage-account", "Test/accounts")
                    .with_outputs(["name", "endpoints", "key"])
                    .with_secret_outputs(["key"]),
            )
    }

    fn outputs(pairs: &[(&str, ResolvedValue)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    /// rg <- sa, with sa.group bound to rg.name.
    fn group_and_account() -> ResourceGraph {
        let mut graph = ResourceGraph::new(schema());
        let rg = graph
            .declare("rg", "resource-group", Properties::new())
            .expect("rg");
        let group = Value::from(graph.property_of(&rg, "name"));
        graph
            .declare("sa", "storage-account", [("group", group)])
            .expect("sa");
        graph
    }

    #[tokio::test]
    async fn test_dependent_receives_resolved_value() {
        let graph = group_and_account();
        let plan = graph.build_plan().expect("plan");

        let mut executor = MockResourceExecutor::new();
        let mut seq = Sequence::new();
        executor.expect_provider_name().return_const("mock");
        executor
            .expect_materialize()
            .withf(|r| r.name == "rg" && r.properties.is_empty())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(outputs(&[("name", ResolvedValue::from("rg-1a2b"))])));
        executor
            .expect_materialize()
            .withf(|r| r.name == "sa" && r.str_property("group") == Some("rg-1a2b"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(outputs(&[("name", ResolvedValue::from("sa1a2b"))])));

        let resolved = graph.resolve(&plan, &executor).await.expect("resolve");
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_executor_failure_aborts_remaining_resources() {
        let graph = group_and_account();
        let plan = graph.build_plan().expect("plan");

        let mut executor = MockResourceExecutor::new();
        executor.expect_provider_name().return_const("mock");
        executor
            .expect_materialize()
            .withf(|r| r.name == "rg")
            .times(1)
            .returning(|_| Err(ProviderError::api_error(429, "throttled")));
        executor
            .expect_materialize()
            .withf(|r| r.name == "sa")
            .never();

        let err = graph.resolve(&plan, &executor).await.expect_err("should fail");
        match err {
            StackError::Executor(e) => {
                assert_eq!(e.resource, "rg");
                assert_eq!(e.source, ProviderError::api_error(429, "throttled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_secret_outputs_are_wrapped() {
        let mut graph = group_and_account();
        graph
            .export("key", DeferredValue::new("sa", "key"), false)
            .expect("export key");
        graph
            .export("group", DeferredValue::new("rg", "name"), true)
            .expect("export group");
        graph
            .export("web", DeferredValue::new("sa", "endpoints.web"), false)
            .expect("export web");
        let plan = graph.build_plan().expect("plan");

        let mut executor = MockResourceExecutor::new();
        executor.expect_provider_name().return_const("mock");
        executor
            .expect_materialize()
            .returning(|r| match r.name.as_str() {
                "rg" => Ok(outputs(&[("name", ResolvedValue::from("rg-1"))])),
                _ => Ok(outputs(&[
                    ("key", ResolvedValue::from("k3y")),
                    ("endpoints", ResolvedValue::from(json!({ "web": "https://w" }))),
                ])),
            });

        let resolved = graph.resolve(&plan, &executor).await.expect("resolve");

        assert!(resolved.is_secret("key"));
        assert_eq!(resolved.reveal("key"), Some(&json!("k3y")));
        assert!(resolved.is_secret("group"));
        assert_eq!(resolved.plain("web"), Some(&json!("https://w")));

        let view = serde_json::to_string(&resolved.redacted()).expect("serialize");
        assert!(!view.contains("k3y"));
        assert!(!view.contains("rg-1"));
    }

    #[tokio::test]
    async fn test_missing_output_is_reported() {
        let mut graph = ResourceGraph::new(schema());
        graph
            .declare("rg", "resource-group", Properties::new())
            .expect("rg");
        graph
            .export("nope", DeferredValue::new("rg", "location"), false)
            .expect("export");
        let plan = graph.build_plan().expect("plan");

        let executor = SimulatedExecutor::new();
        let err = graph.resolve(&plan, &executor).await.expect_err("missing");
        assert!(matches!(
            err.as_graph(),
            Some(GraphError::MissingOutput { resource, property })
                if resource == "rg" && property == "location"
        ));
    }

    #[tokio::test]
    async fn test_secret_inputs_stay_secret_downstream() {
        let mut graph = ResourceGraph::new(schema());
        let rg = graph
            .declare(
                "rg",
                "resource-group",
                [("password", Value::from(Secret::from("pw")))],
            )
            .expect("rg");
        graph
            .export("echo", graph.property_of(&rg, "password"), false)
            .expect("export");
        let plan = graph.build_plan().expect("plan");

        let executor = SimulatedExecutor::new();
        let resolved = graph.resolve(&plan, &executor).await.expect("resolve");

        assert!(resolved.is_secret("echo"));
        assert_eq!(resolved.reveal("echo"), Some(&json!("pw")));
        let calls = executor.calls();
        assert!(calls[0].properties["password"].is_secret());
    }

    #[tokio::test]
    async fn test_echoed_secret_input_stays_secret() {
        let mut graph = ResourceGraph::new(schema());
        let db = graph
            .declare(
                "db",
                "resource-group",
                [("password", Value::from(Secret::from("hunter2")))],
            )
            .expect("db");
        graph
            .export("pw", graph.property_of(&db, "password"), false)
            .expect("export");
        let plan = graph.build_plan().expect("plan");

        let mut executor = MockResourceExecutor::new();
        executor.expect_provider_name().return_const("mock");
        executor
            .expect_materialize()
            .times(1)
            .returning(|_| Ok(outputs(&[("password", ResolvedValue::from("hunter2"))])));

        let resolved = graph.resolve(&plan, &executor).await.expect("resolve");

        assert!(resolved.is_secret("pw"));
        assert_eq!(resolved.reveal("pw"), Some(&json!("hunter2")));
        let view = serde_json::to_string(&resolved.redacted()).expect("serialize");
        assert!(!view.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_plan_missing_later_exports_is_rejected() {
        let mut graph = group_and_account();
        let plan = graph.build_plan().expect("plan");
        graph
            .export("group", DeferredValue::new("rg", "name"), false)
            .expect("export");

        let executor = SimulatedExecutor::new();
        let err = graph.resolve(&plan, &executor).await.expect_err("stale plan");
        assert!(matches!(err, StackError::Internal(_)));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_plan_is_rejected() {
        let graph = group_and_account();
        let other = ResourceGraph::new(schema());
        let plan = other.build_plan().expect("empty plan");

        let executor = SimulatedExecutor::new();
        let err = graph.resolve(&plan, &executor).await.expect_err("foreign plan");
        assert!(matches!(err, StackError::Internal(_)));
        assert!(executor.calls().is_empty());
    }
}
