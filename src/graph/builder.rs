//! Resource graph builder.
//!
//! Resources are declared against a provider schema. Their deferred
//! references, plus any explicit `depends_on` edges, form the dependency
//! graph that [`ResourceGraph::build_plan`] orders.

use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::{GraphError, Result, StackError};
use crate::provider::{ProviderSchema, ResourceExecutor};

use super::outputs::StackOutputs;
use super::plan::{ExecutionPlan, PlannedOutput, PlannedStep};
use super::resolver::PlanResolver;
use super::value::{DeferredValue, Properties, ResourceHandle, Value};

/// A declared resource.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    /// Logical name.
    pub name: String,
    /// Type tag.
    pub resource_type: String,
    /// Declared properties.
    pub properties: Properties,
    /// Explicit ordering dependencies.
    pub depends_on: Vec<String>,
}

/// A declared output.
#[derive(Debug, Clone)]
pub struct OutputDecl {
    /// Output name.
    pub name: String,
    /// Bound value.
    pub value: Value,
    /// Whether the resolved value must be returned wrapped.
    pub secret: bool,
}

/// Builder for a graph of resources and its outputs.
#[derive(Debug)]
pub struct ResourceGraph {
    /// Types the target provider supports.
    schema: ProviderSchema,
    /// Resources in declaration order.
    resources: IndexMap<String, ResourceDecl>,
    /// Outputs in export order.
    exports: IndexMap<String, OutputDecl>,
}

impl ResourceDecl {
    /// Resources this one depends on, in first-reference order, without
    /// duplicates.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: IndexSet<&str> = IndexSet::new();
        for value in self.properties.values() {
            for reference in value.references() {
                deps.insert(reference.resource.as_str());
            }
        }
        for dep in &self.depends_on {
            deps.insert(dep.as_str());
        }
        deps.into_iter().collect()
    }
}

impl ResourceGraph {
    /// Creates an empty graph for the given provider.
    #[must_use]
    pub fn new(schema: ProviderSchema) -> Self {
        Self {
            schema,
            resources: IndexMap::new(),
            exports: IndexMap::new(),
        }
    }

    /// Provider schema the graph is checked against.
    #[must_use]
    pub const fn schema(&self) -> &ProviderSchema {
        &self.schema
    }

    /// Number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resources are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Looks up a declared resource.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceDecl> {
        self.resources.get(name)
    }

    /// Declared resources, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDecl> {
        self.resources.values()
    }

    /// Declared outputs, in export order.
    pub fn exports(&self) -> impl Iterator<Item = &OutputDecl> {
        self.exports.values()
    }

    /// Registers a resource.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateName`] if the name is taken and
    /// [`GraphError::UnknownType`] if the provider does not support the type.
    pub fn declare<I, K>(
        &mut self,
        name: impl Into<String>,
        resource_type: &str,
        properties: I,
    ) -> std::result::Result<ResourceHandle, GraphError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let name = name.into();

        if self.resources.contains_key(&name) {
            return Err(GraphError::DuplicateName { name });
        }

        if !self.schema.supports(resource_type) {
            return Err(GraphError::UnknownType {
                resource_type: resource_type.to_string(),
                provider: self.schema.name().to_string(),
            });
        }

        let properties: Properties = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        debug!(
            "Declared {resource_type} '{name}' with {} properties",
            properties.len()
        );

        self.resources.insert(
            name.clone(),
            ResourceDecl {
                name: name.clone(),
                resource_type: resource_type.to_string(),
                properties,
                depends_on: Vec::new(),
            },
        );

        Ok(ResourceHandle::new(name))
    }

    /// Returns a reference to an output of a declared resource.
    ///
    /// Nothing is resolved until the plan runs.
    #[must_use]
    pub fn property_of(&self, handle: &ResourceHandle, property: &str) -> DeferredValue {
        handle.output(property)
    }

    /// Orders `handle` after `on` without any data flowing between them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedReference`] if either resource is not
    /// declared in this graph.
    pub fn depends_on(
        &mut self,
        handle: &ResourceHandle,
        on: &ResourceHandle,
    ) -> std::result::Result<(), GraphError> {
        if !self.resources.contains_key(on.name()) {
            return Err(GraphError::UnresolvedReference {
                referrer: handle.name().to_string(),
                resource: on.name().to_string(),
            });
        }

        let decl = self.resources.get_mut(handle.name()).ok_or_else(|| {
            GraphError::UnresolvedReference {
                referrer: on.name().to_string(),
                resource: handle.name().to_string(),
            }
        })?;

        if !decl.depends_on.iter().any(|d| d == on.name()) {
            decl.depends_on.push(on.name().to_string());
        }
        Ok(())
    }

    /// Records a named output.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if the name is already
    /// exported.
    pub fn export(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        secret: bool,
    ) -> std::result::Result<(), GraphError> {
        let name = name.into();
        if self.exports.contains_key(&name) {
            return Err(GraphError::DuplicateOutput { name });
        }

        self.exports.insert(
            name.clone(),
            OutputDecl {
                name,
                value: value.into(),
                secret,
            },
        );
        Ok(())
    }

    /// Orders the declared resources into an execution plan.
    ///
    /// Ties are broken by declaration order, so the same declarations always
    /// produce the same plan.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedReference`] if a reference names an
    /// undeclared resource and [`GraphError::Cycle`] if the references form
    /// a cycle.
    pub fn build_plan(&self) -> std::result::Result<ExecutionPlan, GraphError> {
        let plan = self.assemble_plan()?;
        info!(
            "Built plan with {} resources ({})",
            plan.len(),
            plan.short_fingerprint()
        );
        Ok(plan)
    }

    /// Checks references, orders the resources, and fingerprints the result.
    fn assemble_plan(&self) -> std::result::Result<ExecutionPlan, GraphError> {
        self.check_references()?;
        let order = self.topological_order()?;

        let steps: Vec<PlannedStep> = order
            .into_iter()
            .filter_map(|idx| self.resources.get_index(idx))
            .map(|(_, decl)| PlannedStep {
                name: decl.name.clone(),
                resource_type: decl.resource_type.clone(),
                properties: decl.properties.clone(),
                dependencies: decl.dependencies().into_iter().map(str::to_string).collect(),
            })
            .collect();

        let outputs = self
            .exports
            .values()
            .map(|o| PlannedOutput {
                name: o.name.clone(),
                value: o.value.clone(),
                secret: o.secret,
            })
            .collect();

        Ok(ExecutionPlan::new(self.schema.name(), steps, outputs))
    }

    /// Materializes every resource in plan order and resolves the outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan was not built from this graph, if a
    /// reference cannot be satisfied, or if the executor fails. Execution
    /// stops at the first failure.
    pub async fn resolve<E>(&self, plan: &ExecutionPlan, executor: &E) -> Result<StackOutputs>
    where
        E: ResourceExecutor + ?Sized,
    {
        if !self.owns(plan) {
            return Err(StackError::internal(
                "plan was not built from this resource graph",
            ));
        }

        PlanResolver::new(executor, &self.schema).resolve(plan).await
    }

    /// Returns true if the plan matches what this graph plans right now.
    ///
    /// Declarations, dependencies, and exports added after the plan was built
    /// change the fingerprint.
    fn owns(&self, plan: &ExecutionPlan) -> bool {
        plan.provider == self.schema.name()
            && self
                .assemble_plan()
                .is_ok_and(|current| current.fingerprint == plan.fingerprint)
    }

    /// Every deferred value must name a declared resource.
    fn check_references(&self) -> std::result::Result<(), GraphError> {
        for decl in self.resources.values() {
            for dep in decl.dependencies() {
                if !self.resources.contains_key(dep) {
                    return Err(GraphError::UnresolvedReference {
                        referrer: decl.name.clone(),
                        resource: dep.to_string(),
                    });
                }
            }
        }

        for output in self.exports.values() {
            for reference in output.value.references() {
                if !self.resources.contains_key(&reference.resource) {
                    return Err(GraphError::UnresolvedReference {
                        referrer: format!("output '{}'", output.name),
                        resource: reference.resource.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Kahn's algorithm with the ready set ordered by declaration index.
    fn topological_order(&self) -> std::result::Result<Vec<usize>, GraphError> {
        let count = self.resources.len();
        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(count);
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (idx, decl) in self.resources.values().enumerate() {
            let indices: Vec<usize> = decl
                .dependencies()
                .into_iter()
                .filter_map(|name| self.resources.get_index_of(name))
                .collect();
            for &dep in &indices {
                dependents[dep].push(idx);
            }
            deps.push(indices);
        }

        let mut pending: Vec<usize> = deps.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < count {
            return Err(GraphError::Cycle {
                cycle: self.find_cycle(&deps, &pending),
            });
        }

        Ok(order)
    }

    /// Walks unfinished dependencies from the first stuck resource until a
    /// resource repeats. Every stuck resource has at least one stuck
    /// dependency, so the walk always closes.
    fn find_cycle(&self, deps: &[Vec<usize>], pending: &[usize]) -> Vec<String> {
        let Some(start) = (0..pending.len()).find(|&i| pending[i] > 0) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(pos) = path.iter().position(|&i| i == current) {
                return path[pos..]
                    .iter()
                    .filter_map(|&i| self.resources.get_index(i))
                    .map(|(name, _)| name.clone())
                    .collect();
            }
            path.push(current);

            match deps[current].iter().copied().find(|&d| pending[d] > 0) {
                Some(next) => current = next,
                None => return Vec::new(),
            }
        }
    }
}
