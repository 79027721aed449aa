pub mod graph;
pub mod node;

use std::collections::HashMap;
use std::sync::Arc;

pub use graph::{DependencyGraph, DependencyGraphNode, InstallationPlan, VisitState};
pub use node::{DependencyNodeResolver, NodeOutcome, NodeResolution};

use crate::catalog::Catalog;
use crate::config::ResolutionConfig;
use crate::models::{
    CoreError, CoreErrorKind, Dependency, DependencyKey, DependencyList, ResolvedPackageUnit,
};
use crate::pinning::PinEvaluator;
use crate::selection::Bcp47Distance;

pub type ResolutionResult<T> = Result<T, CoreError>;

/// Result of one resolution pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedOrder {
    pub plan: InstallationPlan,
    /// Units to install, in plan order. Satisfied dependencies are absent.
    pub units: Vec<ResolvedPackageUnit>,
    /// Dependencies already satisfied by an installed version.
    pub skipped: Vec<Dependency>,
}

impl ResolvedOrder {
    pub fn has_cycle(&self) -> bool {
        self.plan.has_cycle
    }
}

/// Resolves and orders `root_dependencies` with the default locale distance.
pub fn resolve_dependencies(
    catalog: Arc<dyn Catalog>,
    config: ResolutionConfig,
    pins: Arc<dyn PinEvaluator>,
    root: Dependency,
    root_dependencies: &DependencyList,
) -> ResolutionResult<ResolvedOrder> {
    DependencyResolver::with_defaults(catalog, config, pins).resolve(root, root_dependencies)
}

/// Expands dependencies through the catalog and orders them for installation.
pub struct DependencyResolver {
    node_resolver: DependencyNodeResolver,
}

impl DependencyResolver {
    pub fn new(node_resolver: DependencyNodeResolver) -> Self {
        Self { node_resolver }
    }

    pub fn with_defaults(
        catalog: Arc<dyn Catalog>,
        config: ResolutionConfig,
        pins: Arc<dyn PinEvaluator>,
    ) -> Self {
        Self::new(DependencyNodeResolver::new(
            catalog,
            config,
            pins,
            Arc::new(Bcp47Distance),
        ))
    }

    pub fn node_resolver(&self) -> &DependencyNodeResolver {
        &self.node_resolver
    }

    /// Resolves everything `root_dependencies` needs. The root itself is the
    /// last entry of the plan but contributes no unit.
    pub fn resolve(
        &self,
        root: Dependency,
        root_dependencies: &DependencyList,
    ) -> ResolutionResult<ResolvedOrder> {
        self.resolve_from(root, root_dependencies, None)
    }

    /// Resolves `root` through the catalog and then its dependencies; the
    /// root's own unit, if any, comes last.
    pub fn resolve_package(&self, root: &Dependency) -> ResolutionResult<ResolvedOrder> {
        let resolution = self.node_resolver.evaluate(root)?;
        let dependencies = resolution.dependencies.clone();
        self.resolve_from(root.clone(), &dependencies, Some(resolution))
    }

    fn resolve_from(
        &self,
        root: Dependency,
        root_dependencies: &DependencyList,
        root_resolution: Option<NodeResolution>,
    ) -> ResolutionResult<ResolvedOrder> {
        let root_key = root.key();
        let mut resolutions: HashMap<DependencyKey, NodeResolution> = HashMap::new();
        let graph = DependencyGraph::build(root, root_dependencies, |dependency| {
            let resolution = self.node_resolver.evaluate(dependency)?;
            let dependencies = resolution.dependencies.clone();
            resolutions.insert(dependency.key(), resolution);
            Ok(dependencies)
        })?;
        if let Some(resolution) = root_resolution {
            resolutions.insert(root_key, resolution);
        }
        check_memoized_minimums(&graph, &resolutions)?;

        let plan = graph.installation_plan();
        if plan.has_cycle {
            tracing::warn!(
                cycles = plan.cycle_edges.len(),
                "dependency graph contains cycles; continuing with acyclic edges"
            );
        }

        let mut units = Vec::new();
        let mut skipped = Vec::new();
        for dependency in &plan.order {
            let Some(resolution) = resolutions.remove(&dependency.key()) else {
                continue;
            };
            match (resolution.outcome, resolution.unit) {
                (NodeOutcome::Success, Some(unit)) => units.push(unit),
                _ => skipped.push(dependency.clone()),
            }
        }

        Ok(ResolvedOrder {
            plan,
            units,
            skipped,
        })
    }
}

/// Each package is resolved once, for the first edge that reached it. Later
/// edges may ask for a higher minimum; the version already chosen must meet
/// it too.
fn check_memoized_minimums(
    graph: &DependencyGraph,
    resolutions: &HashMap<DependencyKey, NodeResolution>,
) -> ResolutionResult<()> {
    for (parent, child) in graph.edges() {
        let Some(version) = resolutions
            .get(&child.key())
            .and_then(NodeResolution::version)
        else {
            continue;
        };
        if child.is_satisfied_by(version) {
            continue;
        }

        tracing::error!(
            package = %child.id,
            parent = %parent.id,
            version = %version,
            required = %child,
            "resolved version is below a later minimum"
        );
        return Err(CoreError::for_package(
            CoreErrorKind::NoApplicableVersion,
            child.id.clone(),
            format!(
                "'{}' resolved to version {version}, but '{}' requires {child}",
                child.id, parent.id
            ),
        ));
    }
    Ok(())
}
