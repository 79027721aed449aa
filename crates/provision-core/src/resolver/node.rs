use std::sync::Arc;

use crate::catalog::{Catalog, CatalogPackage};
use crate::config::ResolutionConfig;
use crate::models::{
    CoreError, CoreErrorKind, Dependency, DependencyKind, DependencyList, ResolvedPackageUnit,
    Version,
};
use crate::pinning::PinEvaluator;
use crate::resolver::ResolutionResult;
use crate::selection::{InstallerSelector, LocaleDistance, SelectionRequest};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeOutcome {
    /// A version was chosen and its dependencies need resolving.
    Success,
    /// An installed version already satisfies the dependency.
    Skipped,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeResolution {
    pub outcome: NodeOutcome,
    /// Next layer of dependencies; empty when skipped.
    pub dependencies: DependencyList,
    pub unit: Option<ResolvedPackageUnit>,
    /// Installed version that made the node a skip.
    pub installed_version: Option<Version>,
}

impl NodeResolution {
    fn skipped(installed_version: Version) -> Self {
        Self {
            outcome: NodeOutcome::Skipped,
            dependencies: DependencyList::new(),
            unit: None,
            installed_version: Some(installed_version),
        }
    }

    /// Version that ends up on the machine: the selected one, or the
    /// installed one when the node was skipped.
    pub fn version(&self) -> Option<&Version> {
        match &self.unit {
            Some(unit) => Some(&unit.version),
            None => self.installed_version.as_ref(),
        }
    }
}

/// Picks the version and installer of a single package dependency.
pub struct DependencyNodeResolver {
    catalog: Arc<dyn Catalog>,
    config: ResolutionConfig,
    pins: Arc<dyn PinEvaluator>,
    locale_distance: Arc<dyn LocaleDistance>,
}

impl DependencyNodeResolver {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        config: ResolutionConfig,
        pins: Arc<dyn PinEvaluator>,
        locale_distance: Arc<dyn LocaleDistance>,
    ) -> Self {
        Self {
            catalog,
            config,
            pins,
            locale_distance,
        }
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    pub fn evaluate(&self, dependency: &Dependency) -> ResolutionResult<NodeResolution> {
        if dependency.kind != DependencyKind::Package {
            return Err(CoreError::for_package(
                CoreErrorKind::InvalidInput,
                dependency.id.clone(),
                format!(
                    "only package dependencies can be resolved, got '{}'",
                    dependency.kind.as_str()
                ),
            ));
        }

        let package = self.find_single(dependency)?;
        let installed = package.installed();

        if let Some(installed) = &installed
            && dependency.is_satisfied_by(&installed.version)
        {
            tracing::info!(
                package = %dependency.id,
                installed_version = %installed.version,
                "dependency already satisfied by installed version"
            );
            return Ok(NodeResolution::skipped(installed.version.clone()));
        }

        let request = installed
            .clone()
            .map(SelectionRequest::for_installed)
            .unwrap_or_default();
        let selector =
            InstallerSelector::new(&self.config, &request, Arc::clone(&self.locale_distance));

        for version_key in package.available_versions() {
            let pin_state = self.pins.evaluate(package.id(), &version_key.version);
            if !self.config.pin_behavior.permits(pin_state) {
                tracing::warn!(
                    package = %dependency.id,
                    version = %version_key.version,
                    pin = pin_state.as_str(),
                    "skipping pinned version"
                );
                continue;
            }

            if !dependency.is_satisfied_by(&version_key.version) {
                tracing::debug!(
                    package = %dependency.id,
                    version = %version_key.version,
                    "remaining versions are below the required minimum"
                );
                break;
            }

            let mut manifest = package
                .manifest_for(&version_key)
                .map_err(|error| error.attributed_to(&dependency.id))?;
            manifest.apply_locale(&self.config.preferences.locale_preference);

            let selection = selector.select(&manifest);
            let Some(installer) = selection.installer else {
                tracing::debug!(
                    package = %dependency.id,
                    version = %version_key.version,
                    reason = selection
                        .primary_reason()
                        .map_or("no installers", |flags| flags.label()),
                    "no applicable installer for version"
                );
                continue;
            };

            tracing::info!(
                package = %dependency.id,
                version = %version_key.version,
                installer = %installer,
                "selected dependency version"
            );
            let dependencies = manifest.dependencies_for(&installer);
            let installed_version = installed.map(|installed| installed.version);
            return Ok(NodeResolution {
                outcome: NodeOutcome::Success,
                dependencies,
                unit: Some(ResolvedPackageUnit {
                    version: version_key.version,
                    installed_version: installed_version.clone(),
                    installer,
                    manifest,
                }),
                installed_version,
            });
        }

        Err(CoreError::for_package(
            CoreErrorKind::NoApplicableVersion,
            dependency.id.clone(),
            format!("no applicable version found for dependency {dependency}"),
        ))
    }

    fn find_single(&self, dependency: &Dependency) -> ResolutionResult<Arc<dyn CatalogPackage>> {
        let mut matches = self
            .catalog
            .search(&dependency.id)
            .map_err(|error| error.attributed_to(&dependency.id))?;

        match matches.len() {
            0 => Err(CoreError::for_package(
                CoreErrorKind::MissingDependency,
                dependency.id.clone(),
                format!("dependency '{}' was not found in any source", dependency.id),
            )),
            1 => Ok(matches.remove(0)),
            _ => {
                let sources: Vec<&str> = matches.iter().map(|package| package.source()).collect();
                Err(CoreError::for_package(
                    CoreErrorKind::AmbiguousDependency,
                    dependency.id.clone(),
                    format!(
                        "dependency '{}' matched multiple packages in sources [{}]",
                        dependency.id,
                        sources.join(", ")
                    ),
                ))
            }
        }
    }
}
