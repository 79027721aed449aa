pub mod architecture;
pub mod comparators;
pub mod filters;
pub mod locale;

use std::cmp::Ordering;
use std::sync::Arc;

pub use architecture::{ArchitectureRanking, applicable_architectures};
pub use comparators::Comparator;
pub use filters::{ApplicabilityFilter, PORTABLE_MIN_OS_VERSION};
pub use locale::{Bcp47Distance, COMPATIBLE_MATCH, LocaleDistance, PERFECT_MATCH, UNKNOWN_SCORE};

use crate::config::ResolutionConfig;
use crate::models::{
    Architecture, CoreError, CoreErrorKind, InapplicabilityFlags, InstallScope,
    InstallerDescriptor, InstallerType, InstalledMetadata, PackageManifest,
};

pub type SelectionResult<T> = Result<T, CoreError>;

/// Per-request selection inputs; explicit values override configured settings.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectionRequest {
    pub scope: Option<InstallScope>,
    pub locale: Option<String>,
    pub architecture: Option<Architecture>,
    pub installer_type: Option<InstallerType>,
    /// Accept installers with undeclared scope alongside the required one.
    pub allow_unknown_scope: bool,
    /// Metadata of the currently installed version, when upgrading.
    pub installed: Option<InstalledMetadata>,
}

impl SelectionRequest {
    pub fn for_installed(installed: InstalledMetadata) -> Self {
        Self {
            installed: Some(installed),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstallerSelection {
    pub installer: Option<InstallerDescriptor>,
    /// Flags of every rejected installer, in manifest order.
    pub inapplicabilities: Vec<InapplicabilityFlags>,
    /// Set when the installer was chosen after relaxing the installed-type constraint.
    pub installed_type_fallback: bool,
}

impl InstallerSelection {
    /// Every installer was rejected, and only for its installed type.
    pub fn only_installed_type_mismatch(&self) -> bool {
        self.installer.is_none()
            && !self.inapplicabilities.is_empty()
            && self
                .inapplicabilities
                .iter()
                .all(|flags| *flags == InapplicabilityFlags::INSTALLED_TYPE)
    }

    /// The most diagnostic rejection across all installers.
    pub fn primary_reason(&self) -> Option<InapplicabilityFlags> {
        let combined = self
            .inapplicabilities
            .iter()
            .fold(InapplicabilityFlags::empty(), |acc, flags| acc | *flags);
        combined.primary()
    }

    pub fn require(self, package_id: &str) -> SelectionResult<InstallerDescriptor> {
        let reason = self
            .primary_reason()
            .map_or("no installers", InapplicabilityFlags::label);
        self.installer.ok_or_else(|| {
            CoreError::for_package(
                CoreErrorKind::NoApplicableInstaller,
                package_id,
                format!("no applicable installer found ({reason})"),
            )
        })
    }
}

#[derive(Clone)]
struct SelectionChain {
    filters: Vec<ApplicabilityFilter>,
    comparators: Vec<Comparator>,
}

/// Picks the preferred installer of a manifest under one configuration.
#[derive(Clone)]
pub struct InstallerSelector {
    strict: SelectionChain,
    /// Same chain without installed-type constraints, when fallback is allowed.
    relaxed: Option<SelectionChain>,
}

impl InstallerSelector {
    pub fn new(
        config: &ResolutionConfig,
        request: &SelectionRequest,
        distance: Arc<dyn LocaleDistance>,
    ) -> Self {
        let installed_type = request
            .installed
            .as_ref()
            .map(|installed| installed.installer_type)
            .filter(|installer_type| *installer_type != InstallerType::Unknown);

        let strict = build_chain(config, request, &distance, true);
        let relaxed = (config.allow_installed_type_fallback && installed_type.is_some())
            .then(|| build_chain(config, request, &distance, false));

        Self { strict, relaxed }
    }

    pub fn select(&self, manifest: &PackageManifest) -> InstallerSelection {
        let selection = run_chain(&self.strict, manifest);
        let Some(relaxed) = &self.relaxed else {
            return selection;
        };
        if !selection.only_installed_type_mismatch() {
            return selection;
        }

        tracing::warn!(
            package = %manifest.id,
            version = %manifest.version,
            "no installer matches the installed type; retrying without installed type constraint"
        );
        let mut fallback = run_chain(relaxed, manifest);
        fallback.installed_type_fallback = fallback.installer.is_some();
        fallback
    }

    /// Whether `first` would replace `second` as the current best.
    pub fn is_first_better(&self, first: &InstallerDescriptor, second: &InstallerDescriptor) -> bool {
        first_deciding(&self.strict.comparators, first, second)
            .is_some_and(|(_, ordering)| ordering == Ordering::Greater)
    }

    pub fn is_applicable(&self, installer: &InstallerDescriptor) -> InapplicabilityFlags {
        evaluate_filters(&self.strict.filters, installer)
    }
}

/// Selects with the default locale distance.
pub fn select_installer(
    manifest: &PackageManifest,
    config: &ResolutionConfig,
    request: &SelectionRequest,
) -> InstallerSelection {
    InstallerSelector::new(config, request, Arc::new(Bcp47Distance)).select(manifest)
}

fn build_chain(
    config: &ResolutionConfig,
    request: &SelectionRequest,
    distance: &Arc<dyn LocaleDistance>,
    include_installed_type: bool,
) -> SelectionChain {
    let preferences = &config.preferences;
    let installed = request.installed.as_ref();
    let mut filters = vec![ApplicabilityFilter::OsVersion {
        os_version: config.system.os_version.clone(),
    }];
    let mut comparators = Vec::new();

    if let Some(installed) = installed {
        if installed.scope != InstallScope::Unknown {
            filters.push(ApplicabilityFilter::InstalledScope {
                installed: installed.scope,
            });
        }
        if let Some(locale) = installed.locale.as_ref().filter(|locale| !locale.is_empty()) {
            filters.push(ApplicabilityFilter::InstalledLocale {
                installed: locale.clone(),
                distance: Arc::clone(distance),
            });
        }
        if include_installed_type && installed.installer_type != InstallerType::Unknown {
            filters.push(ApplicabilityFilter::InstalledType {
                installed: installed.installer_type,
            });
            comparators.push(Comparator::InstalledType {
                installed: installed.installer_type,
            });
        }
    }

    if let Some(market) = &config.system.market {
        filters.push(ApplicabilityFilter::Market {
            market: market.clone(),
        });
    }

    let scope_requirement = request.scope.unwrap_or(preferences.scope_requirement);
    if scope_requirement != InstallScope::Unknown {
        filters.push(ApplicabilityFilter::RequestedScope {
            requirement: scope_requirement,
            allow_unknown: request.allow_unknown_scope,
        });
    }
    let scope_preference = if request.allow_unknown_scope && scope_requirement != InstallScope::Unknown {
        scope_requirement
    } else {
        preferences.scope_preference
    };
    if scope_preference != InstallScope::Unknown {
        comparators.push(Comparator::Scope {
            preference: scope_preference,
        });
    }

    let installed_locale = installed
        .and_then(|installed| installed.locale.clone())
        .filter(|locale| !locale.is_empty());
    let locale_requirement = match (&request.locale, &installed_locale) {
        (Some(requested), _) => vec![requested.clone()],
        (None, Some(_)) => Vec::new(),
        (None, None) => preferences.locale_requirement.clone(),
    };
    if !locale_requirement.is_empty() {
        filters.push(ApplicabilityFilter::RequestedLocale {
            requirement: locale_requirement,
            distance: Arc::clone(distance),
        });
    }
    let locale_preference = match installed_locale {
        Some(locale) => vec![locale],
        None => preferences.locale_preference.clone(),
    };
    if !locale_preference.is_empty() {
        comparators.push(Comparator::Locale {
            preference: locale_preference,
            distance: Arc::clone(distance),
        });
    }

    let ranking = match request.architecture {
        Some(architecture) => {
            ArchitectureRanking::with_allowed(config.system.architecture, &[architecture])
        }
        None => ArchitectureRanking::with_allowed(
            config.system.architecture,
            &preferences.allowed_architectures,
        ),
    };
    filters.push(ApplicabilityFilter::Architecture {
        ranking: ranking.clone(),
    });
    comparators.push(Comparator::Architecture { ranking });

    let (type_requirement, type_preference) = match request.installer_type {
        Some(requested) => (vec![requested], Vec::new()),
        None => (
            preferences.installer_type_requirement.clone(),
            preferences.installer_type_preference.clone(),
        ),
    };
    if !type_requirement.is_empty() {
        filters.push(ApplicabilityFilter::InstallerType {
            requirement: type_requirement,
        });
    }
    if !type_preference.is_empty() {
        comparators.push(Comparator::InstallerType {
            preference: type_preference,
        });
    }

    SelectionChain {
        filters,
        comparators,
    }
}

fn evaluate_filters(
    filters: &[ApplicabilityFilter],
    installer: &InstallerDescriptor,
) -> InapplicabilityFlags {
    let mut flags = InapplicabilityFlags::empty();
    for filter in filters {
        let rejected = filter.inapplicability(installer);
        if !rejected.is_empty() {
            tracing::debug!(
                installer = %installer,
                filter = filter.name(),
                reason = %filter.explain(installer),
                "installer not applicable"
            );
            flags |= rejected;
        }
    }
    flags
}

/// The first comparator with an opinion decides; lower ones are never consulted.
fn first_deciding<'a>(
    comparators: &'a [Comparator],
    first: &InstallerDescriptor,
    second: &InstallerDescriptor,
) -> Option<(&'a Comparator, Ordering)> {
    comparators.iter().find_map(|comparator| {
        match comparator.compare(first, second) {
            Ordering::Equal => None,
            decided => Some((comparator, decided)),
        }
    })
}

fn run_chain(chain: &SelectionChain, manifest: &PackageManifest) -> InstallerSelection {
    let mut best: Option<&InstallerDescriptor> = None;
    let mut inapplicabilities = Vec::new();

    for installer in &manifest.installers {
        let flags = evaluate_filters(&chain.filters, installer);
        if !flags.is_empty() {
            inapplicabilities.push(flags);
            continue;
        }

        let Some(current) = best else {
            tracing::debug!(installer = %installer, "installer is current best choice");
            best = Some(installer);
            continue;
        };

        match first_deciding(&chain.comparators, installer, current) {
            Some((comparator, Ordering::Greater)) => {
                tracing::debug!(
                    installer = %installer,
                    replaced = %current,
                    comparator = comparator.name(),
                    "installer is current best choice"
                );
                best = Some(installer);
            }
            Some(_) => {}
            None => {
                tracing::debug!(
                    installer = %installer,
                    kept = %current,
                    "installers are equivalent in priority; keeping the earlier one"
                );
            }
        }
    }

    InstallerSelection {
        installer: best.cloned(),
        inapplicabilities,
        installed_type_fallback: false,
    }
}
