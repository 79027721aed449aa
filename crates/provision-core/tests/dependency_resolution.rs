use std::sync::Arc;

use provision_core::catalog::InMemoryCatalog;
use provision_core::config::ResolutionConfig;
use provision_core::models::{
    Architecture, CoreErrorKind, Dependency, DependencyKind, DependencyList, InstallScope,
    InstalledMetadata, InstallerDescriptor, InstallerType, PackageManifest, PinBehavior,
    PinKind, PinRecord, PinState, Version,
};
use provision_core::pinning::{NoPins, PinEvaluator, RecordPinEvaluator};
use provision_core::resolver::{DependencyNodeResolver, NodeOutcome};
use provision_core::selection::Bcp47Distance;

/// Pins exactly one version of one package.
struct PinnedVersion {
    package_id: &'static str,
    version: Version,
    state: PinState,
}

impl PinEvaluator for PinnedVersion {
    fn evaluate(&self, package_id: &str, version: &Version) -> PinState {
        if package_id.eq_ignore_ascii_case(self.package_id) && *version == self.version {
            self.state
        } else {
            PinState::Unpinned
        }
    }
}

fn x64_manifest(id: &str, version: &str) -> PackageManifest {
    PackageManifest::single_installer(
        id,
        version,
        Architecture::X64,
        InstallerType::Exe,
        InstallScope::Machine,
    )
}

fn config() -> ResolutionConfig {
    ResolutionConfig::for_system("10.0.22631.0", Architecture::X64)
}

fn resolver(
    catalog: InMemoryCatalog,
    config: ResolutionConfig,
    pins: Arc<dyn PinEvaluator>,
) -> DependencyNodeResolver {
    DependencyNodeResolver::new(Arc::new(catalog), config, pins, Arc::new(Bcp47Distance))
}

fn catalog_with_b_versions() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    for version in ["1.0", "3.0", "2.5"] {
        catalog.add_manifest(x64_manifest("B", version));
    }
    catalog
}

fn pinned_three() -> Arc<dyn PinEvaluator> {
    Arc::new(PinnedVersion {
        package_id: "B",
        version: Version::new("3.0"),
        state: PinState::PinnedByUser,
    })
}

#[test]
fn newest_unpinned_version_meeting_minimum_is_chosen() {
    let resolver = resolver(catalog_with_b_versions(), config(), pinned_three());

    let resolution = resolver
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .expect("dependency should resolve");

    assert_eq!(resolution.outcome, NodeOutcome::Success);
    let unit = resolution.unit.expect("resolved unit");
    assert_eq!(unit.version, Version::new("2.5"));
    assert_eq!(unit.package_id(), "B");
    assert_eq!(unit.installed_version, None);
}

#[test]
fn descent_stops_below_minimum() {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest(x64_manifest("B", "1.5"));
    catalog.add_manifest(x64_manifest("B", "1.0"));
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let error = resolver
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::NoApplicableVersion);
    assert_eq!(error.package.as_deref(), Some("B"));
}

#[test]
fn only_pinned_versions_meeting_minimum_yield_no_applicable_version() {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest(x64_manifest("B", "3.0"));
    catalog.add_manifest(x64_manifest("B", "1.0"));
    let resolver = resolver(catalog, config(), pinned_three());

    let error = resolver
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::NoApplicableVersion);
}

#[test]
fn include_pinned_accepts_user_pins_but_not_blocking_ones() {
    let mut include = config();
    include.pin_behavior = PinBehavior::IncludePinned;

    let resolution = resolver(catalog_with_b_versions(), include.clone(), pinned_three())
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .expect("pinned version should be eligible");
    assert_eq!(
        resolution.unit.map(|unit| unit.version),
        Some(Version::new("3.0"))
    );

    let blocking = Arc::new(PinnedVersion {
        package_id: "B",
        version: Version::new("3.0"),
        state: PinState::PinnedBlocking,
    });
    let resolution = resolver(catalog_with_b_versions(), include, blocking)
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .expect("blocking pin skips to the next version");
    assert_eq!(
        resolution.unit.map(|unit| unit.version),
        Some(Version::new("2.5"))
    );
}

#[test]
fn ignore_pins_selects_blocked_versions() {
    let mut ignore = config();
    ignore.pin_behavior = PinBehavior::IgnorePins;
    let pins = Arc::new(RecordPinEvaluator::new([PinRecord::new(
        "b",
        PinKind::Blocking,
    )]));

    let resolution = resolver(catalog_with_b_versions(), ignore, pins)
        .evaluate(&Dependency::package("B"))
        .expect("pins are ignored");

    assert_eq!(
        resolution.unit.map(|unit| unit.version),
        Some(Version::new("3.0"))
    );
}

#[test]
fn gating_pin_limits_versions_to_gated_prefix() {
    let pins = Arc::new(RecordPinEvaluator::new([PinRecord::new(
        "B",
        PinKind::Gating {
            gated_version: Version::new("2"),
        },
    )]));

    let resolution = resolver(catalog_with_b_versions(), config(), pins)
        .evaluate(&Dependency::package("B"))
        .expect("gated version should resolve");

    assert_eq!(
        resolution.unit.map(|unit| unit.version),
        Some(Version::new("2.5"))
    );
}

#[test]
fn satisfied_installed_version_skips_resolution() {
    let mut catalog = catalog_with_b_versions();
    catalog.set_installed("B", InstalledMetadata::new("2.1"));
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let resolution = resolver
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .expect("installed version satisfies");

    assert_eq!(resolution.outcome, NodeOutcome::Skipped);
    assert!(resolution.dependencies.is_empty());
    assert!(resolution.unit.is_none());
}

#[test]
fn outdated_installed_version_constrains_selection() {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest(x64_manifest("B", "3.0"));
    catalog.add_manifest(PackageManifest::single_installer(
        "B",
        "2.5",
        Architecture::X86,
        InstallerType::Exe,
        InstallScope::User,
    ));
    catalog.set_installed(
        "B",
        InstalledMetadata::new("1.0").with_scope(InstallScope::User),
    );
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let resolution = resolver
        .evaluate(&Dependency::package_at_least("B", "2.0"))
        .expect("user scoped version should resolve");

    let unit = resolution.unit.expect("resolved unit");
    assert_eq!(unit.version, Version::new("2.5"));
    assert_eq!(unit.installer.scope, InstallScope::User);
    assert_eq!(unit.installed_version, Some(Version::new("1.0")));
}

#[test]
fn version_without_applicable_installer_falls_through_to_older_version() {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest(PackageManifest::single_installer(
        "B",
        "3.0",
        Architecture::Arm64,
        InstallerType::Exe,
        InstallScope::Machine,
    ));
    catalog.add_manifest(x64_manifest("B", "2.0"));
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let resolution = resolver
        .evaluate(&Dependency::package("B"))
        .expect("older version should resolve");

    assert_eq!(
        resolution.unit.map(|unit| unit.version),
        Some(Version::new("2.0"))
    );
}

#[test]
fn missing_package_names_the_dependency() {
    let resolver = resolver(InMemoryCatalog::new(), config(), Arc::new(NoPins));

    let error = resolver.evaluate(&Dependency::package("Ghost")).unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::MissingDependency);
    assert_eq!(error.package.as_deref(), Some("Ghost"));
}

#[test]
fn package_in_several_sources_is_ambiguous() {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest_from("community", x64_manifest("B", "1.0"));
    catalog.add_manifest_from("store", x64_manifest("B", "1.0"));
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let error = resolver.evaluate(&Dependency::package("B")).unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::AmbiguousDependency);
    assert!(error.message.contains("community"));
    assert!(error.message.contains("store"));
}

#[test]
fn non_package_dependencies_are_rejected() {
    let resolver = resolver(catalog_with_b_versions(), config(), Arc::new(NoPins));

    let error = resolver
        .evaluate(&Dependency::new(
            DependencyKind::WindowsFeature,
            "Microsoft-Hyper-V",
            None,
        ))
        .unwrap_err();

    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
}

#[test]
fn resolution_returns_the_chosen_installer_dependencies() {
    let manifest_level: DependencyList = [Dependency::package("Shared")].into_iter().collect();
    let installer_level: DependencyList = [
        Dependency::package_at_least("Runtime", "6.0"),
        Dependency::new(DependencyKind::WindowsFeature, "NetFx3", None),
    ]
    .into_iter()
    .collect();
    let manifest = PackageManifest::new("B", "1.0")
        .with_dependencies(manifest_level)
        .with_installer(
            InstallerDescriptor::new(Architecture::X64, InstallerType::Msi, InstallScope::Machine)
                .with_dependencies(installer_level.clone()),
        );
    let mut catalog = InMemoryCatalog::new();
    catalog.add_manifest(manifest);
    let resolver = resolver(catalog, config(), Arc::new(NoPins));

    let resolution = resolver
        .evaluate(&Dependency::package("B"))
        .expect("dependency should resolve");

    assert_eq!(resolution.dependencies, installer_level);
}
