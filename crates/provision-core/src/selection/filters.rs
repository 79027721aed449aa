use std::sync::Arc;

use crate::models::{
    InapplicabilityFlags, InstallScope, InstallerDescriptor, InstallerType, Version,
};
use crate::selection::architecture::ArchitectureRanking;
use crate::selection::locale::{LocaleDistance, PERFECT_MATCH};

/// Portable installs need unvirtualized resources, available from this build on.
pub const PORTABLE_MIN_OS_VERSION: &str = "10.0.18362";

/// One eligibility predicate. Filters are independent of each other and of
/// the other candidates; an installer is eligible when none rejects it.
#[derive(Clone)]
pub enum ApplicabilityFilter {
    OsVersion {
        os_version: Version,
    },
    InstalledScope {
        installed: InstallScope,
    },
    InstalledLocale {
        installed: String,
        distance: Arc<dyn LocaleDistance>,
    },
    InstalledType {
        installed: InstallerType,
    },
    Market {
        market: String,
    },
    RequestedScope {
        requirement: InstallScope,
        allow_unknown: bool,
    },
    RequestedLocale {
        requirement: Vec<String>,
        distance: Arc<dyn LocaleDistance>,
    },
    InstallerType {
        requirement: Vec<InstallerType>,
    },
    Architecture {
        ranking: ArchitectureRanking,
    },
}

impl ApplicabilityFilter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OsVersion { .. } => "os_version",
            Self::InstalledScope { .. } => "installed_scope",
            Self::InstalledLocale { .. } => "installed_locale",
            Self::InstalledType { .. } => "installed_type",
            Self::Market { .. } => "market",
            Self::RequestedScope { .. } => "scope",
            Self::RequestedLocale { .. } => "locale",
            Self::InstallerType { .. } => "installer_type",
            Self::Architecture { .. } => "machine_architecture",
        }
    }

    /// The flag this filter reports; empty when the installer passes.
    pub fn inapplicability(&self, installer: &InstallerDescriptor) -> InapplicabilityFlags {
        if self.is_applicable(installer) {
            return InapplicabilityFlags::empty();
        }
        match self {
            Self::OsVersion { .. } => InapplicabilityFlags::OS_VERSION,
            Self::InstalledScope { .. } => InapplicabilityFlags::INSTALLED_SCOPE,
            Self::InstalledLocale { .. } => InapplicabilityFlags::INSTALLED_LOCALE,
            Self::InstalledType { .. } => InapplicabilityFlags::INSTALLED_TYPE,
            Self::Market { .. } => InapplicabilityFlags::MARKET,
            Self::RequestedScope { .. } => InapplicabilityFlags::SCOPE,
            Self::RequestedLocale { .. } => InapplicabilityFlags::LOCALE,
            Self::InstallerType { .. } => InapplicabilityFlags::INSTALLER_TYPE,
            Self::Architecture { .. } => InapplicabilityFlags::MACHINE_ARCHITECTURE,
        }
    }

    pub fn is_applicable(&self, installer: &InstallerDescriptor) -> bool {
        match self {
            Self::OsVersion { os_version } => {
                let meets_minimum = installer
                    .min_os_version
                    .as_ref()
                    .is_none_or(|minimum| minimum.is_unknown() || os_version >= minimum);
                let portable_supported = installer.installer_type != InstallerType::Portable
                    || *os_version >= Version::new(PORTABLE_MIN_OS_VERSION);
                meets_minimum && portable_supported
            }
            // Unknown installer scope must stay compatible or legacy manifests could never upgrade.
            Self::InstalledScope { installed } => {
                installer.effective_scope() == InstallScope::Unknown
                    || installer.scope == *installed
            }
            Self::InstalledLocale {
                installed,
                distance,
            } => {
                installer.locale.is_empty()
                    || distance.distance(installed, &installer.locale) >= PERFECT_MATCH
            }
            Self::InstalledType { installed } => installer.can_upgrade_installed(*installed),
            Self::Market { market } => installer.markets.permits(market),
            Self::RequestedScope {
                requirement,
                allow_unknown,
            } => {
                *requirement == InstallScope::Unknown
                    || installer.scope == *requirement
                    || installer.installer_type.ignores_manifest_scope()
                    || (*allow_unknown && installer.scope == InstallScope::Unknown)
            }
            Self::RequestedLocale {
                requirement,
                distance,
            } => {
                requirement.is_empty()
                    || requirement.iter().any(|required| {
                        distance.distance(required, &installer.locale) >= PERFECT_MATCH
                    })
            }
            Self::InstallerType { requirement } => {
                requirement.is_empty() || requirement.contains(&installer.installer_type)
            }
            Self::Architecture { ranking } => {
                ranking.rank(installer.architecture).is_some()
                    && !installer
                        .unsupported_os_architectures
                        .contains(&ranking.machine())
            }
        }
    }

    /// Human readable reason this filter rejects `installer`.
    pub fn explain(&self, installer: &InstallerDescriptor) -> String {
        match self {
            Self::OsVersion { os_version } => match &installer.min_os_version {
                Some(minimum) if os_version < minimum => {
                    format!("current OS {os_version} is lower than MinOSVersion {minimum}")
                }
                _ => format!(
                    "current OS {os_version} is lower than {PORTABLE_MIN_OS_VERSION} required for portable installs"
                ),
            },
            Self::InstalledScope { installed } => format!(
                "installer scope does not match currently installed scope: {} != {}",
                installer.scope.as_str(),
                installed.as_str()
            ),
            Self::InstalledLocale { installed, .. } => format!(
                "installer locale '{}' does not match installed locale '{installed}'",
                installer.locale
            ),
            Self::InstalledType { installed } => {
                let mut reason = format!(
                    "installed package type '{}' is not compatible with installer type '{}'",
                    installed.as_str(),
                    installer.installer_type.as_str()
                );
                if !installer.compatible_installed_types.is_empty() {
                    let accepted: Vec<&str> = installer
                        .compatible_installed_types
                        .iter()
                        .map(|kind| kind.as_str())
                        .collect();
                    reason.push_str(&format!(", or with accepted type(s) {}", accepted.join(" ")));
                }
                reason
            }
            Self::Market { market } => format!(
                "current market '{market}' does not match installer markets; allowed: [{}] excluded: [{}]",
                installer.markets.allowed.join(", "),
                installer.markets.excluded.join(", ")
            ),
            Self::RequestedScope { requirement, .. } => format!(
                "installer scope does not match required scope: {} != {}",
                installer.scope.as_str(),
                requirement.as_str()
            ),
            Self::RequestedLocale { requirement, .. } => format!(
                "installer locale '{}' does not match required locales [{}]",
                installer.locale,
                requirement.join(", ")
            ),
            Self::InstallerType { requirement } => {
                let required: Vec<&str> = requirement.iter().map(|kind| kind.as_str()).collect();
                format!(
                    "installer type '{}' does not match required installer types [{}]",
                    installer.installer_type.as_str(),
                    required.join(", ")
                )
            }
            Self::Architecture { ranking } => {
                if installer
                    .unsupported_os_architectures
                    .contains(&ranking.machine())
                {
                    "system architecture is unsupported by installer".to_string()
                } else {
                    format!(
                        "architecture '{}' is not applicable to this machine or was excluded",
                        installer.architecture.as_str()
                    )
                }
            }
        }
    }
}
