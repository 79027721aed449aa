use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::{InstallScope, InstallerDescriptor, InstallerType};
use crate::selection::architecture::ArchitectureRanking;
use crate::selection::locale::{COMPATIBLE_MATCH, LocaleDistance, UNKNOWN_SCORE};

/// Pairwise preference between two eligible installers.
///
/// `compare(a, b)` returns `Greater` when `a` is preferred, `Less` when `b`
/// is preferred and `Equal` when this comparator has no opinion.
#[derive(Clone)]
pub enum Comparator {
    /// Exact match with the installed technology beats a compatible one.
    InstalledType {
        installed: InstallerType,
    },
    Scope {
        preference: InstallScope,
    },
    Locale {
        preference: Vec<String>,
        distance: Arc<dyn LocaleDistance>,
    },
    Architecture {
        ranking: ArchitectureRanking,
    },
    InstallerType {
        preference: Vec<InstallerType>,
    },
}

impl Comparator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InstalledType { .. } => "installed_type",
            Self::Scope { .. } => "scope",
            Self::Locale { .. } => "locale",
            Self::Architecture { .. } => "machine_architecture",
            Self::InstallerType { .. } => "installer_type",
        }
    }

    pub fn compare(&self, first: &InstallerDescriptor, second: &InstallerDescriptor) -> Ordering {
        match self {
            Self::InstalledType { installed } => {
                let first_exact = first.installer_type == *installed;
                let second_exact = second.installer_type == *installed;
                first_exact.cmp(&second_exact)
            }
            Self::Scope { preference } => {
                if *preference == InstallScope::Unknown {
                    return Ordering::Equal;
                }
                (first.scope == *preference).cmp(&(second.scope == *preference))
            }
            Self::Locale {
                preference,
                distance,
            } => compare_locales(preference, distance.as_ref(), first, second),
            Self::Architecture { ranking } => ranking
                .rank(first.architecture)
                .cmp(&ranking.rank(second.architecture)),
            Self::InstallerType { preference } => {
                for preferred in preference {
                    let first_matches = first.installer_type == *preferred;
                    let second_matches = second.installer_type == *preferred;
                    if first_matches || second_matches {
                        return first_matches.cmp(&second_matches);
                    }
                }
                Ordering::Equal
            }
        }
    }

    pub fn is_first_better(&self, first: &InstallerDescriptor, second: &InstallerDescriptor) -> bool {
        self.compare(first, second) == Ordering::Greater
    }
}

fn compare_locales(
    preference: &[String],
    distance: &dyn LocaleDistance,
    first: &InstallerDescriptor,
    second: &InstallerDescriptor,
) -> Ordering {
    let score = |installer: &InstallerDescriptor, preferred: &str| {
        if installer.locale.is_empty() {
            UNKNOWN_SCORE
        } else {
            distance.distance(preferred, &installer.locale)
        }
    };

    for preferred in preference {
        let first_score = score(first, preferred);
        let second_score = score(second, preferred);
        if first_score >= COMPATIBLE_MATCH || second_score >= COMPATIBLE_MATCH {
            return first_score
                .partial_cmp(&second_score)
                .unwrap_or(Ordering::Equal);
        }
    }

    // Neither matches any preference: an undeclared locale may still fit,
    // a declared non-matching one does not.
    first.locale.is_empty().cmp(&second.locale.is_empty())
}
