use crate::models::{DependencyKey, InstallerDescriptor, PackageManifest, Version};

/// One package chosen by resolution, ready to hand to an installer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPackageUnit {
    pub manifest: PackageManifest,
    pub version: Version,
    pub installer: InstallerDescriptor,
    pub installed_version: Option<Version>,
}

impl ResolvedPackageUnit {
    pub fn package_id(&self) -> &str {
        &self.manifest.id
    }

    pub fn key(&self) -> DependencyKey {
        crate::models::Dependency::package(self.manifest.id.clone()).key()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum UnitOutcomeKind {
    Succeeded,
    AlreadyInstalled,
    NoApplicableUpgrade,
    Failed,
    Cancelled,
    SkippedDependencyFailed,
}

impl UnitOutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::AlreadyInstalled => "already_installed",
            Self::NoApplicableUpgrade => "no_applicable_upgrade",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::SkippedDependencyFailed => "skipped_dependency_failed",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnitOutcome {
    Succeeded,
    AlreadyInstalled,
    NoApplicableUpgrade,
    /// Installer exit code or collaborator-specific failure code.
    Failed(i32),
    Cancelled,
    SkippedDependencyFailed,
}

impl UnitOutcome {
    pub fn kind(&self) -> UnitOutcomeKind {
        match self {
            Self::Succeeded => UnitOutcomeKind::Succeeded,
            Self::AlreadyInstalled => UnitOutcomeKind::AlreadyInstalled,
            Self::NoApplicableUpgrade => UnitOutcomeKind::NoApplicableUpgrade,
            Self::Failed(_) => UnitOutcomeKind::Failed,
            Self::Cancelled => UnitOutcomeKind::Cancelled,
            Self::SkippedDependencyFailed => UnitOutcomeKind::SkippedDependencyFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}
