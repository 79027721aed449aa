use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::models::{DependencyList, Version};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[default]
    Unknown,
    Neutral,
    X86,
    X64,
    Arm,
    Arm64,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Neutral => "neutral",
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }
}

impl std::str::FromStr for Architecture {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "neutral" => Ok(Self::Neutral),
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallerType {
    #[default]
    Unknown,
    Exe,
    Inno,
    Nullsoft,
    Burn,
    Msi,
    Wix,
    Msix,
    Zip,
    Portable,
    MsStore,
    Font,
}

impl InstallerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Exe => "exe",
            Self::Inno => "inno",
            Self::Nullsoft => "nullsoft",
            Self::Burn => "burn",
            Self::Msi => "msi",
            Self::Wix => "wix",
            Self::Msix => "msix",
            Self::Zip => "zip",
            Self::Portable => "portable",
            Self::MsStore => "ms_store",
            Self::Font => "font",
        }
    }

    /// Whether a package installed with `self` can be upgraded by an installer of `other`.
    pub fn is_compatible_with(self, other: InstallerType) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self.compatibility_family(), other.compatibility_family()),
            (Some(left), Some(right)) if left == right
        )
    }

    /// Installer technologies that decide their own install location.
    pub fn ignores_manifest_scope(self) -> bool {
        matches!(self, Self::Msix | Self::MsStore | Self::Portable)
    }

    fn compatibility_family(self) -> Option<u8> {
        match self {
            Self::Exe | Self::Inno | Self::Nullsoft | Self::Burn => Some(0),
            Self::Msi | Self::Wix => Some(1),
            _ => None,
        }
    }
}

impl std::str::FromStr for InstallerType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "exe" => Ok(Self::Exe),
            "inno" => Ok(Self::Inno),
            "nullsoft" => Ok(Self::Nullsoft),
            "burn" => Ok(Self::Burn),
            "msi" => Ok(Self::Msi),
            "wix" => Ok(Self::Wix),
            "msix" | "appx" => Ok(Self::Msix),
            "zip" => Ok(Self::Zip),
            "portable" => Ok(Self::Portable),
            "ms_store" | "msstore" => Ok(Self::MsStore),
            "font" => Ok(Self::Font),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallScope {
    #[default]
    Unknown,
    User,
    Machine,
}

impl InstallScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::User => "user",
            Self::Machine => "machine",
        }
    }
}

impl std::str::FromStr for InstallScope {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "user" => Ok(Self::User),
            "machine" => Ok(Self::Machine),
            _ => Err(()),
        }
    }
}

/// Region restrictions declared by an installer. An allowed list, when
/// present, takes precedence over the excluded list.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MarketsInfo {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl MarketsInfo {
    pub fn permits(&self, market: &str) -> bool {
        if !self.allowed.is_empty() {
            return self
                .allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(market));
        }
        !self
            .excluded
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(market))
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstallerDescriptor {
    pub architecture: Architecture,
    pub installer_type: InstallerType,
    #[serde(default)]
    pub scope: InstallScope,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub dependencies: DependencyList,
    #[serde(default)]
    pub success_codes: Vec<i32>,
    #[serde(default)]
    pub markets: MarketsInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_os_version: Option<Version>,
    #[serde(default)]
    pub unsupported_os_architectures: Vec<Architecture>,
    /// Installed technologies this installer is known to upgrade in place.
    #[serde(default)]
    pub compatible_installed_types: Vec<InstallerType>,
}

impl InstallerDescriptor {
    pub fn new(architecture: Architecture, installer_type: InstallerType, scope: InstallScope) -> Self {
        Self {
            architecture,
            installer_type,
            scope,
            ..Self::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_dependencies(mut self, dependencies: DependencyList) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// The effective scope for filtering; scope-agnostic technologies report `Unknown`.
    pub fn effective_scope(&self) -> InstallScope {
        if self.installer_type.ignores_manifest_scope() {
            InstallScope::Unknown
        } else {
            self.scope
        }
    }

    pub fn can_upgrade_installed(&self, installed: InstallerType) -> bool {
        installed.is_compatible_with(self.installer_type)
            || self.compatible_installed_types.contains(&installed)
    }
}

impl Display for InstallerDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{},{},{}",
            self.architecture.as_str(),
            self.installer_type.as_str(),
            self.scope.as_str()
        )?;
        if !self.locale.is_empty() {
            write!(f, ",{}", self.locale)?;
        }
        f.write_str("]")
    }
}
