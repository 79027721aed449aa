use serde::{Deserialize, Serialize};

use crate::models::{Architecture, InstallScope, InstallerType, Version};

/// What the installation context knows about an already installed package.
/// Unknown fields impose no constraint on selection.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstalledMetadata {
    pub version: Version,
    #[serde(default)]
    pub scope: InstallScope,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub installer_type: InstallerType,
    #[serde(default)]
    pub architecture: Architecture,
}

impl InstalledMetadata {
    pub fn new(version: impl Into<Version>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: InstallScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_installer_type(mut self, installer_type: InstallerType) -> Self {
        self.installer_type = installer_type;
        self
    }
}
