use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{
    Architecture, CoreError, CoreErrorKind, InstallScope, InstallerType, PinBehavior, Version,
};

pub type ConfigResult<T> = Result<T, CoreError>;

/// Facts about the machine resolution runs for.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub os_version: Version,
    pub architecture: Architecture,
    /// Two-letter region code used by market filtering; `None` disables it.
    pub market: Option<String>,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os_version: Version::new("10.0.22631.0"),
            architecture: Architecture::X64,
            market: None,
        }
    }
}

/// User settings that shape installer selection.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPreferences {
    pub scope_preference: InstallScope,
    pub scope_requirement: InstallScope,
    pub locale_preference: Vec<String>,
    pub locale_requirement: Vec<String>,
    pub installer_type_preference: Vec<InstallerType>,
    pub installer_type_requirement: Vec<InstallerType>,
    pub allowed_architectures: Vec<Architecture>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub system: SystemInfo,
    pub preferences: SelectionPreferences,
    pub pin_behavior: PinBehavior,
    /// Retry selection without the installed-type constraint when that is the
    /// only reason every installer was rejected.
    pub allow_installed_type_fallback: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            system: SystemInfo::default(),
            preferences: SelectionPreferences::default(),
            pin_behavior: PinBehavior::default(),
            allow_installed_type_fallback: true,
        }
    }
}

impl ResolutionConfig {
    pub fn for_system(os_version: impl Into<Version>, architecture: Architecture) -> Self {
        Self {
            system: SystemInfo {
                os_version: os_version.into(),
                architecture,
                market: None,
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw).map_err(|error| {
            CoreError::new(
                CoreErrorKind::InvalidConfig,
                format!("invalid resolution config JSON: {error}"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|error| {
            CoreError::new(
                CoreErrorKind::InvalidConfig,
                format!("failed to read resolution config '{}': {error}", path.display()),
            )
        })?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.system.os_version.is_unknown() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidConfig,
                "system.os_version must not be empty",
            ));
        }
        if matches!(
            self.system.architecture,
            Architecture::Unknown | Architecture::Neutral
        ) {
            return Err(CoreError::new(
                CoreErrorKind::InvalidConfig,
                format!(
                    "system.architecture '{}' is not a machine architecture",
                    self.system.architecture.as_str()
                ),
            ));
        }
        if let Some(market) = &self.system.market
            && (market.len() != 2 || !market.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(CoreError::new(
                CoreErrorKind::InvalidConfig,
                format!("system.market '{market}' must be a two-letter region code"),
            ));
        }
        Ok(())
    }
}
