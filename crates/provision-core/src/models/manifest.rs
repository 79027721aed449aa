use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    Architecture, DependencyList, InstallScope, InstallerDescriptor, InstallerType, Version,
};

/// Localized display metadata for one locale.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub id: String,
    pub version: Version,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Keyed by BCP-47 tag.
    #[serde(default)]
    pub localizations: BTreeMap<String, Localization>,
    #[serde(default)]
    pub installers: Vec<InstallerDescriptor>,
    /// Applies to installers that declare no dependencies of their own.
    #[serde(default)]
    pub dependencies: DependencyList,
    #[serde(default)]
    pub require_explicit_upgrade: bool,
}

impl PackageManifest {
    pub fn new(id: impl Into<String>, version: impl Into<Version>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_installer(mut self, installer: InstallerDescriptor) -> Self {
        self.installers.push(installer);
        self
    }

    pub fn with_dependencies(mut self, dependencies: DependencyList) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn dependencies_for(&self, installer: &InstallerDescriptor) -> DependencyList {
        if installer.dependencies.has_any() {
            installer.dependencies.clone()
        } else {
            self.dependencies.clone()
        }
    }

    /// Overlays the localization that best matches `preferred` onto the
    /// display fields. Exact tags win, then tags sharing the language subtag.
    pub fn apply_locale(&mut self, preferred: &[String]) {
        let chosen = preferred.iter().find_map(|wanted| {
            self.localizations
                .iter()
                .find(|(tag, _)| tag.eq_ignore_ascii_case(wanted))
                .or_else(|| {
                    let language = primary_language(wanted);
                    self.localizations
                        .iter()
                        .find(|(tag, _)| primary_language(tag).eq_ignore_ascii_case(language))
                })
                .map(|(_, localization)| localization.clone())
        });

        let Some(localization) = chosen else {
            return;
        };
        if let Some(name) = localization.name {
            self.name = name;
        }
        if let Some(publisher) = localization.publisher {
            self.publisher = publisher;
        }
        if localization.description.is_some() {
            self.description = localization.description;
        }
    }

    /// Convenience for tests and simple catalogs.
    pub fn single_installer(
        id: impl Into<String>,
        version: impl Into<Version>,
        architecture: Architecture,
        installer_type: InstallerType,
        scope: InstallScope,
    ) -> Self {
        Self::new(id, version).with_installer(InstallerDescriptor::new(
            architecture,
            installer_type,
            scope,
        ))
    }
}

fn primary_language(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}
