use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::models::Version;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Package,
    WindowsFeature,
    WindowsLibrary,
    External,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::WindowsFeature => "windows_feature",
            Self::WindowsLibrary => "windows_library",
            Self::External => "external",
        }
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "package" => Ok(Self::Package),
            "windows_feature" => Ok(Self::WindowsFeature),
            "windows_library" => Ok(Self::WindowsLibrary),
            "external" => Ok(Self::External),
            _ => Err(()),
        }
    }
}

/// Identity of a dependency: its kind plus the case-folded id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    pub kind: DependencyKind,
    pub folded_id: String,
}

impl Display for DependencyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.folded_id)
    }
}

/// A reference to something that must be present before a package installs.
///
/// Equality and hashing use `(kind, id)` with the id compared
/// case-insensitively; `min_version` is a constraint, not part of identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<Version>,
}

impl Dependency {
    pub fn new(kind: DependencyKind, id: impl Into<String>, min_version: Option<Version>) -> Self {
        Self {
            kind,
            id: id.into(),
            min_version,
        }
    }

    pub fn package(id: impl Into<String>) -> Self {
        Self::new(DependencyKind::Package, id, None)
    }

    pub fn package_at_least(id: impl Into<String>, min_version: impl Into<Version>) -> Self {
        Self::new(DependencyKind::Package, id, Some(min_version.into()))
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            kind: self.kind,
            folded_id: self.id.to_lowercase(),
        }
    }

    /// True when `version` meets the minimum; a dependency without a minimum accepts anything.
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.min_version
            .as_ref()
            .is_none_or(|minimum| version >= minimum)
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.min_version {
            Some(minimum) => write!(f, "{} [>= {minimum}]", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// Dependencies keyed by `(kind, id)`, kept in insertion order.
///
/// Adding a dependency that is already present keeps a single entry whose
/// minimum is the higher of the two.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyList {
    entries: Vec<Dependency>,
}

impl DependencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dependency: Dependency) {
        let Some(existing) = self.entries.iter_mut().find(|entry| **entry == dependency) else {
            self.entries.push(dependency);
            return;
        };

        if let Some(incoming) = dependency.min_version {
            let raise = existing
                .min_version
                .as_ref()
                .is_none_or(|current| incoming > *current);
            if raise {
                existing.min_version = Some(incoming);
            }
        }
    }

    pub fn extend_from(&mut self, other: &DependencyList) {
        for dependency in other.iter() {
            self.add(dependency.clone());
        }
    }

    pub fn has_any(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn has_any_of(&self, kind: DependencyKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn of_kind(&self, kind: DependencyKind) -> impl Iterator<Item = &Dependency> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn get(&self, kind: DependencyKind, id: &str) -> Option<&Dependency> {
        let folded = id.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.kind == kind && entry.id.to_lowercase() == folded)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Dependency> for DependencyList {
    fn from_iter<T: IntoIterator<Item = Dependency>>(iter: T) -> Self {
        let mut list = Self::new();
        for dependency in iter {
            list.add(dependency);
        }
        list
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
