mod in_memory;

use std::sync::Arc;

pub use in_memory::{InMemoryCatalog, InMemoryPackage};

use crate::models::{CoreError, InstalledMetadata, PackageManifest, Version};

pub type CatalogResult<T> = Result<T, CoreError>;

/// Identifies one available version of a package.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VersionKey {
    pub version: Version,
    pub channel: String,
}

impl VersionKey {
    pub fn new(version: impl Into<Version>) -> Self {
        Self {
            version: version.into(),
            channel: String::new(),
        }
    }
}

/// Package source queried during resolution. Calls may block on I/O.
pub trait Catalog: Send + Sync {
    /// Packages whose id equals `id` case-insensitively.
    fn search(&self, id: &str) -> CatalogResult<Vec<Arc<dyn CatalogPackage>>>;
}

pub trait CatalogPackage: Send + Sync {
    fn id(&self) -> &str;

    /// Source the package was found in, for diagnostics.
    fn source(&self) -> &str;

    fn installed(&self) -> Option<InstalledMetadata>;

    fn installed_version(&self) -> Option<Version> {
        self.installed().map(|installed| installed.version)
    }

    /// Available versions, newest first.
    fn available_versions(&self) -> Vec<VersionKey>;

    fn manifest_for(&self, version: &VersionKey) -> CatalogResult<PackageManifest>;
}
