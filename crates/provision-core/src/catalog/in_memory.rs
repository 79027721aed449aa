use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::catalog::{Catalog, CatalogPackage, CatalogResult, VersionKey};
use crate::models::{CoreError, CoreErrorKind, InstalledMetadata, PackageManifest};

/// Catalog snapshot held in memory, keyed by `(source, folded id)`.
///
/// The same id registered under two sources makes searches for it ambiguous.
/// Installed metadata is keyed by folded id alone and attaches to every
/// source that offers the package, whichever is registered first.
#[derive(Default)]
pub struct InMemoryCatalog {
    packages: BTreeMap<(String, String), Arc<InMemoryPackage>>,
    installed: HashMap<String, InstalledMetadata>,
    search_log: Mutex<Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_manifest(&mut self, manifest: PackageManifest) {
        self.add_manifest_from("default", manifest);
    }

    pub fn add_manifest_from(&mut self, source: &str, manifest: PackageManifest) {
        let folded = manifest.id.to_lowercase();
        let installed = self.installed.get(&folded).cloned();
        let package = self
            .packages
            .entry((source.to_string(), folded))
            .or_insert_with(|| {
                let mut package = InMemoryPackage::new(source, &manifest.id);
                package.installed = installed;
                Arc::new(package)
            });
        Arc::make_mut(package).insert_manifest(manifest);
    }

    /// Records `id` as installed. Packages registered later pick it up too.
    pub fn set_installed(&mut self, id: &str, installed: InstalledMetadata) {
        let folded = id.to_lowercase();
        for ((_, package_id), package) in &mut self.packages {
            if *package_id == folded {
                Arc::make_mut(package).installed = Some(installed.clone());
            }
        }
        self.installed.insert(folded, installed);
    }

    /// Ids passed to `search`, in call order.
    pub fn searches(&self) -> Vec<String> {
        self.search_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl Catalog for InMemoryCatalog {
    fn search(&self, id: &str) -> CatalogResult<Vec<Arc<dyn CatalogPackage>>> {
        if let Ok(mut log) = self.search_log.lock() {
            log.push(id.to_string());
        }

        let folded = id.to_lowercase();
        Ok(self
            .packages
            .iter()
            .filter(|((_, package_id), _)| *package_id == folded)
            .map(|(_, package)| Arc::clone(package) as Arc<dyn CatalogPackage>)
            .collect())
    }
}

#[derive(Clone, Debug)]
pub struct InMemoryPackage {
    id: String,
    source: String,
    installed: Option<InstalledMetadata>,
    /// Sorted newest first.
    manifests: Vec<PackageManifest>,
}

impl InMemoryPackage {
    fn new(source: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            installed: None,
            manifests: Vec::new(),
        }
    }

    fn insert_manifest(&mut self, manifest: PackageManifest) {
        self.manifests.retain(|existing| {
            existing.version != manifest.version || existing.channel != manifest.channel
        });
        self.manifests.push(manifest);
        self.manifests
            .sort_by(|left, right| right.version.cmp(&left.version));
    }
}

impl CatalogPackage for InMemoryPackage {
    fn id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn installed(&self) -> Option<InstalledMetadata> {
        self.installed.clone()
    }

    fn available_versions(&self) -> Vec<VersionKey> {
        self.manifests
            .iter()
            .map(|manifest| VersionKey {
                version: manifest.version.clone(),
                channel: manifest.channel.clone(),
            })
            .collect()
    }

    fn manifest_for(&self, version: &VersionKey) -> CatalogResult<PackageManifest> {
        self.manifests
            .iter()
            .find(|manifest| {
                manifest.version == version.version && manifest.channel == version.channel
            })
            .cloned()
            .ok_or_else(|| {
                CoreError::for_package(
                    CoreErrorKind::CatalogFailure,
                    self.id.clone(),
                    format!("no manifest for version '{}'", version.version),
                )
            })
    }
}
