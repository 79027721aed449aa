use std::collections::HashMap;

use crate::models::{PinRecord, PinState, Version};
use crate::persistence::{PersistenceResult, PinStore};

/// Reports the pin state of a package version.
pub trait PinEvaluator: Send + Sync {
    fn evaluate(&self, package_id: &str, version: &Version) -> PinState;
}

/// Nothing is pinned.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPins;

impl PinEvaluator for NoPins {
    fn evaluate(&self, _package_id: &str, _version: &Version) -> PinState {
        PinState::Unpinned
    }
}

/// Evaluates pins from stored records plus manifest-imposed pins.
#[derive(Clone, Debug, Default)]
pub struct RecordPinEvaluator {
    records: HashMap<String, PinRecord>,
    /// Installed packages whose manifest requires explicit upgrades.
    manifest_pinned: HashMap<String, Version>,
}

impl RecordPinEvaluator {
    pub fn new(records: impl IntoIterator<Item = PinRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.package_id.to_lowercase(), record))
                .collect(),
            manifest_pinned: HashMap::new(),
        }
    }

    pub fn from_store(store: &dyn PinStore) -> PersistenceResult<Self> {
        Ok(Self::new(store.list_pins()?))
    }

    /// Every version newer than `installed_version` of `package_id` needs an explicit request.
    pub fn require_explicit_upgrade(&mut self, package_id: &str, installed_version: Version) {
        self.manifest_pinned
            .insert(package_id.to_lowercase(), installed_version);
    }
}

impl PinEvaluator for RecordPinEvaluator {
    fn evaluate(&self, package_id: &str, version: &Version) -> PinState {
        let folded = package_id.to_lowercase();
        let record_state = self
            .records
            .get(&folded)
            .map_or(PinState::Unpinned, |record| record.state_for(version));
        if record_state.is_pinned() {
            return record_state;
        }

        match self.manifest_pinned.get(&folded) {
            Some(installed) if version > installed => PinState::PinnedByManifest,
            _ => PinState::Unpinned,
        }
    }
}
