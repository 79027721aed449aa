use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::models::Version;

/// Pin status of one package version as seen by the resolver.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinState {
    Unpinned,
    PinnedByUser,
    PinnedByManifest,
    PinnedBlocking,
}

impl PinState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpinned => "unpinned",
            Self::PinnedByUser => "pinned_by_user",
            Self::PinnedByManifest => "pinned_by_manifest",
            Self::PinnedBlocking => "pinned_blocking",
        }
    }

    pub fn is_pinned(self) -> bool {
        !matches!(self, Self::Unpinned)
    }
}

/// How pinned versions are treated during resolution.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinBehavior {
    #[default]
    ConsiderPins,
    /// Pinned versions are eligible; blocking pins still apply.
    IncludePinned,
    IgnorePins,
}

impl PinBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConsiderPins => "consider_pins",
            Self::IncludePinned => "include_pinned",
            Self::IgnorePins => "ignore_pins",
        }
    }

    /// Whether a version in `state` may be selected under this behavior.
    pub fn permits(self, state: PinState) -> bool {
        match self {
            Self::IgnorePins => true,
            Self::IncludePinned => state != PinState::PinnedBlocking,
            Self::ConsiderPins => !state.is_pinned(),
        }
    }
}

impl std::str::FromStr for PinBehavior {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "consider_pins" => Ok(Self::ConsiderPins),
            "include_pinned" => Ok(Self::IncludePinned),
            "ignore_pins" => Ok(Self::IgnorePins),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PinKind {
    /// Excluded from automatic upgrades; explicit requests may include it.
    Pinning,
    /// Never selected unless pins are ignored entirely.
    Blocking,
    /// Only versions starting with `gated_version` are selectable.
    Gating { gated_version: Version },
}

impl PinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pinning => "pinning",
            Self::Blocking => "blocking",
            Self::Gating { .. } => "gating",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PinRecord {
    pub package_id: String,
    pub source_id: Option<String>,
    pub kind: PinKind,
    pub created_at: SystemTime,
}

impl PinRecord {
    pub fn new(package_id: impl Into<String>, kind: PinKind) -> Self {
        Self {
            package_id: package_id.into(),
            source_id: None,
            kind,
            created_at: SystemTime::now(),
        }
    }

    /// The pin state this record imposes on `version`.
    pub fn state_for(&self, version: &Version) -> PinState {
        match &self.kind {
            PinKind::Pinning => PinState::PinnedByUser,
            PinKind::Blocking => PinState::PinnedBlocking,
            PinKind::Gating { gated_version } if version.starts_with(gated_version) => {
                PinState::Unpinned
            }
            PinKind::Gating { .. } => PinState::PinnedByUser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PinBehavior, PinKind, PinRecord, PinState};
    use crate::models::Version;

    #[test]
    fn behavior_decides_which_states_are_selectable() {
        assert!(!PinBehavior::ConsiderPins.permits(PinState::PinnedByManifest));
        assert!(PinBehavior::IncludePinned.permits(PinState::PinnedByUser));
        assert!(!PinBehavior::IncludePinned.permits(PinState::PinnedBlocking));
        assert!(PinBehavior::IgnorePins.permits(PinState::PinnedBlocking));
    }

    #[test]
    fn gating_pin_allows_matching_prefix_only() {
        let record = PinRecord::new(
            "Contoso.Tool",
            PinKind::Gating {
                gated_version: Version::new("1.2"),
            },
        );
        assert_eq!(record.state_for(&Version::new("1.2.9")), PinState::Unpinned);
        assert_eq!(record.state_for(&Version::new("1.3")), PinState::PinnedByUser);
    }
}
