pub mod applicability;
pub mod dependency;
pub mod error;
pub mod installed;
pub mod installer;
pub mod manifest;
pub mod pin;
pub mod unit;
pub mod version;

pub use applicability::InapplicabilityFlags;
pub use dependency::{Dependency, DependencyKey, DependencyKind, DependencyList};
pub use error::{CoreError, CoreErrorKind};
pub use installed::InstalledMetadata;
pub use installer::{Architecture, InstallScope, InstallerDescriptor, InstallerType, MarketsInfo};
pub use manifest::{Localization, PackageManifest};
pub use pin::{PinBehavior, PinKind, PinRecord, PinState};
pub use unit::{ResolvedPackageUnit, UnitOutcome, UnitOutcomeKind};
pub use version::Version;
