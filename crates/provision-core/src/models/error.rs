use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    MissingDependency,
    AmbiguousDependency,
    NoApplicableVersion,
    NoApplicableInstaller,
    InvalidInput,
    InvalidConfig,
    CatalogFailure,
    StorageFailure,
    InstallFailure,
    Cancelled,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub package: Option<String>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            package: None,
            kind,
            message: message.into(),
        }
    }

    pub fn for_package(
        kind: CoreErrorKind,
        package: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            package: Some(package.into()),
            kind,
            message: message.into(),
        }
    }

    /// Keeps an already attributed package, otherwise attributes the error to `package`.
    pub fn attributed_to(self, package: &str) -> Self {
        Self {
            package: self.package.or_else(|| Some(package.to_string())),
            kind: self.kind,
            message: self.message,
        }
    }
}
