bitflags::bitflags! {
    /// Every independent reason an installer failed filtering.
    ///
    /// An empty set means the installer is eligible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InapplicabilityFlags: u32 {
        const OS_VERSION = 1 << 0;
        const INSTALLED_SCOPE = 1 << 1;
        const INSTALLED_TYPE = 1 << 2;
        const INSTALLED_LOCALE = 1 << 3;
        const LOCALE = 1 << 4;
        const SCOPE = 1 << 5;
        const MACHINE_ARCHITECTURE = 1 << 6;
        const MARKET = 1 << 7;
        const INSTALLER_TYPE = 1 << 8;
    }
}

impl InapplicabilityFlags {
    /// Rejections a user can fix by changing arguments come first; the rest
    /// follow in declaration order.
    const DIAGNOSTIC_PRIORITY: [InapplicabilityFlags; 9] = [
        Self::INSTALLED_TYPE,
        Self::INSTALLED_SCOPE,
        Self::INSTALLED_LOCALE,
        Self::SCOPE,
        Self::LOCALE,
        Self::INSTALLER_TYPE,
        Self::MACHINE_ARCHITECTURE,
        Self::OS_VERSION,
        Self::MARKET,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::OS_VERSION => "os_version",
            Self::INSTALLED_SCOPE => "installed_scope",
            Self::INSTALLED_TYPE => "installed_type",
            Self::INSTALLED_LOCALE => "installed_locale",
            Self::LOCALE => "locale",
            Self::SCOPE => "scope",
            Self::MACHINE_ARCHITECTURE => "machine_architecture",
            Self::MARKET => "market",
            Self::INSTALLER_TYPE => "installer_type",
            _ => "multiple",
        }
    }

    /// The single most diagnostic flag contained in this set.
    pub fn primary(self) -> Option<InapplicabilityFlags> {
        Self::DIAGNOSTIC_PRIORITY
            .into_iter()
            .find(|flag| self.contains(*flag))
    }
}
