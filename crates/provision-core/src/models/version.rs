use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A dotted package version such as `10.0.19041.0` or `2.5-beta`.
///
/// Each dot-separated part is a leading integer followed by an optional
/// free-form suffix. Missing trailing parts compare as zero, so `1.0` and
/// `1.0.0` are equal. Within a part, a suffix sorts below the bare integer
/// (`2.5-beta < 2.5`), and suffixes compare case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Version {
    raw: String,
    parts: Vec<VersionPart>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct VersionPart {
    integer: u64,
    suffix: String,
}

impl VersionPart {
    fn parse(raw: &str) -> Self {
        let digits = raw.chars().take_while(char::is_ascii_digit).count();
        let (integer, suffix) = raw.split_at(digits);
        Self {
            // Only overflow can fail once the part has digits.
            integer: if integer.is_empty() {
                0
            } else {
                integer.parse().unwrap_or(u64::MAX)
            },
            suffix: suffix.to_ascii_lowercase(),
        }
    }

    fn is_zero(&self) -> bool {
        self.integer == 0 && self.suffix.is_empty()
    }
}

impl Ord for VersionPart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.integer
            .cmp(&other.integer)
            .then_with(|| match (self.suffix.is_empty(), other.suffix.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.suffix.cmp(&other.suffix),
            })
    }
}

impl PartialOrd for VersionPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

static ZERO_PART: VersionPart = VersionPart {
    integer: 0,
    suffix: String::new(),
};

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        let parts = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('.').map(VersionPart::parse).collect()
        };
        Self { raw, parts }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// An empty version string carries no ordering information.
    pub fn is_unknown(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts with trailing zero parts removed; equality and hashing use this form.
    fn significant_parts(&self) -> &[VersionPart] {
        let keep = self
            .parts
            .iter()
            .rposition(|part| !part.is_zero())
            .map_or(0, |index| index + 1);
        &self.parts[..keep]
    }

    /// True when every part of `prefix` equals the corresponding part of this version.
    pub(crate) fn starts_with(&self, prefix: &Version) -> bool {
        prefix
            .parts
            .iter()
            .enumerate()
            .all(|(index, part)| self.parts.get(index).unwrap_or(&ZERO_PART) == part)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let length = self.parts.len().max(other.parts.len());
        for index in 0..length {
            let left = self.parts.get(index).unwrap_or(&ZERO_PART);
            let right = other.parts.get(index).unwrap_or(&ZERO_PART);
            match left.cmp(right) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for part in self.significant_parts() {
            part.integer.hash(state);
            part.suffix.hash(state);
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new("")
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(value))
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}
