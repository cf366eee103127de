/*!
# Version and Framework Tags

Java releases are grouped into epochs: the releases at which a modernization
becomes available. Rules are gated on an epoch, never on an exact release.
*/

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered Java language epochs
///
/// Serializes as the epoch's release number. Deserializing accepts any
/// release, as a string or an integer, and floors it to its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ReleaseSpelling")]
pub enum VersionTag {
    /// Anything older than Java 8; no rule is active
    #[serde(rename = "7")]
    Pre8,
    #[serde(rename = "8")]
    Java8,
    #[serde(rename = "11")]
    Java11,
    #[serde(rename = "14")]
    Java14,
    #[serde(rename = "16")]
    Java16,
    #[serde(rename = "17")]
    Java17,
    #[serde(rename = "21")]
    Java21,
    #[serde(rename = "25")]
    Java25,
}

impl VersionTag {
    pub const ALL: [VersionTag; 8] = [
        VersionTag::Pre8,
        VersionTag::Java8,
        VersionTag::Java11,
        VersionTag::Java14,
        VersionTag::Java16,
        VersionTag::Java17,
        VersionTag::Java21,
        VersionTag::Java25,
    ];

    /// Newest epoch known to this build
    pub const LATEST: VersionTag = VersionTag::Java25;

    /// Feature release number of the epoch
    pub fn release(self) -> u32 {
        match self {
            VersionTag::Pre8 => 7,
            VersionTag::Java8 => 8,
            VersionTag::Java11 => 11,
            VersionTag::Java14 => 14,
            VersionTag::Java16 => 16,
            VersionTag::Java17 => 17,
            VersionTag::Java21 => 21,
            VersionTag::Java25 => 25,
        }
    }

    /// Greatest epoch not newer than `release`
    ///
    /// Releases beyond the newest epoch map to the newest epoch.
    pub fn from_release(release: u32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|tag| tag.release() <= release)
            .unwrap_or(VersionTag::Pre8)
    }

    /// Parse a declared release as written in build descriptors
    ///
    /// Accepts `17`, `1.8`, `1_8`, `VERSION_17`, `JavaVersion.VERSION_1_8`
    /// and `17.0.2`. Anything else is unknown and maps to [`VersionTag::LATEST`].
    pub fn parse_lenient(declared: &str) -> Self {
        Self::parse_release(declared)
            .map(Self::from_release)
            .unwrap_or(Self::LATEST)
    }

    /// Extract the feature release number from a declared version string
    pub fn parse_release(declared: &str) -> Option<u32> {
        let trimmed = declared
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim_start_matches("JavaVersion.")
            .trim_start_matches("VERSION_");
        let mut parts = trimmed.split(['.', '_']);
        let first: u32 = parts.next()?.parse().ok()?;
        if first == 1 {
            // Legacy "1.x" numbering
            parts.next()?.parse().ok()
        } else {
            Some(first)
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionTag::Pre8 => write!(f, "Java <8"),
            other => write!(f, "Java {}", other.release()),
        }
    }
}

impl FromStr for VersionTag {
    type Err = String;

    /// Strict parse used for user input; unknown strings are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_release(s)
            .map(Self::from_release)
            .ok_or_else(|| format!("unrecognized Java version '{s}'"))
    }
}

/// Release as written in configuration: `"17"`, `"1.8"` or `17`
#[derive(Deserialize)]
#[serde(untagged)]
enum ReleaseSpelling {
    Number(u32),
    Text(String),
}

impl TryFrom<ReleaseSpelling> for VersionTag {
    type Error = String;

    fn try_from(spelling: ReleaseSpelling) -> Result<Self, Self::Error> {
        match spelling {
            ReleaseSpelling::Number(release) => Ok(Self::from_release(release)),
            ReleaseSpelling::Text(text) => text.parse(),
        }
    }
}

/// Frameworks that gate framework-specific rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameworkTag {
    Spring,
    Reactor,
    Quarkus,
    Micronaut,
    JakartaEe,
}

impl FrameworkTag {
    pub const ALL: [FrameworkTag; 5] = [
        FrameworkTag::Spring,
        FrameworkTag::Reactor,
        FrameworkTag::Quarkus,
        FrameworkTag::Micronaut,
        FrameworkTag::JakartaEe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FrameworkTag::Spring => "spring",
            FrameworkTag::Reactor => "reactor",
            FrameworkTag::Quarkus => "quarkus",
            FrameworkTag::Micronaut => "micronaut",
            FrameworkTag::JakartaEe => "jakarta-ee",
        }
    }
}

impl fmt::Display for FrameworkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameworkTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == wanted)
            .ok_or_else(|| format!("unknown framework '{s}'"))
    }
}

/// Frameworks detected in a project
pub type FrameworkSet = BTreeSet<FrameworkTag>;
