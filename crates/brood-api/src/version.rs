//! Opaque version strings for long-polling reads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The wire form of a versioned-cell version.
///
/// Workers treat versions as opaque tokens: they echo back whatever the
/// supervisor last handed them. On the supervisor side a version is a
/// monotonic counter; counter zero (a cell that has never been published)
/// renders as the empty string, which is also what a fresh worker sends on
/// its first poll.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// The version a caller uses before it has ever observed a value.
    pub fn initial() -> Self {
        Version(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Version {
    fn from(counter: u64) -> Self {
        if counter == 0 {
            Version(String::new())
        } else {
            Version(counter.to_string())
        }
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version(s.to_string())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_matches_counter_zero() {
        assert_eq!(Version::initial(), Version::from(0));
        assert_eq!(Version::initial().as_str(), "");
    }

    #[test]
    fn test_counter_rendering() {
        assert_eq!(Version::from(1).as_str(), "1");
        assert_eq!(Version::from(42).as_str(), "42");
        assert_ne!(Version::from(1), Version::from(2));
    }

    #[test]
    fn test_serde_transparent() {
        let v = Version::from(7);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"7\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
