//! Totally ordered bundle version tokens.
//!
//! A version is split on `.`, `-` and `_` into segments. Segments compare
//! pairwise: numeric segments numerically (leading zeros ignored), numeric
//! before alphanumeric, alphanumeric lexicographically. When one token is a
//! prefix of the other, the shorter one is smaller (`1.2 < 1.2.1`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::BundleError;

const SEPARATORS: [char; 3] = ['.', '-', '_'];

#[derive(Debug, Clone)]
enum Segment {
    /// Digits with leading zeros stripped.
    Numeric(String),
    Text(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let trimmed = raw.trim_start_matches('0');
            Segment::Numeric(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
        } else {
            Segment::Text(raw.to_string())
        }
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Numeric(a), Segment::Numeric(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Numeric(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Numeric(_)) => Ordering::Greater,
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

/// Version token declared in a bundle manifest.
#[derive(Debug, Clone)]
pub struct BundleVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl BundleVersion {
    pub fn parse(raw: &str) -> Result<Self, BundleError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BundleError::InvalidVersion {
                version: raw.to_string(),
                reason: "version is empty".into(),
            });
        }

        let mut segments = Vec::new();
        for part in raw.split(SEPARATORS) {
            if part.is_empty() {
                return Err(BundleError::InvalidVersion {
                    version: raw.to_string(),
                    reason: "empty segment".into(),
                });
            }
            if !part.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(BundleError::InvalidVersion {
                    version: raw.to_string(),
                    reason: format!("segment '{}' is not alphanumeric", part),
                });
            }
            segments.push(Segment::parse(part));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for BundleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for BundleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BundleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BundleVersion {}

impl Hash for BundleVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in &self.segments {
            match segment {
                Segment::Numeric(n) => {
                    0u8.hash(state);
                    n.hash(state);
                }
                Segment::Text(t) => {
                    1u8.hash(state);
                    t.hash(state);
                }
            }
        }
    }
}

impl FromStr for BundleVersion {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for BundleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for BundleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> BundleVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("2") > v("1.99.99"));
        assert!(v("10.0.0") > v("9.9.9"));
    }

    #[test]
    fn test_prefix_is_smaller() {
        assert!(v("1.2") < v("1.2.1"));
        assert!(v("1.2.0") > v("1.2"));
    }

    #[test]
    fn test_leading_zeros_ignored() {
        assert_eq!(v("1.02"), v("1.2"));
        assert_eq!(v("007"), v("7"));
        assert_eq!(v("0.0"), v("00.000"));
    }

    #[test]
    fn test_numeric_before_text() {
        assert!(v("1.0") < v("1.beta"));
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-rc1") > v("1.0-beta"));
    }

    #[test]
    fn test_separators_equivalent() {
        assert_eq!(v("1.2-3"), v("1_2.3"));
    }

    #[test]
    fn test_huge_numbers_do_not_overflow() {
        assert!(v("1.99999999999999999999999") > v("1.99999999999999999999998"));
        assert!(v("100000000000000000000000") > v("9"));
    }

    #[test]
    fn test_display_keeps_raw_token() {
        assert_eq!(v("1.02").to_string(), "1.02");
        assert_eq!(v(" 3.1 ").as_str(), "3.1");
    }

    #[test]
    fn test_invalid_versions() {
        assert!(BundleVersion::parse("").is_err());
        assert!(BundleVersion::parse("   ").is_err());
        assert!(BundleVersion::parse("1..2").is_err());
        assert!(BundleVersion::parse("1.2.").is_err());
        assert!(BundleVersion::parse("1.2+build").is_err());
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        use std::collections::HashSet;

        let set: HashSet<BundleVersion> = [v("1.02"), v("1.2"), v("1_2")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.02-beta")).unwrap();
        assert_eq!(json, "\"1.02-beta\"");

        let back: BundleVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2-beta"));
        assert!(serde_json::from_str::<BundleVersion>("\"1..2\"").is_err());
    }
}
