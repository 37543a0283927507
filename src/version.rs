use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;

/// Semantic version of a module
///
/// Ordered by major, minor then patch. A pre-release (`1.0.0-SNAPSHOT`, `1.0.0-alpha`) sorts
/// before the release with the same numbers; two pre-releases compare by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pre: Option<String>,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    pub fn with_pre_release(mut self, label: impl Into<String>) -> Self {
        self.pre = Some(label.into());
        self
    }

    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    pub fn is_snapshot(&self) -> bool {
        self.pre
            .as_deref()
            .is_some_and(|label| label.eq_ignore_ascii_case("snapshot"))
    }

    /// The same version without its pre-release label
    pub fn release(&self) -> Version {
        Version::new(self.major, self.minor, self.patch)
    }

    /// `None` once the major number is at `u32::MAX`
    pub fn next_major(&self) -> Option<Version> {
        Some(Version::new(self.major.checked_add(1)?, 0, 0))
    }

    pub fn next_minor(&self) -> Option<Version> {
        Some(Version::new(self.major, self.minor.checked_add(1)?, 0))
    }

    pub fn next_patch(&self) -> Option<Version> {
        Some(Version::new(self.major, self.minor, self.patch.checked_add(1)?))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (numbers, pre) = match input.split_once('-') {
            Some((_, "")) => return Err(invalid("empty pre-release label")),
            Some((numbers, label)) => (numbers, Some(label.to_string())),
            None => (input, None),
        };

        let parts = numbers
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid("expected a number")))
            .collect::<Result<Vec<_>, _>>()?;

        match parts[..] {
            [major, minor, patch] => Ok(Version {
                major,
                minor,
                patch,
                pre,
            }),
            _ => Err(invalid("expected major.minor.patch")),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(label) = &self.pre {
            write!(f, "-{label}")?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Half open version interval `[min, max)`, open above when `max` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub min: Version,
    pub max: Option<Version>,
}

impl VersionRange {
    pub fn new(min: Version, max: Version) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: Version) -> Self {
        Self { min, max: None }
    }

    /// Every version compatible with `min`: up to the next major, or the next minor while the
    /// major version is still 0. Unbounded when there is no next version to stop at.
    pub fn compatible_with(min: Version) -> Self {
        let max = if min.major == 0 {
            min.next_minor()
        } else {
            min.next_major()
        };
        Self { min, max }
    }

    pub fn contains(&self, version: &Version) -> bool {
        *version >= self.min && self.max.as_ref().map_or(true, |max| version < max)
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.max {
            Some(max) => write!(f, "[{}, {})", self.min, max),
            None => write!(f, "[{}, *)", self.min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn orders_by_components() {
        assert!(Version::new(1, 2, 0) > Version::new(1, 1, 9));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
        assert!(Version::new(1, 0, 1) > Version::new(1, 0, 0));
    }

    #[test]
    fn release_after_pre_release() {
        assert!(v("1.0.0") > v("1.0.0-SNAPSHOT"));
        assert!(v("1.0.0-SNAPSHOT") > v("0.9.9"));
        assert!(v("1.0.0-beta") > v("1.0.0-alpha"));
    }

    #[test]
    fn parses_and_formats() {
        let snapshot = v("3.1.4-SNAPSHOT");
        assert_eq!(snapshot.major, 3);
        assert!(snapshot.is_snapshot());
        assert_eq!(snapshot.to_string(), "3.1.4-SNAPSHOT");
        assert_eq!(snapshot.release(), Version::new(3, 1, 4));
    }

    #[test]
    fn rejects_bad_versions() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.2.3-", "-1.2.3"] {
            assert!(bad.parse::<Version>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn compatible_range() {
        let range = VersionRange::compatible_with(v("1.2.0"));
        assert!(range.contains(&v("1.2.0")));
        assert!(range.contains(&v("1.9.3")));
        assert!(!range.contains(&v("2.0.0")));
        assert!(!range.contains(&v("1.1.0")));

        let early = VersionRange::compatible_with(v("0.3.0"));
        assert!(early.contains(&v("0.3.7")));
        assert!(!early.contains(&v("0.4.0")));
    }

    #[test]
    fn range_at_the_top_is_open() {
        let top = Version::new(u32::MAX, 0, 0);
        assert_eq!(top.next_major(), None);
        assert_eq!(Version::new(0, u32::MAX, 0).next_minor(), None);

        let range = VersionRange::compatible_with(top.clone());
        assert_eq!(range.max, None);
        assert!(range.contains(&Version::new(u32::MAX, 7, 1)));
        assert!(!range.contains(&Version::new(u32::MAX - 1, 9, 9)));
        assert_eq!(range.to_string(), format!("[{top}, *)"));

        let early = VersionRange::compatible_with(Version::new(0, u32::MAX, 3));
        assert!(early.contains(&Version::new(0, u32::MAX, 9)));
        assert!(early.contains(&Version::new(1, 0, 0)));
    }
}
