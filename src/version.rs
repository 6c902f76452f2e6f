//! Version ordering, classification and listing filters.
//!
//! Versions keep the literal string exactly as published (it is what users
//! type and what gets printed) alongside a parsed semantic form used only
//! for ordering.

use regex::Regex;
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// The reserved token that resolves to the highest version of a product.
pub const LATEST: &str = "latest";

static PRERELEASE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(beta|rc)").expect("static regex"));
static ENTERPRISE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+ent").expect("static regex"));

/// Any number of numeric segments, then an optional pre-release (the dash
/// may be omitted before a letter) and optional build metadata.
static VERSION_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^v?(?P<core>[0-9]+(?:\.[0-9]+)*)",
        r"(?:-(?P<numeric>[0-9]+[0-9A-Za-z\-]*(?:\.[0-9A-Za-z\-]+)*)",
        r"|-?(?P<alpha>[A-Za-z\-]+[0-9A-Za-z\-]*(?:\.[0-9A-Za-z\-]+)*))?",
        r"(?:\+(?P<build>[0-9A-Za-z\-]+(?:\.[0-9A-Za-z\-]+)*))?$",
    ))
    .expect("static regex")
});

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("{0:?} is not a version")]
    Malformed(String),

    #[error("invalid pre-release or build metadata")]
    Metadata(#[from] semver::Error),
}

/// `-beta…` or `-rc…` release.
pub fn is_prerelease(literal: &str) -> bool {
    PRERELEASE_MARKER.is_match(literal)
}

/// `+ent…` release.
pub fn is_enterprise(literal: &str) -> bool {
    ENTERPRISE_MARKER.is_match(literal)
}

pub fn is_stable(literal: &str) -> bool {
    !is_prerelease(literal) && !is_enterprise(literal)
}

/// A version literal paired with the parts used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    literal: String,
    segments: Vec<u64>,
    pre: Prerelease,
    build: BuildMetadata,
}

impl VersionKey {
    /// Parse a literal. Accepts a leading `v`, any number of numeric
    /// segments (`1.2` orders as `1.2.0`, `1.2.3.4` after `1.2.3`), leading
    /// zeros and a pre-release without a dash (`0.5.0rc1`).
    pub fn parse(literal: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::Malformed(literal.to_string());
        let caps = VERSION_GRAMMAR.captures(literal).ok_or_else(malformed)?;

        let mut segments = caps["core"]
            .split('.')
            .map(|s| s.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.len() < 3 {
            segments.resize(3, 0);
        }

        let pre = match caps.name("numeric").or_else(|| caps.name("alpha")) {
            Some(m) => Prerelease::new(m.as_str())?,
            None => Prerelease::EMPTY,
        };
        let build = match caps.name("build") {
            Some(m) => BuildMetadata::new(m.as_str())?,
            None => BuildMetadata::EMPTY,
        };

        Ok(Self {
            literal: literal.to_string(),
            segments,
            pre,
            build,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// Numeric segments, padded to at least three.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn prerelease(&self) -> &str {
        self.pre.as_str()
    }

    pub fn is_prerelease(&self) -> bool {
        is_prerelease(&self.literal)
    }

    pub fn is_enterprise(&self) -> bool {
        is_enterprise(&self.literal)
    }

    pub fn is_stable(&self) -> bool {
        is_stable(&self.literal)
    }
}

/// Segment-wise comparison; the shorter side is padded with zeros.
fn compare_segments(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_segments(&self.segments, &other.segments)
            .then_with(|| self.pre.cmp(&other.pre))
            .then_with(|| self.build.cmp(&other.build))
            .then_with(|| self.literal.cmp(&other.literal))
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// The three listing switches, decided once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingOptions {
    /// List every version, ignoring the other two switches.
    pub all: bool,
    /// Include `-beta`/`-rc` releases.
    pub beta: bool,
    /// Show enterprise releases, and only those.
    pub enterprise: bool,
}

impl ListingOptions {
    pub fn allows(&self, literal: &str) -> bool {
        if self.all {
            return true;
        }
        if !self.beta && is_prerelease(literal) {
            return false;
        }
        let enterprise = is_enterprise(literal);
        if !self.enterprise && enterprise {
            return false;
        }
        if self.enterprise && !enterprise {
            return false;
        }
        true
    }
}

/// Versions of one product in ascending semantic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet {
    sorted: Vec<VersionKey>,
}

impl VersionSet {
    pub fn new(keys: impl IntoIterator<Item = VersionKey>) -> Self {
        let mut sorted: Vec<VersionKey> = keys.into_iter().collect();
        sorted.sort();
        sorted.dedup_by(|a, b| a.literal == b.literal);
        Self { sorted }
    }

    /// Parse and order a collection of literals, failing on the first
    /// literal that is not a version.
    pub fn parse<I, S>(literals: I) -> Result<Self, (String, VersionError)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = literals
            .into_iter()
            .map(|l| VersionKey::parse(l.as_ref()).map_err(|e| (l.as_ref().to_string(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(keys))
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VersionKey> {
        self.sorted.iter()
    }

    pub fn as_slice(&self) -> &[VersionKey] {
        &self.sorted
    }

    /// Highest version of the unfiltered set. Pre-release and enterprise
    /// versions are eligible.
    pub fn latest(&self) -> Option<&VersionKey> {
        self.sorted.last()
    }

    /// Versions passing `options`, oldest first.
    pub fn filter(&self, options: &ListingOptions) -> Vec<&VersionKey> {
        self.sorted
            .iter()
            .filter(|k| options.allows(&k.literal))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(keys: &[&VersionKey]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn sample() -> VersionSet {
        VersionSet::parse(["1.2.0", "1.3.0-beta1", "1.2.0+ent"]).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(is_prerelease("1.3.0-beta1"));
        assert!(is_prerelease("1.3.0-rc2"));
        assert!(!is_prerelease("1.3.0-alpha1"));
        assert!(is_enterprise("1.2.0+ent"));
        assert!(is_enterprise("1.2.0+ent.hsm"));
        assert!(is_stable("1.2.0"));
        assert!(!is_stable("1.2.0+ent"));
        assert!(!is_stable("1.3.0-beta1"));

        let key = VersionKey::parse("1.2.0").unwrap();
        assert!(key.is_stable());
        assert!(!key.is_prerelease());
    }

    #[test]
    fn test_ordering_numeric_not_lexical() {
        let set = VersionSet::parse(["0.10.0", "0.9.1", "0.9.10", "1.0.0"]).unwrap();
        let order: Vec<&str> = set.iter().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["0.9.1", "0.9.10", "0.10.0", "1.0.0"]);
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let set = VersionSet::parse(["1.0.0", "1.0.0-rc1", "1.0.0-beta2", "0.9.0"]).unwrap();
        let order: Vec<&str> = set.iter().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["0.9.0", "1.0.0-beta2", "1.0.0-rc1", "1.0.0"]);
    }

    #[test]
    fn test_enterprise_sorts_after_plain_release() {
        let set = VersionSet::parse(["1.2.0+ent", "1.2.0", "1.1.0+ent"]).unwrap();
        let order: Vec<&str> = set.iter().map(|k| k.as_str()).collect();
        assert_eq!(order, vec!["1.1.0+ent", "1.2.0", "1.2.0+ent"]);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let input = ["2.0.0", "1.10.0", "1.2.0+ent", "1.2.0", "1.9.0-rc1", "1.9.0"];
        let mut reversed = input;
        reversed.reverse();

        let a = VersionSet::parse(input).unwrap();
        let b = VersionSet::parse(reversed).unwrap();
        assert_eq!(a, b);
        assert_eq!(VersionSet::new(a.as_slice().to_vec()), a);

        for pair in a.as_slice().windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_lenient_parsing_keeps_literal() {
        let key = VersionKey::parse("v1.2").unwrap();
        assert_eq!(key.as_str(), "v1.2");
        assert_eq!(key.segments(), &[1, 2, 0]);

        let key = VersionKey::parse("0.12-beta1").unwrap();
        assert_eq!(key.segments(), &[0, 12, 0]);
        assert_eq!(key.prerelease(), "beta1");
    }

    #[test]
    fn test_extra_segments_and_leading_zeros() {
        let key = VersionKey::parse("1.2.3.4").unwrap();
        assert_eq!(key.segments(), &[1, 2, 3, 4]);

        let key = VersionKey::parse("1.02.0").unwrap();
        assert_eq!(key.segments(), &[1, 2, 0]);

        let set = VersionSet::parse(["1.2.4", "1.2.3.4", "1.2.3", "1.2.3.0.1"]).unwrap();
        assert_eq!(
            literals(&set.iter().collect::<Vec<_>>()),
            vec!["1.2.3", "1.2.3.0.1", "1.2.3.4", "1.2.4"]
        );
    }

    #[test]
    fn test_prerelease_without_dash() {
        let key = VersionKey::parse("0.5.0rc1").unwrap();
        assert_eq!(key.prerelease(), "rc1");

        let set = VersionSet::parse(["0.5.0", "0.5.0rc1", "0.4.9"]).unwrap();
        assert_eq!(
            literals(&set.iter().collect::<Vec<_>>()),
            vec!["0.4.9", "0.5.0rc1", "0.5.0"]
        );
    }

    #[test]
    fn test_invalid_literal_is_rejected() {
        let err = VersionSet::parse(["1.0.0", "not-a-version"]).unwrap_err();
        assert_eq!(err.0, "not-a-version");
        assert!(matches!(err.1, VersionError::Malformed(_)));

        assert!(VersionKey::parse("1..2").is_err());
        assert!(VersionKey::parse("").is_err());
    }

    #[test]
    fn test_filter_defaults_to_stable() {
        let set = sample();
        let listed = set.filter(&ListingOptions::default());
        assert_eq!(literals(&listed), vec!["1.2.0"]);
    }

    #[test]
    fn test_filter_with_beta() {
        let set = sample();
        let options = ListingOptions {
            beta: true,
            ..Default::default()
        };
        assert_eq!(literals(&set.filter(&options)), vec!["1.2.0", "1.3.0-beta1"]);
    }

    #[test]
    fn test_filter_enterprise_only() {
        let set = sample();
        let options = ListingOptions {
            enterprise: true,
            ..Default::default()
        };
        assert_eq!(literals(&set.filter(&options)), vec!["1.2.0+ent"]);
    }

    #[test]
    fn test_filter_all_overrides_everything() {
        let set = sample();
        let options = ListingOptions {
            all: true,
            beta: false,
            enterprise: true,
        };
        assert_eq!(
            literals(&set.filter(&options)),
            vec!["1.2.0", "1.2.0+ent", "1.3.0-beta1"]
        );
    }

    #[test]
    fn test_filter_soundness() {
        let set = VersionSet::parse([
            "1.0.0",
            "1.1.0-beta1",
            "1.1.0-rc1",
            "1.1.0",
            "1.1.0+ent",
            "1.2.0-rc1+ent",
        ])
        .unwrap();

        for all in [false, true] {
            for beta in [false, true] {
                for enterprise in [false, true] {
                    let options = ListingOptions {
                        all,
                        beta,
                        enterprise,
                    };
                    let listed = set.filter(&options);
                    if all {
                        assert_eq!(listed.len(), set.len());
                        continue;
                    }
                    if enterprise {
                        assert!(listed.iter().all(|k| k.is_enterprise()));
                    }
                    if !beta {
                        assert!(listed.iter().all(|k| !k.is_prerelease()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_latest_is_last_of_unfiltered_order() {
        let set = sample();
        assert_eq!(set.latest().unwrap().as_str(), "1.3.0-beta1");
        assert_eq!(set.latest(), set.iter().next_back());
    }

    #[test]
    fn test_latest_of_empty_set() {
        let set = VersionSet::default();
        assert!(set.is_empty());
        assert!(set.latest().is_none());
    }
}
