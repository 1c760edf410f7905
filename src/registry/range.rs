//! npm version range matching
//!
//! Used by the registry client to turn the specifier written by a dependent
//! into one concrete published version. Supports:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0, special cases for 0.x)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1`, `1.2`, `1.x`, `1.2.x`, `*`, `x`, empty - partial versions and wildcards
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - `>=1.0.0 <2.0.0` (AND) and `^1.0.0 || ^2.0.0` (OR) compounds

use semver::Version;

/// Parsed range specification
#[derive(Debug)]
pub struct Range(RangeSet);

/// Compound ranges (AND, OR) as well as simple comparators
#[derive(Debug)]
enum RangeSet {
    Single(Comparator),
    /// Space-separated, all must satisfy
    And(Vec<RangeSet>),
    /// `||`-separated, any must satisfy
    Or(Vec<RangeSet>),
}

#[derive(Debug)]
enum Comparator {
    Exact(Version),
    /// ^1.2.3 means >=1.2.3 <2.0.0 (or special cases for 0.x)
    Caret(Version),
    /// ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    Any,
    /// 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
}

/// A possibly partial version: `1`, `1.2`, `1.x`, `1.2.*`, `1.2.3`
#[derive(Debug)]
enum Partial {
    Major(u64),
    Minor(u64, u64),
    Full(Version),
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

impl Partial {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let spec = spec.strip_prefix('=').unwrap_or(spec).trim();
        let spec = spec.strip_prefix('v').unwrap_or(spec);

        if let Ok(version) = Version::parse(spec) {
            return Some(Partial::Full(version));
        }

        let parts: Vec<&str> = spec.split('.').collect();
        let partial = match parts.as_slice() {
            [major] => major.parse().ok().map(Partial::Major),
            [major, minor] if is_wildcard(minor) => major.parse().ok().map(Partial::Major),
            [major, minor, patch] if is_wildcard(minor) && is_wildcard(patch) => {
                major.parse().ok().map(Partial::Major)
            }
            [major, minor] => Some(Partial::Minor(major.parse().ok()?, minor.parse().ok()?)),
            [major, minor, patch] if is_wildcard(patch) => {
                Some(Partial::Minor(major.parse().ok()?, minor.parse().ok()?))
            }
            _ => None,
        }?;

        // The exclusive upper bound of a partial must be representable
        match partial {
            Partial::Major(major) if major == u64::MAX => None,
            Partial::Minor(_, minor) if minor == u64::MAX => None,
            partial => Some(partial),
        }
    }

    /// Smallest version matched by this partial
    fn lower(&self) -> Version {
        match self {
            Partial::Major(major) => Version::new(*major, 0, 0),
            Partial::Minor(major, minor) => Version::new(*major, *minor, 0),
            Partial::Full(version) => version.clone(),
        }
    }

    /// Smallest version above everything matched by a partial (`None` for full versions)
    fn upper_exclusive(&self) -> Option<Version> {
        match self {
            Partial::Major(major) => Some(Version::new(major + 1, 0, 0)),
            Partial::Minor(major, minor) => Some(Version::new(*major, minor + 1, 0)),
            Partial::Full(_) => None,
        }
    }

    fn into_wildcard(self) -> Comparator {
        match self {
            Partial::Major(major) => Comparator::WildcardMajor(major),
            Partial::Minor(major, minor) => Comparator::WildcardMinor(major, minor),
            Partial::Full(version) => Comparator::Exact(version),
        }
    }
}

impl Range {
    /// Parse a version specification string
    pub fn parse(spec: &str) -> Option<Self> {
        RangeSet::parse(spec).map(Range)
    }

    /// Check if a version satisfies this range
    ///
    /// Pre-release versions only match when the range names a pre-release
    /// of the same major.minor.patch.
    pub fn satisfies(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.0.allows_prerelease_of(version) {
            return false;
        }
        self.0.satisfies(version)
    }
}

/// Pick the highest version from `versions` that satisfies `range`
///
/// Strings that are not valid semver are skipped.
pub fn max_satisfying<'a, I>(range: &Range, versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (v, parsed)))
        .filter(|(_, parsed)| range.satisfies(parsed))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original)
}

impl RangeSet {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        // OR (||) has the lowest precedence
        if spec.contains("||") {
            let specs: Option<Vec<RangeSet>> =
                spec.split("||").map(Self::parse_and_or_single).collect();
            return specs.map(RangeSet::Or);
        }

        Self::parse_and_or_single(spec)
    }

    /// Parse a spec that may be AND (space-separated), a hyphen range or a single comparator
    fn parse_and_or_single(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if let Some(range) = Self::parse_hyphen(spec) {
            return Some(range);
        }

        let tokens = Self::comparator_tokens(spec)?;
        if tokens.len() > 1 {
            let ranges: Option<Vec<RangeSet>> = tokens
                .iter()
                .map(|token| Comparator::parse(token).map(RangeSet::Single))
                .collect();
            ranges.map(RangeSet::And)
        } else {
            match tokens.first() {
                Some(token) => Comparator::parse(token).map(RangeSet::Single),
                None => Comparator::parse(spec).map(RangeSet::Single),
            }
        }
    }

    /// Split on whitespace, joining a bare operator with the version after it
    ///
    /// `>= 1.0.0 < 2` yields `[">=1.0.0", "<2"]`. A trailing bare operator
    /// is rejected.
    fn comparator_tokens(spec: &str) -> Option<Vec<String>> {
        let mut tokens = Vec::new();
        let mut parts = spec.split_whitespace();

        while let Some(part) = parts.next() {
            if matches!(part, ">=" | "<=" | ">" | "<" | "=" | "^" | "~" | "~>") {
                tokens.push(format!("{}{}", part, parts.next()?));
            } else {
                tokens.push(part.to_string());
            }
        }

        Some(tokens)
    }

    /// Parse hyphen range like "1.0.0 - 2.0.0" into `>=from <=to`
    fn parse_hyphen(spec: &str) -> Option<Self> {
        let (from, to) = spec.split_once(" - ")?;
        let from = Partial::parse(from)?;
        let to = Partial::parse(to)?;

        let upper = match to.upper_exclusive() {
            Some(bound) => Comparator::Lt(bound),
            None => Comparator::Lte(to.lower()),
        };

        Some(RangeSet::And(vec![
            RangeSet::Single(Comparator::Gte(from.lower())),
            RangeSet::Single(upper),
        ]))
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            RangeSet::Single(comparator) => comparator.satisfies(version),
            RangeSet::And(sets) => sets.iter().all(|s| s.satisfies(version)),
            RangeSet::Or(sets) => sets.iter().any(|s| s.satisfies(version)),
        }
    }

    fn allows_prerelease_of(&self, version: &Version) -> bool {
        match self {
            RangeSet::Single(comparator) => comparator.base_version().is_some_and(|base| {
                !base.pre.is_empty()
                    && base.major == version.major
                    && base.minor == version.minor
                    && base.patch == version.patch
            }),
            RangeSet::And(sets) | RangeSet::Or(sets) => {
                sets.iter().any(|s| s.allows_prerelease_of(version))
            }
        }
    }
}

impl Comparator {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if spec.is_empty() || is_wildcard(spec) {
            return Some(Comparator::Any);
        }

        if let Some(rest) = spec.strip_prefix(">=") {
            Partial::parse(rest).map(|p| Comparator::Gte(p.lower()))
        } else if let Some(rest) = spec.strip_prefix('>') {
            Partial::parse(rest).map(|p| match p.upper_exclusive() {
                Some(bound) => Comparator::Gte(bound),
                None => Comparator::Gt(p.lower()),
            })
        } else if let Some(rest) = spec.strip_prefix("<=") {
            Partial::parse(rest).map(|p| match p.upper_exclusive() {
                Some(bound) => Comparator::Lt(bound),
                None => Comparator::Lte(p.lower()),
            })
        } else if let Some(rest) = spec.strip_prefix('<') {
            Partial::parse(rest).map(|p| Comparator::Lt(p.lower()))
        } else if let Some(rest) = spec.strip_prefix('^') {
            Partial::parse(rest).map(|p| match p {
                Partial::Full(version) => Comparator::Caret(version),
                Partial::Minor(0, minor) => Comparator::WildcardMinor(0, minor),
                Partial::Minor(major, minor) => Comparator::Caret(Version::new(major, minor, 0)),
                Partial::Major(major) => Comparator::WildcardMajor(major),
            })
        } else if let Some(rest) = spec.strip_prefix('~') {
            // ~> is accepted by npm as an alias of ~
            let rest = rest.strip_prefix('>').unwrap_or(rest);
            Partial::parse(rest).map(|p| match p {
                Partial::Full(version) => Comparator::Tilde(version),
                partial => partial.into_wildcard(),
            })
        } else {
            Partial::parse(spec).map(Partial::into_wildcard)
        }
    }

    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::Caret(v) => {
                if version < v {
                    return false;
                }
                // ^1.2.3 -> >=1.2.3 <2.0.0
                // ^0.2.3 -> >=0.2.3 <0.3.0
                // ^0.0.3 -> >=0.0.3 <0.0.4
                if v.major == 0 {
                    if v.minor == 0 {
                        version.major == 0 && version.minor == 0 && version.patch == v.patch
                    } else {
                        version.major == 0 && version.minor == v.minor
                    }
                } else {
                    version.major == v.major
                }
            }
            Comparator::Tilde(v) => {
                version >= v && version.major == v.major && version.minor == v.minor
            }
            Comparator::Gte(v) => version >= v,
            Comparator::Gt(v) => version > v,
            Comparator::Lte(v) => version <= v,
            Comparator::Lt(v) => version < v,
            Comparator::Any => true,
            Comparator::WildcardMajor(major) => version.major == *major,
            Comparator::WildcardMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
        }
    }

    fn base_version(&self) -> Option<&Version> {
        match self {
            Comparator::Exact(v)
            | Comparator::Caret(v)
            | Comparator::Tilde(v)
            | Comparator::Gte(v)
            | Comparator::Gt(v)
            | Comparator::Lte(v)
            | Comparator::Lt(v) => Some(v),
            Comparator::Any | Comparator::WildcardMajor(_) | Comparator::WildcardMinor(_, _) => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn satisfies(spec: &str, version: &str) -> bool {
        let range = Range::parse(spec).unwrap();
        range.satisfies(&Version::parse(version).unwrap())
    }

    #[rstest]
    // exact
    #[case("1.0.0", "1.0.0", true)]
    #[case("1.0.0", "1.0.1", false)]
    #[case("=1.0.0", "1.0.0", true)]
    #[case("v1.0.0", "1.0.0", true)]
    // caret
    #[case("^1.2.3", "1.9.9", true)]
    #[case("^1.2.3", "1.2.2", false)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("^1", "1.9.0", true)]
    #[case("^0", "0.9.0", true)]
    #[case("^0", "1.0.0", false)]
    #[case("^0.14", "0.14.5", true)]
    #[case("^0.14", "0.15.0", false)]
    #[case("^1.2", "1.9.0", true)]
    // tilde
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case("~1.2.3", "1.2.2", false)]
    #[case("~1.2", "1.2.9", true)]
    #[case("~1", "1.9.0", true)]
    #[case("~>1.2.3", "1.2.5", true)]
    // comparison operators
    #[case(">=1.0.0", "2.0.0", true)]
    #[case(">=1.0.0", "0.9.9", false)]
    #[case(">1.0.0", "1.0.0", false)]
    #[case(">1", "1.9.9", false)]
    #[case(">1", "2.0.0", true)]
    #[case("<=1.0.0", "1.0.0", true)]
    #[case("<=1.2", "1.2.9", true)]
    #[case("<=1.2", "1.3.0", false)]
    #[case("<1.0.0", "0.9.9", true)]
    #[case("<1.0.0", "1.0.0", false)]
    // wildcards and partial versions
    #[case("*", "0.0.1", true)]
    #[case("", "3.0.0", true)]
    #[case("x", "3.0.0", true)]
    #[case("1.x", "1.9.9", true)]
    #[case("1.x", "2.0.0", false)]
    #[case("1.X", "1.5.0", true)]
    #[case("1.*", "1.5.0", true)]
    #[case("1.2.x", "1.2.9", true)]
    #[case("1.2.x", "1.3.0", false)]
    #[case("1", "1.0.1", true)]
    #[case("1", "2.0.0", false)]
    #[case("0.14", "0.14.1", true)]
    #[case("0.14", "0.15.0", false)]
    // compounds
    #[case("^1.0.0 || ^2.0.0", "2.5.0", true)]
    #[case("^1.0.0 || ^2.0.0", "3.0.0", false)]
    #[case(">=1.0.0 <1.5.0 || >=2.0.0", "1.6.0", false)]
    #[case(">=1.0.0 <2.0.0", "1.9.9", true)]
    #[case(">=1.0.0 <2.0.0", "2.0.0", false)]
    // hyphen
    #[case("1.0.0 - 2.0.0", "2.0.0", true)]
    #[case("1.0.0 - 2.0.0", "2.0.1", false)]
    #[case("1.0.0 - 2", "2.9.9", true)]
    #[case("1.0.0 - 2", "3.0.0", false)]
    #[case("1.2 - 1.4.0", "1.2.0", true)]
    #[case(">= 1.0.0", "1.0.0", true)]
    #[case(">= 1.0.0", "0.9.9", false)]
    #[case(">= 2.1.2 < 3", "2.9.0", true)]
    #[case(">= 2.1.2 < 3", "3.0.0", false)]
    #[case("^ 1.2.0", "1.9.0", true)]
    #[case("~> 1.2.0", "1.3.0", false)]
    #[case("= 1.0.0", "1.0.0", true)]
    #[case("< 2 || >= 3.0.0", "3.1.0", true)]
    fn satisfies_returns_expected(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("^1.0.0", "1.1.0-beta.1", false)]
    #[case("*", "1.0.0-rc.1", false)]
    #[case("1.0.0-rc.1", "1.0.0-rc.1", true)]
    #[case("^1.0.0-beta.1", "1.0.0-beta.2", true)]
    #[case("^1.0.0-beta.1", "1.1.0-beta.1", false)]
    fn prerelease_matches_only_when_named(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("latest")]
    #[case("git+https://github.com/a/b.git")]
    #[case("^1.a.0")]
    #[case("file:../local")]
    #[case(">=")]
    #[case(">= 1.0.0 <")]
    #[case("18446744073709551615")]
    #[case(">18446744073709551615")]
    #[case("<=1.18446744073709551615")]
    #[case("^18446744073709551615")]
    #[case("~1.18446744073709551615.x")]
    #[case("1 - 18446744073709551615")]
    fn parse_rejects_non_range_specs(#[case] spec: &str) {
        assert!(Range::parse(spec).is_none());
    }

    #[rstest]
    #[case("^1.0.0", vec!["1.0.0", "1.2.0", "2.0.0"], Some("1.2.0"))]
    #[case("~1.2.0", vec!["1.2.0", "1.2.9", "1.3.0"], Some("1.2.9"))]
    #[case("*", vec!["1.0.0", "3.0.0-beta.1", "2.0.0"], Some("2.0.0"))]
    #[case("^3.0.0", vec!["1.0.0", "2.0.0"], None)]
    #[case("^1.0.0", vec!["not-a-version", "1.0.1"], Some("1.0.1"))]
    #[case("1.0.0", vec![], None)]
    fn max_satisfying_returns_expected(
        #[case] spec: &str,
        #[case] versions: Vec<&str>,
        #[case] expected: Option<&str>,
    ) {
        let range = Range::parse(spec).unwrap();
        assert_eq!(max_satisfying(&range, versions), expected);
    }
}
