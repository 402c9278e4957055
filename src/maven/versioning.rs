use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unparseable version string: {0:?}")]
pub struct VersionParseError(pub String);

/// A Maven version string with its parsed form, ordered by Maven version
/// precedence.
///
/// Tokenization splits on '.', '-' and digit/letter boundaries. Numeric
/// tokens compare numerically, textual tokens by qualifier rank
/// (alpha < beta < milestone < rc < snapshot < "" (release) < sp < everything
/// else lexically). A shorter version is padded with "null" tokens, so
/// `1.0 == 1`, `1.0-SNAPSHOT < 1.0` and `1.0-sp > 1.0`.
///
/// Two versions with equal precedence compare as equal even if spelled
/// differently; ordered sets of versions deduplicate them, which is what the
/// metadata version lists want.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Normalized decimal digits, no leading zeros.
    Number(String),
    Qualifier(String),
}

impl Version {
    pub fn parse(s: &str) -> Result<Version, VersionParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError(s.to_string()));
        }
        let items = tokenize(trimmed);
        if items.is_empty() {
            return Err(VersionParseError(s.to_string()));
        }
        Ok(Version {
            raw: trimmed.to_string(),
            items,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Convenience comparison of two raw version strings.
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionParseError> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ordering = compare_items(self.items.get(i), other.items.get(i));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn tokenize(s: &str) -> Vec<Item> {
    let lower = s.to_ascii_lowercase();
    let mut items = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for ch in lower.chars() {
        if ch == '.' || ch == '-' {
            push_token(&mut items, &current, current_is_digit, false);
            current.clear();
        }
        else {
            let is_digit = ch.is_ascii_digit();
            if !current.is_empty() && is_digit != current_is_digit {
                // digit/letter boundary; a single letter directly followed by
                // digits is a qualifier shorthand (1.0a1 == 1.0-alpha-1)
                push_token(&mut items, &current, current_is_digit, is_digit);
                current.clear();
            }
            current_is_digit = is_digit;
            current.push(ch);
        }
    }
    push_token(&mut items, &current, current_is_digit, false);
    items
}

fn push_token(items: &mut Vec<Item>, token: &str, is_digit: bool, followed_by_digit: bool) {
    if token.is_empty() {
        return;
    }
    if is_digit {
        let normalized = token.trim_start_matches('0');
        let normalized = if normalized.is_empty() { "0" } else { normalized };
        items.push(Item::Number(normalized.to_string()));
    }
    else {
        let qualifier = if followed_by_digit {
            match token {
                "a" => "alpha",
                "b" => "beta",
                "m" => "milestone",
                other => other,
            }
        }
        else {
            token
        };
        items.push(Item::Qualifier(qualifier.to_string()));
    }
}

/// Rank of a textual qualifier; unknown qualifiers sort after all known ones,
/// lexically among themselves.
fn qualifier_rank(qualifier: &str) -> (u8, &str) {
    match qualifier {
        "alpha" => (0, ""),
        "beta" => (1, ""),
        "milestone" => (2, ""),
        "rc" | "cr" => (3, ""),
        "snapshot" => (4, ""),
        "" | "ga" | "final" | "release" => (5, ""),
        "sp" => (6, ""),
        other => (7, other),
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// `None` stands for a padded-out token, which compares like an empty
/// (release) qualifier and like zero against numbers.
fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(n)), Some(Item::Number(m))) => compare_numbers(n, m),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(q)), Some(Item::Qualifier(r))) => {
            qualifier_rank(q).cmp(&qualifier_rank(r))
        }
        (Some(Item::Number(n)), None) => {
            if n == "0" { Ordering::Equal } else { Ordering::Greater }
        }
        (None, Some(Item::Number(n))) => {
            if n == "0" { Ordering::Equal } else { Ordering::Less }
        }
        (Some(Item::Qualifier(q)), None) => qualifier_rank(q).cmp(&qualifier_rank("")),
        (None, Some(Item::Qualifier(q))) => qualifier_rank("").cmp(&qualifier_rank(q)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case::simple_less("1.0", "2.0", Ordering::Less)]
    #[case::patch_greater("1.0.1", "1.0", Ordering::Greater)]
    #[case::equal("1.0", "1.0", Ordering::Equal)]
    #[case::trailing_zero_equal("1.0", "1", Ordering::Equal)]
    #[case::snapshot_below_release("1.0-SNAPSHOT", "1.0", Ordering::Less)]
    #[case::snapshot_above_previous("1.0-SNAPSHOT", "0.9", Ordering::Greater)]
    #[case::alpha_below_release("1.0-alpha-1", "1.0", Ordering::Less)]
    #[case::alpha_below_beta("1.0-alpha-1", "1.0-beta-1", Ordering::Less)]
    #[case::alpha_shorthand("1.0a1", "1.0-alpha-1", Ordering::Equal)]
    #[case::rc_below_release("1.0-rc1", "1.0", Ordering::Less)]
    #[case::cr_equals_rc("1.0-cr1", "1.0-rc1", Ordering::Equal)]
    #[case::sp_above_release("1.0-sp1", "1.0", Ordering::Greater)]
    #[case::ga_is_release("1.0-ga", "1.0", Ordering::Equal)]
    #[case::unknown_qualifier_above_sp("1.0-xyz", "1.0-sp", Ordering::Greater)]
    #[case::unknown_qualifiers_lexical("1.0-xyz", "1.0-zzz", Ordering::Less)]
    #[case::numeric_not_lexical("1.10", "1.9", Ordering::Greater)]
    #[case::big_numbers("1.18446744073709551617", "1.2", Ordering::Greater)]
    #[case::case_insensitive("1.0-ALPHA", "1.0-alpha", Ordering::Equal)]
    #[case::timestamped_snapshots("1.0-20150101.120000-1", "1.0-20150102.120000-1", Ordering::Less)]
    #[case::build_numbers("1.0-20150101.120000-1", "1.0-20150101.120000-2", Ordering::Less)]
    fn test_compare(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare(a, b).unwrap(), expected);
        assert_eq!(compare(b, a).unwrap(), expected.reverse());
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::separators_only(".-.")]
    fn test_parse_failure(#[case] s: &str) {
        assert!(Version::parse(s).is_err());
    }

    #[test]
    fn test_total_order_over_sample() {
        let sample = ["1.0-alpha-1", "1.0-SNAPSHOT", "1.0", "1.0.1", "2.0"];
        let parsed: Vec<Version> = sample.iter().map(|s| Version::parse(s).unwrap()).collect();
        // the sample above is already in ascending order; check pairwise
        // consistency, which covers totality and transitivity over it
        for i in 0..parsed.len() {
            for j in 0..parsed.len() {
                let expected = i.cmp(&j);
                assert_eq!(parsed[i].cmp(&parsed[j]), expected, "{} vs {}", sample[i], sample[j]);
            }
        }
    }

    #[test]
    fn test_ordered_set_deduplicates_equal_precedence() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(Version::parse("1.0").unwrap());
        set.insert(Version::parse("1").unwrap());
        set.insert(Version::parse("1.0-SNAPSHOT").unwrap());
        assert_eq!(set.len(), 2);
    }
}
