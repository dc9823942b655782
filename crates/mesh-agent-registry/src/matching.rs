//! Tag and version matching used by the resolver

use semver::{Version, VersionReq};
use std::collections::BTreeSet;

use crate::types::TagExpr;

/// Check provider tags against a dependency's tag expressions
///
/// Returns `None` when a `+`/`-` constraint eliminates the provider,
/// otherwise the number of matched `+` tags plus matched `|` groups.
pub fn match_tags(provider_tags: &BTreeSet<String>, exprs: &[TagExpr]) -> Option<u32> {
    let mut score = 0;
    for expr in exprs {
        match expr {
            TagExpr::Required(tag) => {
                if !provider_tags.contains(tag) {
                    return None;
                }
                score += 1;
            }
            TagExpr::Excluded(tag) => {
                if provider_tags.contains(tag) {
                    return None;
                }
            }
            TagExpr::AnyOf(alternatives) => {
                if alternatives.iter().any(|tag| provider_tags.contains(tag)) {
                    score += 1;
                }
            }
        }
    }
    Some(score)
}

/// Check a provider version against a constraint
///
/// - empty constraint matches anything
/// - empty version fails any non-empty constraint
/// - a bare version (`1.2.3`) means exactly that version; a partial one
///   (`1.2`) pins the given components
/// - operator constraints (`^1.2`, `>=1.0, <2.0`, `~1.4`) use semver rules
/// - anything that does not parse falls back to string equality
pub fn version_matches(version: &str, constraint: &str) -> bool {
    let constraint = constraint.trim();
    let version = version.trim();

    if constraint.is_empty() {
        return true;
    }
    if version.is_empty() {
        return false;
    }

    let parsed_version = match Version::parse(version) {
        Ok(v) => v,
        Err(_) => return version == constraint,
    };

    if let Ok(exact) = Version::parse(constraint) {
        return parsed_version == exact;
    }

    match VersionReq::parse(&pin_bare_parts(constraint)) {
        Ok(req) => req.matches(&parsed_version),
        Err(_) => version == constraint,
    }
}

/// Prefix operator-less parts with `=`, so a partial bare version such as
/// `1.2` pins `1.2.x` instead of meaning `^1.2`
fn pin_bare_parts(constraint: &str) -> String {
    constraint
        .split(',')
        .map(|part| {
            let part = part.trim();
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                format!("={}", part)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn exprs(values: &[&str]) -> Vec<TagExpr> {
        values.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_required_tag() {
        assert_eq!(match_tags(&tags(&["claude", "sonnet"]), &exprs(&["+claude"])), Some(1));
        assert_eq!(match_tags(&tags(&["gpt"]), &exprs(&["+claude"])), None);
    }

    #[test]
    fn test_excluded_tag() {
        assert_eq!(match_tags(&tags(&["claude", "deprecated"]), &exprs(&["-deprecated"])), None);
        assert_eq!(match_tags(&tags(&["claude"]), &exprs(&["-deprecated"])), Some(0));
    }

    #[test]
    fn test_optional_group_scores_without_eliminating() {
        assert_eq!(match_tags(&tags(&["claude"]), &exprs(&["claude|gpt"])), Some(1));
        assert_eq!(match_tags(&tags(&["gpt"]), &exprs(&["claude|gpt"])), Some(1));
        assert_eq!(match_tags(&tags(&["llama"]), &exprs(&["claude|gpt"])), Some(0));
    }

    #[test]
    fn test_combined_score() {
        let provider = tags(&["claude", "fast", "eu"]);
        let spec = exprs(&["+claude", "fast|cheap", "us|eu", "-deprecated"]);
        assert_eq!(match_tags(&provider, &spec), Some(3));
    }

    #[test]
    fn test_version_constraints() {
        assert!(version_matches("1.2.3", ""));
        assert!(!version_matches("", ">=1.0"));
        assert!(version_matches("1.2.3", "1.2.3"));
        assert!(!version_matches("1.2.4", "1.2.3"));
        assert!(version_matches("1.4.0", "^1.2"));
        assert!(!version_matches("2.0.0", "^1.2"));
        assert!(version_matches("1.5.0", ">=1.0, <2.0"));
        assert!(version_matches("1.4.9", "~1.4"));
        assert!(version_matches("3.0.0", ">=2.0.0"));
    }

    #[test]
    fn test_partial_bare_version_pins_prefix() {
        assert!(version_matches("1.2.7", "1.2"));
        assert!(version_matches("1.2.0", "1.2"));
        assert!(!version_matches("1.9.0", "1.2"));
        assert!(version_matches("2.5.0", "2"));
        assert!(!version_matches("3.0.0", "2"));
        assert!(!version_matches("1.9.0", "2"));
        assert!(version_matches("1.2.5", ">=1.0, 1.2"));
        assert!(!version_matches("1.3.0", ">=1.0, 1.2"));
    }

    #[test]
    fn test_non_semver_falls_back_to_equality() {
        assert!(version_matches("2024-01", "2024-01"));
        assert!(!version_matches("2024-01", ">=2024-01"));
        assert!(version_matches("latest", "latest"));
    }
}
