//! Cookie selection for export and apply.

use std::collections::{HashMap, HashSet};

use regex::RegexBuilder;
use tracing::debug;

use crate::cookie::{CookieId, CookieRecord};

/// Which cookies an operation acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every cookie.
    All,
    /// Cookies whose identity is listed.
    Ids(Vec<CookieId>),
    /// Cookies whose domain matches a wildcard pattern (`*`, `?`, case-insensitive).
    Domain(String),
}

impl Selection {
    /// Selects from `cookies`, preserving input order. Identity duplicates
    /// collapse to one entry holding the last occurrence.
    #[must_use]
    pub fn select(&self, cookies: &[CookieRecord]) -> Vec<CookieRecord> {
        let picked: Vec<&CookieRecord> = match self {
            Self::All => cookies.iter().collect(),
            Self::Ids(ids) => {
                let wanted: HashSet<&CookieId> = ids.iter().collect();
                cookies
                    .iter()
                    .filter(|cookie| wanted.contains(&cookie.id()))
                    .collect()
            }
            Self::Domain(pattern) => {
                let matcher = DomainMatcher::new(pattern);
                cookies
                    .iter()
                    .filter(|cookie| matcher.matches(&cookie.domain))
                    .collect()
            }
        };
        dedupe_last_wins(picked)
    }
}

/// Collapses identity duplicates; the surviving entry sits where the identity
/// first appeared and carries the last occurrence's data.
#[must_use]
pub fn dedupe_last_wins<'a>(cookies: impl IntoIterator<Item = &'a CookieRecord>) -> Vec<CookieRecord> {
    let mut positions: HashMap<CookieId, usize> = HashMap::new();
    let mut out: Vec<CookieRecord> = Vec::new();
    for cookie in cookies {
        match positions.get(&cookie.id()) {
            Some(&index) => out[index] = cookie.clone(),
            None => {
                positions.insert(cookie.id(), out.len());
                out.push(cookie.clone());
            }
        }
    }
    out
}

enum DomainMatcher {
    Regex(regex::Regex),
    Substring(String),
}

impl DomainMatcher {
    fn new(pattern: &str) -> Self {
        let translated = regex::escape(pattern.trim())
            .replace(r"\*", ".*")
            .replace(r"\?", ".");
        match RegexBuilder::new(&translated).case_insensitive(true).build() {
            Ok(regex) => Self::Regex(regex),
            Err(error) => {
                debug!(%error, "domain pattern rejected; using substring match");
                Self::Substring(pattern.trim().to_lowercase())
            }
        }
    }

    fn matches(&self, domain: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(domain),
            Self::Substring(needle) => domain.to_lowercase().contains(needle),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jar() -> Vec<CookieRecord> {
        vec![
            CookieRecord::new("sid", "1", ".example.com", "/"),
            CookieRecord::new("theme", "dark", "app.example.com", "/"),
            CookieRecord::new("id", "x", "tracker.net", "/"),
            CookieRecord::new("sid", "2", ".example.com", "/"),
        ]
    }

    #[test]
    fn test_all_dedupes_with_last_value_in_first_position() {
        let selected = Selection::All.select(&jar());
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].name, "sid");
        assert_eq!(selected[0].value(), "2");
    }

    #[test]
    fn test_ids_selects_listed_identities() {
        let selection = Selection::Ids(vec!["tracker.net|id|/".parse().unwrap()]);
        let selected = selection.select(&jar());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].domain, "tracker.net");
    }

    #[test]
    fn test_domain_wildcards_are_case_insensitive() {
        let selected = Selection::Domain("*.EXAMPLE.com".to_string()).select(&jar());
        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["sid", "theme"]);
    }

    #[test]
    fn test_domain_question_mark_matches_single_char() {
        let selected = Selection::Domain("tracker.n?t".to_string()).select(&jar());
        assert_eq!(selected.len(), 1);
        let none = Selection::Domain("tracker.n?et".to_string()).select(&jar());
        assert!(none.is_empty());
    }

    #[test]
    fn test_domain_dot_is_literal() {
        let cookies = vec![CookieRecord::new("a", "1", "exampleXcom", "/")];
        assert!(Selection::Domain("example.com".into()).select(&cookies).is_empty());
    }

    #[test]
    fn test_substring_fallback_matcher() {
        let matcher = DomainMatcher::Substring("example".to_string());
        assert!(matcher.matches("WWW.EXAMPLE.COM"));
        assert!(!matcher.matches("other.org"));
    }
}
