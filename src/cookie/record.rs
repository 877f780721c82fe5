//! Cookie records as exchanged between the cookie store and snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Cross-site policy of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    /// Sent only for same-site requests.
    Strict,
    /// Sent on same-site requests and top-level navigations.
    Lax,
    /// Sent on all requests; browsers require `secure` for this policy.
    NoRestriction,
}

impl SameSite {
    /// Stable wire label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::NoRestriction => "no_restriction",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single browser cookie.
///
/// The value is sensitive and is redacted from Debug output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    value: String,
    /// Cookie domain; a leading dot marks a domain cookie.
    pub domain: String,
    /// URL path scope.
    #[serde(default = "default_path")]
    pub path: String,
    /// HTTPS-only flag.
    #[serde(default)]
    pub secure: bool,
    /// Hidden from page scripts.
    #[serde(default)]
    pub http_only: bool,
    /// Cross-site policy; `None` when the source did not specify one.
    #[serde(
        default,
        deserialize_with = "deserialize_same_site",
        skip_serializing_if = "Option::is_none"
    )]
    pub same_site: Option<SameSite>,
    /// Expiry in epoch seconds; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

// Browsers also emit "unspecified"; anything outside the three policies maps to None.
fn deserialize_same_site<'de, D>(deserializer: D) -> Result<Option<SameSite>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|label| match label.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "no_restriction" | "none" => Some(SameSite::NoRestriction),
        _ => None,
    }))
}

impl CookieRecord {
    /// Creates a session cookie with default flags.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            secure: false,
            http_only: false,
            same_site: None,
            expiration_date: None,
        }
    }

    /// Returns the cookie value. Avoid logging it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Identity key `(domain, name, path)`.
    #[must_use]
    pub fn id(&self) -> CookieId {
        CookieId {
            domain: self.domain.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }

    /// Domain with any leading dot removed.
    #[must_use]
    pub fn host(&self) -> &str {
        self.domain.strip_prefix('.').unwrap_or(&self.domain)
    }

    /// URL the cookie is written against: scheme from `secure`, host from the
    /// domain without its leading dot, then the path.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when the domain or path do not form a URL.
    pub fn target_url(&self) -> Result<Url, url::ParseError> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{}{}", self.host(), self.path))
    }

    /// Whether the cookie is a session cookie.
    #[must_use]
    pub fn is_session(&self) -> bool {
        self.expiration_date.is_none()
    }
}

impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("expiration_date", &self.expiration_date)
            .finish()
    }
}

/// Identity of a cookie: `(domain, name, path)`, rendered `domain|name|path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookieId {
    /// Cookie domain as stored.
    pub domain: String,
    /// Cookie name.
    pub name: String,
    /// Cookie path.
    pub path: String,
}

impl fmt::Display for CookieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.domain, self.name, self.path)
    }
}

/// Error parsing a `domain|name|path` identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cookie identity '{0}': expected domain|name|path")]
pub struct ParseCookieIdError(String);

impl FromStr for CookieId {
    type Err = ParseCookieIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.splitn(3, '|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(domain), Some(name), Some(path)) if !domain.is_empty() && !name.is_empty() => {
                Ok(Self {
                    domain: domain.to_string(),
                    name: name.to_string(),
                    path: if path.is_empty() {
                        default_path()
                    } else {
                        path.to_string()
                    },
                })
            }
            _ => Err(ParseCookieIdError(raw.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_omits_absent_expiration_and_same_site() {
        let cookie = CookieRecord::new("sid", "abc", "example.com", "/");
        let json = serde_json::to_value(&cookie).unwrap();
        assert!(json.get("expirationDate").is_none());
        assert!(json.get("sameSite").is_none());
        assert_eq!(json["httpOnly"], false);
    }

    #[test]
    fn test_deserialize_browser_export_fields() {
        let json = serde_json::json!({
            "name": "sid",
            "value": "abc",
            "domain": ".example.com",
            "path": "/app",
            "secure": true,
            "httpOnly": true,
            "sameSite": "no_restriction",
            "expirationDate": 1_900_000_000.5,
            "hostOnly": false,
            "storeId": "0"
        });
        let cookie: CookieRecord = serde_json::from_value(json).unwrap();
        assert_eq!(cookie.same_site, Some(SameSite::NoRestriction));
        assert_eq!(cookie.expiration_date, Some(1_900_000_000.5));
        assert!(cookie.http_only);
        assert_eq!(cookie.value(), "abc");
    }

    #[test]
    fn test_deserialize_unspecified_same_site_is_none() {
        let json = serde_json::json!({
            "name": "a", "value": "b", "domain": "x.com", "sameSite": "unspecified"
        });
        let cookie: CookieRecord = serde_json::from_value(json).unwrap();
        assert_eq!(cookie.same_site, None);
        assert_eq!(cookie.path, "/");
        assert!(!cookie.secure);
    }

    #[test]
    fn test_debug_redacts_value() {
        let cookie = CookieRecord::new("token", "super_secret_token", "example.com", "/");
        let debug = format!("{cookie:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret_token"));
    }

    #[test]
    fn test_target_url_strips_leading_dot_and_picks_scheme() {
        let mut cookie = CookieRecord::new("n", "v", ".secure.com", "/api");
        assert_eq!(cookie.target_url().unwrap().as_str(), "http://secure.com/api");
        cookie.secure = true;
        assert_eq!(cookie.target_url().unwrap().as_str(), "https://secure.com/api");
    }

    #[test]
    fn test_target_url_rejects_garbage_domain() {
        let cookie = CookieRecord::new("n", "v", "bad domain", "/");
        assert!(cookie.target_url().is_err());
    }

    #[test]
    fn test_cookie_id_display_and_parse() {
        let id = CookieRecord::new("sid", "v", ".example.com", "/").id();
        assert_eq!(id.to_string(), ".example.com|sid|/");
        assert_eq!(".example.com|sid|/".parse::<CookieId>().unwrap(), id);
    }

    #[test]
    fn test_cookie_id_parse_rejects_missing_parts() {
        assert!("example.com|sid".parse::<CookieId>().is_err());
        assert!("|sid|/".parse::<CookieId>().is_err());
    }
}
