//! Parsing of cookie files exported by browsers and browser extensions.
//!
//! Two input formats are recognised:
//! - JSON: a bare array of cookie objects, `{ "cookies": [...] }`, or a full
//!   snapshot document (extra keys are ignored).
//! - Netscape HTTP Cookie File: 7 TAB-separated fields per line, with the
//!   `#HttpOnly_` domain prefix written by curl and most browser exporters.

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::record::{CookieRecord, SameSite};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";
const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

/// Format detected while parsing a cookie file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieFileFormat {
    /// Netscape `cookies.txt`.
    Netscape,
    /// JSON export.
    Json,
}

/// Cookies recovered from a file, with per-entry warnings for skipped input.
#[derive(Debug)]
pub struct ParsedCookies {
    /// Valid cookies in file order.
    pub cookies: Vec<CookieRecord>,
    /// Human-readable reasons for every entry that was skipped.
    pub warnings: Vec<String>,
    /// Format the input was parsed as.
    pub format: CookieFileFormat,
}

/// Errors parsing a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieParseError {
    /// Input contained no data.
    #[error("cookie input is empty")]
    EmptyInput,
    /// JSON input did not match any known cookie export shape.
    #[error("invalid cookie JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Every data line or entry was rejected.
    #[error("no valid cookies found ({malformed_count} entries failed to parse)")]
    NoCookiesFound {
        /// Number of rejected entries.
        malformed_count: usize,
    },
}

/// Parses a cookie file in either supported format.
///
/// Malformed and expired entries are skipped and reported as warnings.
///
/// # Errors
///
/// Returns [`CookieParseError::EmptyInput`] for blank input,
/// [`CookieParseError::Json`] when JSON input has the wrong shape, and
/// [`CookieParseError::NoCookiesFound`] when entries exist but none are usable.
#[instrument(level = "debug", skip(input), fields(input_len = input.len()))]
pub fn parse_cookie_file(input: &str) -> Result<ParsedCookies, CookieParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CookieParseError::EmptyInput);
    }

    let now = unix_now();
    let (cookies, warnings, format, entry_count) = if looks_like_json(trimmed) {
        let (cookies, warnings, entry_count) = parse_json(trimmed, now)?;
        (cookies, warnings, CookieFileFormat::Json, entry_count)
    } else {
        let (cookies, warnings, entry_count) = parse_netscape(trimmed, now);
        (cookies, warnings, CookieFileFormat::Netscape, entry_count)
    };

    if cookies.is_empty() && entry_count > 0 {
        return Err(CookieParseError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    debug!(
        count = cookies.len(),
        skipped = warnings.len(),
        ?format,
        "cookie file parsed"
    );
    Ok(ParsedCookies {
        cookies,
        warnings,
        format,
    })
}

/// Renders cookies as a Netscape cookie file.
///
/// `sameSite` has no Netscape representation and is dropped.
#[must_use]
pub fn render_netscape(cookies: &[CookieRecord]) -> String {
    let mut out = String::from(NETSCAPE_HEADER);
    out.push('\n');
    for cookie in cookies {
        let domain = if cookie.http_only {
            format!("{HTTP_ONLY_PREFIX}{}", cookie.domain)
        } else {
            cookie.domain.clone()
        };
        let expires = cookie.expiration_date.map_or(0, normalized_expiry);
        let _ = writeln!(
            out,
            "{domain}\t{}\t{}\t{}\t{expires}\t{}\t{}",
            netscape_bool(cookie.domain.starts_with('.')),
            cookie.path,
            netscape_bool(cookie.secure),
            cookie.name,
            cookie.value()
        );
    }
    out
}

fn netscape_bool(flag: bool) -> &'static str {
    if flag { "TRUE" } else { "FALSE" }
}

fn looks_like_json(input: &str) -> bool {
    input.starts_with('[') || input.starts_with('{')
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

pub(crate) fn is_expired(cookie: &CookieRecord, now: u64) -> bool {
    cookie
        .expiration_date
        .is_some_and(|expiry| expiry > 0.0 && normalized_expiry(expiry) <= now)
}

fn normalized_expiry(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    format!("{:.0}", raw.floor()).parse::<u64>().unwrap_or(u64::MAX)
}

fn parse_netscape(input: &str, now: u64) -> (Vec<CookieRecord>, Vec<String>, usize) {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0;

    for (idx, raw_line) in input.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };
        data_lines += 1;

        match parse_netscape_line(line, http_only) {
            Ok(cookie) if is_expired(&cookie, now) => {
                warnings.push(format!(
                    "line {line_number}: skipped expired cookie '{}' for domain '{}'",
                    cookie.name, cookie.domain
                ));
            }
            Ok(cookie) => cookies.push(cookie),
            Err(reason) => {
                warn!(line = line_number, %reason, "skipping malformed cookie line");
                warnings.push(format!("line {line_number}: {reason}"));
            }
        }
    }

    (cookies, warnings, data_lines)
}

#[allow(clippy::cast_precision_loss)]
fn parse_netscape_line(line: &str, http_only: bool) -> Result<CookieRecord, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        ));
    }

    let &[domain, _tailmatch, path, secure, expires, name, value] = fields.as_slice() else {
        return Err("expected 7 TAB-separated fields".to_string());
    };
    if domain.is_empty() {
        return Err("domain field is empty".to_string());
    }
    if name.is_empty() {
        return Err("cookie name field is empty".to_string());
    }
    let secure = match secure {
        "TRUE" => true,
        "FALSE" => false,
        other => return Err(format!("secure field must be TRUE or FALSE, got '{other}'")),
    };
    let expires = expires
        .parse::<u64>()
        .map_err(|_| format!("expires field must be a non-negative integer, got '{expires}'"))?;

    let mut cookie = CookieRecord::new(name, value, domain, if path.is_empty() { "/" } else { path });
    cookie.secure = secure;
    cookie.http_only = http_only;
    cookie.expiration_date = (expires > 0).then_some(expires as f64);
    Ok(cookie)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCookiePayload {
    Array(Vec<JsonCookieEntry>),
    Wrapped { cookies: Vec<JsonCookieEntry> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonCookieEntry {
    domain: Option<String>,
    host: Option<String>,
    host_only: Option<bool>,
    path: Option<String>,
    secure: Option<bool>,
    http_only: Option<bool>,
    same_site: Option<String>,
    name: Option<String>,
    value: Option<String>,
    expiration_date: Option<f64>,
    expires: Option<f64>,
    session: Option<bool>,
}

fn parse_json(
    input: &str,
    now: u64,
) -> Result<(Vec<CookieRecord>, Vec<String>, usize), CookieParseError> {
    let entries = match serde_json::from_str::<JsonCookiePayload>(input)? {
        JsonCookiePayload::Array(entries) | JsonCookiePayload::Wrapped { cookies: entries } => {
            entries
        }
    };
    let entry_count = entries.len();

    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match convert_json_entry(entry) {
            Ok(cookie) if is_expired(&cookie, now) => warnings.push(format!(
                "entry {}: skipped expired cookie '{}' for domain '{}'",
                index + 1,
                cookie.name,
                cookie.domain
            )),
            Ok(cookie) => cookies.push(cookie),
            Err(reason) => warnings.push(format!("entry {}: {reason}", index + 1)),
        }
    }

    Ok((cookies, warnings, entry_count))
}

fn convert_json_entry(entry: JsonCookieEntry) -> Result<CookieRecord, String> {
    let mut domain = entry
        .domain
        .or(entry.host)
        .unwrap_or_default()
        .trim()
        .to_string();
    if let Some(stripped) = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
    {
        domain = stripped.to_string();
    }
    if let Some((host, _)) = domain.split_once('/') {
        domain = host.to_string();
    }
    if domain.is_empty() {
        return Err("missing required field: domain".to_string());
    }
    match entry.host_only {
        Some(true) => domain = domain.trim_start_matches('.').to_string(),
        Some(false) if !domain.starts_with('.') => domain = format!(".{domain}"),
        _ => {}
    }

    let name = entry.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err("missing required field: name".to_string());
    }

    let path = match entry.path {
        Some(path) if path.trim().is_empty() => "/".to_string(),
        Some(path) if !path.starts_with('/') => format!("/{path}"),
        Some(path) => path,
        None => "/".to_string(),
    };

    let mut cookie = CookieRecord::new(name, entry.value.unwrap_or_default(), domain, path);
    cookie.secure = entry.secure.unwrap_or(false);
    cookie.http_only = entry.http_only.unwrap_or(false);
    cookie.same_site = entry.same_site.as_deref().and_then(parse_same_site);
    cookie.expiration_date = if entry.session == Some(true) {
        None
    } else {
        entry
            .expiration_date
            .or(entry.expires)
            .filter(|expiry| expiry.is_finite() && *expiry > 0.0)
    };
    Ok(cookie)
}

fn parse_same_site(label: &str) -> Option<SameSite> {
    match label.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "no_restriction" | "none" => Some(SameSite::NoRestriction),
        _ => None,
    }
}
