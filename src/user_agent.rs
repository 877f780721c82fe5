//! Shared User-Agent string for backend HTTP clients.

/// Default User-Agent for all backend requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    format!("cookiesync/{}", env!("CARGO_PKG_VERSION"))
}
