//! Cookie records, the cookie-store interface, and cookie file parsing.

mod import;
mod record;
mod store;

pub use import::{
    CookieFileFormat, CookieParseError, ParsedCookies, parse_cookie_file, render_netscape,
};
pub use record::{CookieId, CookieRecord, ParseCookieIdError, SameSite};
pub use store::{CookieStore, CookieStoreError, FileCookieStore, MemoryCookieStore};
