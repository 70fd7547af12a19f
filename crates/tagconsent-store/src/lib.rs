//! TagConsent Store: cookie jars and consent record persistence.
//!
//! The `CookieStore` trait abstracts over the cookie primitive. `MemoryCookieStore`
//! keeps the jar in process; `FileCookieStore` keeps it in a JSON file so a
//! record survives across runs. `ConsentCookie` is the persistence adapter that
//! reads and writes the encoded consent record through any store.

pub mod cookie;
pub mod file;
pub mod memory;
pub mod persistence;
pub mod store;

pub use cookie::{decode_component, encode_component, parse_cookie_header, Cookie};
pub use file::FileCookieStore;
pub use memory::MemoryCookieStore;
pub use persistence::ConsentCookie;
pub use store::CookieStore;
