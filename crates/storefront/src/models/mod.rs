//! Session-held models for the storefront.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashLevel};
pub use session::{OrderPrefs, VisitorId, keys as session_keys};
