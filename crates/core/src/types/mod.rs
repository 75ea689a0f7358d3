//! Core value types for the coffee shop.
//!
//! Type-safe wrappers for identifiers, money, emails and the small enums that
//! travel over the API wire.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{LocalAmount, LocalCurrency, Usd};
pub use status::*;
