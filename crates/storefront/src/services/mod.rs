//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Login, registration, logout and forced re-authentication
//! - `cart` - Per-visitor in-memory carts
//! - `checkout` - Order submission and payment hand-off
//! - `chat` - Chat transcript, agent calls and recommendations
//! - `in_flight` - Guards against double submission and overlapping chat sends

pub mod auth;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod in_flight;

pub use auth::{AuthError, AuthService, RevokedTokens};
pub use cart::CartStore;
pub use chat::{ChatError, ChatService, SendOutcome};
pub use checkout::{CheckoutService, PaymentRedirect, SubmitError};
pub use in_flight::{Action, InFlight, InFlightGuard};
