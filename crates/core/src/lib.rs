//! Coffee Shop Core - storefront types and state machines.
//!
//! Everything here is pure: no I/O, no HTTP clients, no clocks except the ones
//! passed in. The storefront crate wires these machines to sessions and to the
//! remote coffee-shop API.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, emails and wire enums
//! - [`auth`] - Bearer token decoding and the auth session state machine
//! - [`guard`] - Route guard decision for screens that need a session
//! - [`cart`] - Product name → quantity bookkeeping
//! - [`catalog`] - Products, category chips and browse filtering
//! - [`checkout`] - Address validation, order drafts and the payment flow
//! - [`chat`] - Chat transcript and cart directives from the agent
//! - [`order`] - Placed orders
//! - [`profile`] - Account details and re-authentication rule

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod guard;
pub mod order;
pub mod profile;
pub mod types;

pub use auth::{AuthSession, AuthState, BearerToken, Identity, TokenError};
pub use cart::{Cart, CartLine};
pub use catalog::{Catalog, Category, Filter, Product};
pub use chat::{CartDirective, ChatMessage, ChatReply, ChatSession};
pub use checkout::{CheckoutFlow, CheckoutState, OrderDraft, PaymentReturn, ReconcileOutcome};
pub use guard::GuardDecision;
pub use order::{OrderItem, OrderRecord};
pub use profile::Profile;
pub use types::*;
