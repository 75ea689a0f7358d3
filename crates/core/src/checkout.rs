//! Checkout: draft validation and the order → payment → return state machine.
//!
//! ```text
//! Editing ──begin_submit──▶ Submitting ──order_created──▶ AwaitingPaymentRedirect
//!    ▲                          │                                 │
//!    └──────network_failed──────┴─────────network_failed──────────┤
//!                                                                 │ (payment processor)
//!                                                                 ▼
//!                                     reconcile ──▶ Completed | Failed
//! ```
//!
//! `Completed` is absorbing for success returns: reconciling the same success a
//! second time clears nothing. A new submission may start from any state except
//! `Submitting`.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::types::{DeliveryMode, OrderId, PaymentStatus, Usd};

/// Delivery address validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Address is required")]
    Required,
}

/// Validate the address for a delivery mode.
///
/// Invalid iff the mode is [`DeliveryMode::Deliver`] and the trimmed address is
/// empty. Re-run on every change to either field.
///
/// # Errors
///
/// Returns [`AddressError::Required`] for a blank address under `Deliver`.
pub fn validate(mode: DeliveryMode, address: &str) -> Result<(), AddressError> {
    if mode.requires_address() && address.trim().is_empty() {
        return Err(AddressError::Required);
    }
    Ok(())
}

/// Total to display on the order page: zero for an empty order, otherwise the
/// subtotal plus the fee when delivering.
#[must_use]
pub fn display_total(subtotal: Usd, mode: DeliveryMode, fee: Usd) -> Usd {
    if subtotal.is_zero() {
        Usd::ZERO
    } else if mode.requires_address() {
        subtotal + fee
    } else {
        subtotal
    }
}

/// Why a draft order cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Some items are no longer available: {}", .0.join(", "))]
    UnknownProducts(Vec<String>),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// One priced order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Usd,
}

impl DraftLine {
    #[must_use]
    pub fn line_total(&self) -> Usd {
        self.unit_price * self.quantity
    }
}

/// An order ready to submit, derived from cart × catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub lines: Vec<DraftLine>,
    pub subtotal: Usd,
    pub mode: DeliveryMode,
    /// Trimmed address; `None` for pick-up.
    pub address: Option<String>,
    pub fee: Usd,
    /// Subtotal plus the fee when delivering. This is what the API is sent.
    pub total: Usd,
}

impl OrderDraft {
    /// Price the cart against the catalog.
    ///
    /// # Errors
    ///
    /// Fails without side effects if the cart is empty, if any line names a
    /// product the catalog no longer has, or if the address is invalid.
    pub fn build(
        cart: &Cart,
        catalog: &Catalog,
        mode: DeliveryMode,
        address: &str,
        delivery_fee: Usd,
    ) -> Result<Self, DraftError> {
        if cart.is_empty() {
            return Err(DraftError::EmptyCart);
        }

        let unknown = cart.unknown_products(catalog);
        if !unknown.is_empty() {
            return Err(DraftError::UnknownProducts(unknown));
        }

        validate(mode, address)?;

        let lines: Vec<DraftLine> = cart
            .iter()
            .filter_map(|(name, quantity)| {
                catalog.find_by_name(name).map(|product| DraftLine {
                    name: name.to_owned(),
                    quantity,
                    unit_price: product.price,
                })
            })
            .collect();

        let subtotal: Usd = lines.iter().map(DraftLine::line_total).sum();
        let fee = if mode.requires_address() {
            delivery_fee
        } else {
            Usd::ZERO
        };

        Ok(Self {
            lines,
            subtotal,
            mode,
            address: mode
                .requires_address()
                .then(|| address.trim().to_owned()),
            fee,
            total: subtotal + fee,
        })
    }

    /// Names of the ordered products, in cart order.
    #[must_use]
    pub fn item_names(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.name.clone()).collect()
    }
}

/// Where the checkout currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Editing,
    Submitting,
    /// Order created; the visitor is (or is about to be) at the payment processor.
    AwaitingPaymentRedirect {
        order_id: OrderId,
        item_names: Vec<String>,
    },
    Completed {
        order_id: Option<OrderId>,
        item_names: Vec<String>,
    },
    Failed {
        order_id: Option<OrderId>,
    },
}

/// Transition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("an order is already being submitted")]
    AlreadySubmitting,
    #[error("no submission in progress")]
    NotSubmitting,
}

/// How the payment processor sent the visitor back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReturn {
    /// `None` when the status parameter is absent or unrecognised.
    pub status: Option<PaymentStatus>,
    /// Whether the return was flagged as coming from the payment flow.
    pub from_payment: bool,
}

impl PaymentReturn {
    /// Read the `status` and `fromPayment` query values.
    #[must_use]
    pub fn from_query(status: Option<&str>, from_payment: Option<&str>) -> Self {
        let status = match status.map(str::trim) {
            Some("success") => Some(PaymentStatus::Success),
            Some("failed") => Some(PaymentStatus::Failed),
            _ => None,
        };
        Self {
            status,
            from_payment: from_payment.is_some_and(|f| f.trim() == "true"),
        }
    }
}

/// What reconciling a payment return did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Not a payment return: go home, nothing changed.
    DirectNavigation,
    /// Payment succeeded. `cleared` is false when this success was already
    /// reconciled.
    Completed {
        cleared: bool,
        order_id: Option<OrderId>,
        item_names: Vec<String>,
    },
    /// Payment failed; the cart is untouched.
    Failed { order_id: Option<OrderId> },
}

/// The checkout state machine for one visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFlow {
    state: CheckoutState,
}

impl CheckoutFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Whether the submit control must be disabled.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.state, CheckoutState::Submitting)
    }

    /// Enter `Submitting`.
    ///
    /// # Errors
    ///
    /// Rejects a second submission while one is in flight.
    pub fn begin_submit(&mut self) -> Result<(), CheckoutError> {
        if self.is_submitting() {
            return Err(CheckoutError::AlreadySubmitting);
        }
        self.state = CheckoutState::Submitting;
        Ok(())
    }

    /// The order service accepted the order.
    ///
    /// # Errors
    ///
    /// Fails if no submission was in progress.
    pub fn order_created(
        &mut self,
        order_id: OrderId,
        item_names: Vec<String>,
    ) -> Result<(), CheckoutError> {
        if !self.is_submitting() {
            return Err(CheckoutError::NotSubmitting);
        }
        self.state = CheckoutState::AwaitingPaymentRedirect {
            order_id,
            item_names,
        };
        Ok(())
    }

    /// Order creation or payment initiation failed: back to editing.
    pub fn network_failed(&mut self) {
        self.state = CheckoutState::Editing;
    }

    /// Back on the order page after a payment outcome: edit again.
    ///
    /// A submission or a pending payment redirect is left alone.
    pub fn resume_editing(&mut self) {
        if matches!(
            self.state,
            CheckoutState::Completed { .. } | CheckoutState::Failed { .. }
        ) {
            self.state = CheckoutState::Editing;
        }
    }

    /// The pending order, if the visitor was sent to the payment processor.
    #[must_use]
    pub const fn pending_order(&self) -> Option<&OrderId> {
        match &self.state {
            CheckoutState::AwaitingPaymentRedirect { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    /// Reconcile a return from the payment processor.
    ///
    /// Success empties `cart` exactly once; a repeated success leaves it alone.
    /// Failure leaves `cart` untouched so the visitor can retry.
    pub fn reconcile(&mut self, ret: PaymentReturn, cart: &mut Cart) -> ReconcileOutcome {
        let status = match ret {
            PaymentReturn {
                status: Some(status),
                from_payment: true,
            } => status,
            _ => return ReconcileOutcome::DirectNavigation,
        };

        match status {
            PaymentStatus::Success => {
                if let CheckoutState::Completed {
                    order_id,
                    item_names,
                } = &self.state
                {
                    return ReconcileOutcome::Completed {
                        cleared: false,
                        order_id: order_id.clone(),
                        item_names: item_names.clone(),
                    };
                }

                let (order_id, item_names) = match std::mem::take(&mut self.state) {
                    CheckoutState::AwaitingPaymentRedirect {
                        order_id,
                        item_names,
                    } => (Some(order_id), item_names),
                    _ => (None, cart.names().map(ToOwned::to_owned).collect()),
                };

                cart.empty();
                self.state = CheckoutState::Completed {
                    order_id: order_id.clone(),
                    item_names: item_names.clone(),
                };
                ReconcileOutcome::Completed {
                    cleared: true,
                    order_id,
                    item_names,
                }
            }
            PaymentStatus::Failed => {
                let order_id = match &self.state {
                    CheckoutState::AwaitingPaymentRedirect { order_id, .. } => {
                        Some(order_id.clone())
                    }
                    CheckoutState::Failed { order_id } => order_id.clone(),
                    _ => None,
                };
                self.state = CheckoutState::Failed {
                    order_id: order_id.clone(),
                };
                ReconcileOutcome::Failed { order_id }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::types::ProductId;

    const FEE: Usd = Usd::new(rust_decimal::Decimal::ONE);

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Product::new(ProductId::new("1"), "Latte", "Coffee", Usd::from_cents(450)),
            Product::new(ProductId::new("2"), "Muffin", "Bakery", Usd::from_cents(325)),
        ])
    }

    fn success() -> PaymentReturn {
        PaymentReturn::from_query(Some("success"), Some("true"))
    }

    #[test]
    fn test_validate_address() {
        assert_eq!(validate(DeliveryMode::Deliver, "   "), Err(AddressError::Required));
        assert!(validate(DeliveryMode::Deliver, "123 Main St").is_ok());
        assert!(validate(DeliveryMode::PickUp, "").is_ok());
    }

    #[test]
    fn test_switching_to_pickup_clears_address_error() {
        let address = "";
        assert!(validate(DeliveryMode::Deliver, address).is_err());
        assert!(validate(DeliveryMode::PickUp, address).is_ok());
    }

    #[test]
    fn test_display_total() {
        assert_eq!(display_total(Usd::ZERO, DeliveryMode::Deliver, FEE), Usd::ZERO);
        assert_eq!(
            display_total(Usd::from_cents(900), DeliveryMode::Deliver, FEE),
            Usd::from_cents(1000)
        );
        assert_eq!(
            display_total(Usd::from_cents(900), DeliveryMode::PickUp, FEE),
            Usd::from_cents(900)
        );
    }

    #[test]
    fn test_build_rejects_empty_cart() {
        let err = OrderDraft::build(&Cart::new(), &catalog(), DeliveryMode::PickUp, "", FEE);
        assert_eq!(err, Err(DraftError::EmptyCart));
    }

    #[test]
    fn test_build_rejects_unknown_products() {
        let mut cart = Cart::new();
        cart.add("Latte", 1);
        cart.add("Retired Mocha", 1);
        let err = OrderDraft::build(&cart, &catalog(), DeliveryMode::PickUp, "", FEE).unwrap_err();
        assert_eq!(err, DraftError::UnknownProducts(vec!["Retired Mocha".to_string()]));
        assert_eq!(err.to_string(), "Some items are no longer available: Retired Mocha");
    }

    #[test]
    fn test_pickup_has_no_fee_or_address() {
        let mut cart = Cart::new();
        cart.add("Muffin", 2);
        let draft =
            OrderDraft::build(&cart, &catalog(), DeliveryMode::PickUp, "ignored", FEE).unwrap();
        assert_eq!(draft.fee, Usd::ZERO);
        assert_eq!(draft.total, Usd::from_cents(650));
        assert_eq!(draft.address, None);
    }

    #[test]
    fn test_end_to_end_delivery_total() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let mut flow = CheckoutFlow::new();

        cart.add("Latte", 2);

        let blocked = OrderDraft::build(&cart, &catalog, DeliveryMode::Deliver, "", FEE);
        assert_eq!(blocked, Err(DraftError::Address(AddressError::Required)));
        assert_eq!(flow.state(), &CheckoutState::Editing);

        let draft =
            OrderDraft::build(&cart, &catalog, DeliveryMode::Deliver, " 123 Main St ", FEE)
                .unwrap();
        assert_eq!(draft.subtotal, Usd::from_cents(900));
        assert_eq!(draft.total, Usd::from_cents(1000));
        assert_eq!(draft.address.as_deref(), Some("123 Main St"));

        flow.begin_submit().unwrap();
        assert_eq!(flow.begin_submit(), Err(CheckoutError::AlreadySubmitting));
        flow.order_created(OrderId::new("ord-1"), draft.item_names()).unwrap();
        assert_eq!(flow.pending_order(), Some(&OrderId::new("ord-1")));
        assert_eq!(cart.quantity("Latte"), 2);
    }

    #[test]
    fn test_network_failure_returns_to_editing_without_touching_cart() {
        let mut cart = Cart::new();
        cart.add("Latte", 1);
        let mut flow = CheckoutFlow::new();

        flow.begin_submit().unwrap();
        flow.network_failed();

        assert_eq!(flow.state(), &CheckoutState::Editing);
        assert_eq!(cart.quantity("Latte"), 1);
    }

    #[test]
    fn test_order_created_requires_submission() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(
            flow.order_created(OrderId::new("x"), vec![]),
            Err(CheckoutError::NotSubmitting)
        );
    }

    #[test]
    fn test_direct_navigation_has_no_side_effects() {
        let mut cart = Cart::new();
        cart.add("Latte", 1);
        let mut flow = CheckoutFlow::new();

        let outcome = flow.reconcile(PaymentReturn::from_query(Some("success"), None), &mut cart);
        assert_eq!(outcome, ReconcileOutcome::DirectNavigation);

        let outcome = flow.reconcile(PaymentReturn::from_query(None, Some("true")), &mut cart);
        assert_eq!(outcome, ReconcileOutcome::DirectNavigation);

        assert_eq!(cart.quantity("Latte"), 1);
        assert_eq!(flow.state(), &CheckoutState::Editing);
    }

    #[test]
    fn test_failed_payment_keeps_cart() {
        let mut cart = Cart::new();
        cart.add("Latte", 2);
        let mut flow = CheckoutFlow::new();
        flow.begin_submit().unwrap();
        flow.order_created(OrderId::new("ord-9"), vec!["Latte".to_string()]).unwrap();

        let outcome = flow.reconcile(PaymentReturn::from_query(Some("failed"), Some("true")), &mut cart);

        assert_eq!(
            outcome,
            ReconcileOutcome::Failed {
                order_id: Some(OrderId::new("ord-9"))
            }
        );
        assert_eq!(cart.quantity("Latte"), 2);

        // retry is allowed after a failure
        assert!(flow.begin_submit().is_ok());
    }

    #[test]
    fn test_success_clears_cart_exactly_once() {
        let mut cart = Cart::new();
        cart.add("Latte", 2);
        let mut flow = CheckoutFlow::new();
        flow.begin_submit().unwrap();
        flow.order_created(OrderId::new("ord-1"), vec!["Latte".to_string()]).unwrap();

        let first = flow.reconcile(success(), &mut cart);
        assert!(matches!(first, ReconcileOutcome::Completed { cleared: true, .. }));
        assert!(cart.is_empty());

        cart.add("Muffin", 1);
        let second = flow.reconcile(success(), &mut cart);
        assert_eq!(
            second,
            ReconcileOutcome::Completed {
                cleared: false,
                order_id: Some(OrderId::new("ord-1")),
                item_names: vec!["Latte".to_string()],
            }
        );
        assert_eq!(cart.quantity("Muffin"), 1);
    }

    #[test]
    fn test_success_without_pending_order_clears_once() {
        let mut cart = Cart::new();
        cart.add("Muffin", 3);
        let mut flow = CheckoutFlow::new();

        let outcome = flow.reconcile(success(), &mut cart);
        assert_eq!(
            outcome,
            ReconcileOutcome::Completed {
                cleared: true,
                order_id: None,
                item_names: vec!["Muffin".to_string()],
            }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_resume_editing_after_outcome() {
        let mut cart = Cart::new();
        cart.add("Latte", 1);
        let mut flow = CheckoutFlow::new();
        flow.reconcile(PaymentReturn::from_query(Some("failed"), Some("true")), &mut cart);
        flow.resume_editing();
        assert_eq!(flow.state(), &CheckoutState::Editing);

        flow.begin_submit().unwrap();
        flow.resume_editing();
        assert!(flow.is_submitting());
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let mut flow = CheckoutFlow::new();
        flow.begin_submit().unwrap();
        flow.order_created(OrderId::new("o1"), vec!["Latte".to_string()]).unwrap();

        let json = serde_json::to_value(&flow).unwrap();
        assert_eq!(json["state"]["state"], "awaiting_payment_redirect");

        let back: CheckoutFlow = serde_json::from_value(json).unwrap();
        assert_eq!(back, flow);
    }
}
