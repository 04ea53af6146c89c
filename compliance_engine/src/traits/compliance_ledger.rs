use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{DepositLot, Money, NewDepositLot, NewOrder, Order, OrderId, OrderStatusType, SellerId},
    traits::{
        data_objects::{DepositCheck, EligibilityUpdate},
        SellerApiError,
    },
};

/// The highest-level behaviour a backend must expose to act as the compliance ledger.
///
/// This covers:
/// * Order intake with the collateral gate (run under a per-seller serialization guard).
/// * The order lifecycle transitions that move exposure on and off the books.
/// * The deposit lot lifecycle.
/// * The single authorized write path for payout eligibility.
///
/// There is deliberately no raw eligibility setter on this trait (or anywhere else public):
/// [`ComplianceLedger::update_payout_eligibility`] recomputes from facts, persists, and verifies
/// in one transaction, so a component that wants eligibility to reflect new facts has exactly one
/// thing it can call.
#[allow(async_fn_in_trait)]
pub trait ComplianceLedger: Clone {
    /// The URL of the backing datastore.
    fn url(&self) -> &str;

    /// Evaluate the collateral requirement for a prospective order and, if collateral covers the
    /// new total exposure, insert the order atomically.
    ///
    /// The whole read-compare-insert runs under the seller's serialization guard so that two
    /// concurrent order creations cannot both pass the check and jointly exceed collateral.
    ///
    /// Returns the check outcome and the inserted order (`None` when the gate blocked it).
    /// Any datastore or rate-lookup failure propagates as an error — the gate never defaults to
    /// "requirement satisfied".
    async fn process_new_order(&self, order: NewOrder) -> Result<(DepositCheck, Option<Order>), LedgerError>;

    /// Evaluate the collateral requirement without inserting anything. Also run under the
    /// seller's serialization guard.
    async fn evaluate_deposit_requirement(
        &self,
        seller_id: SellerId,
        prospective: Money,
        currency: &str,
    ) -> Result<DepositCheck, LedgerError>;

    /// Transition an order `Paid → Shipped`.
    async fn mark_order_shipped(&self, order_id: &OrderId) -> Result<Order, LedgerError>;

    /// Transition an order into the terminal `Completed` state. Commission obligations for the
    /// order become settleable from this point.
    async fn complete_order(&self, order_id: &OrderId) -> Result<Order, LedgerError>;

    /// Transition an order into the terminal `Cancelled` state, releasing its exposure.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, LedgerError>;

    /// Record a funded deposit lot. Idempotent on the provider reference: re-posting the same
    /// funding event returns the existing lot with `false` in the second slot.
    async fn create_deposit_lot(&self, lot: NewDepositLot) -> Result<(DepositLot, bool), LedgerError>;

    /// Fetch a single deposit lot.
    async fn fetch_deposit_lot(&self, lot_id: i64) -> Result<Option<DepositLot>, LedgerError>;

    /// Mark a held lot as refundable. Runs under the seller guard and is rejected while the
    /// seller's remaining collateral would no longer cover their exposure.
    async fn release_deposit_lot(&self, lot_id: i64) -> Result<DepositLot, LedgerError>;

    /// Seller-initiated refund request: `Refundable → Refunding`. Requires a past
    /// `refundable_after`. The guarded update means only one outstanding `Refunding` transition
    /// can exist per lot.
    async fn request_deposit_refund(&self, lot_id: i64, seller_id: SellerId) -> Result<DepositLot, LedgerError>;

    /// Finish a refund after the provider call succeeded: `Refunding → Refunded`, recording the
    /// fee charged and the amount actually returned.
    async fn complete_deposit_refund(
        &self,
        lot_id: i64,
        refund_fee: Money,
        refunded_amount: Money,
    ) -> Result<DepositLot, LedgerError>;

    /// The one legal mutator of the payout eligibility field.
    ///
    /// In a single transaction under the seller guard: read the facts, compute the eligibility,
    /// persist it, then re-read and verify the stored value matches the computed one. A mismatch
    /// surfaces as [`LedgerError::EligibilityWriteRace`] and requires operator attention.
    ///
    /// On any read failure the result is `Blocked` (fail closed).
    async fn update_payout_eligibility(&self, seller_id: SellerId) -> Result<EligibilityUpdate, LedgerError>;

    /// Expire subscriptions that lapsed before `now`, returning the affected sellers. Callers
    /// must follow up with an eligibility recompute for each.
    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<SellerId>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    SellerError(#[from] SellerApiError),
    #[error("The requested seller {0} does not exist")]
    SellerNotFound(SellerId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot insert order {0}, it already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} cannot move from {1} to {2}")]
    InvalidOrderTransition(OrderId, OrderStatusType, OrderStatusType),
    #[error("The requested deposit lot {0} does not exist")]
    LotNotFound(i64),
    #[error("Deposit lot {lot_id} is {actual}, expected {expected}")]
    InvalidLotState { lot_id: i64, expected: String, actual: String },
    #[error("Deposit lot {0} is not yet past its refundable-after date")]
    LotNotYetRefundable(i64),
    #[error("Deposit lot {0} is still securing outstanding exposure and cannot be released")]
    LotStillSecuringExposure(i64),
    #[error("Deposit lot {0} does not belong to seller {1}")]
    LotOwnershipMismatch(i64, SellerId),
    #[error("No exchange rate is known for currency {0}")]
    UnknownCurrency(String),
    #[error(
        "The eligibility value persisted for seller {0} does not match the computed value. A second writer is racing \
         the update."
    )]
    EligibilityWriteRace(SellerId),
    #[error("Amounts in currency {0} cannot be combined with {1} without conversion")]
    CurrencyMismatch(String, String),
    #[error("The requested commission obligation {0} does not exist")]
    CommissionNotFound(i64),
    #[error("Commission obligation {0} is not pending and cannot be settled again")]
    CommissionNotPending(i64),
    #[error("Commission obligation {0} cannot be settled because order {1} is not completed")]
    CommissionOrderNotCompleted(i64, OrderId),
    #[error("Commission obligation {0} is not overdue")]
    CommissionNotOverdue(i64),
    #[error("The requested dispute {0} does not exist")]
    DisputeNotFound(i64),
    #[error("Order {0} already has an open dispute")]
    DisputeAlreadyOpen(OrderId),
    #[error("Dispute {0} is {1}, which does not permit this action")]
    InvalidDisputeState(i64, String),
    #[error("The payment provider call failed: {0}")]
    ProviderError(String),
    #[error("The requested refund {0} does not exist")]
    RefundNotFound(i64),
    #[error("Refund {0} is {1}, which does not permit this action")]
    InvalidRefundState(i64, String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
