use crate::{
    db_types::{Money, NewDebt, SellerDebt, SellerId},
    traits::{
        data_objects::{DebtCollection, PayoutAdjustment},
        LedgerError,
    },
};

/// Debt creation and the two recovery paths.
///
/// Debts accumulate until a collection opportunity arises; failure to collect is never an error.
/// The two entry points have different timing rules: deposits may be drained opportunistically at
/// any time, but a payout is only ever adjusted at the moment of disbursement — never clawed back
/// afterwards.
#[allow(async_fn_in_trait)]
pub trait DebtManagement: Clone {
    /// Record a new debt. Debts are append-only once created.
    async fn create_debt(&self, debt: NewDebt) -> Result<SellerDebt, LedgerError>;

    /// Drain available (held or refundable, non-forfeited) collateral against the seller's
    /// pending debts, oldest lot first, partial consumption allowed.
    ///
    /// The debt list is read freshly inside the same transaction that consumes the collateral.
    /// Amount conservation holds: collected + remaining outstanding equals the outstanding total
    /// before the call.
    async fn collect_from_deposits(&self, seller_id: SellerId) -> Result<DebtCollection, LedgerError>;

    /// Deduct outstanding pending debt from an about-to-be-disbursed payout, capped at the payout
    /// amount. Must be invoked synchronously in the payout path, before funds leave the platform.
    ///
    /// Payouts are disbursed in platform currency; any other `currency` is rejected with
    /// [`LedgerError::CurrencyMismatch`].
    async fn collect_from_payout(
        &self,
        seller_id: SellerId,
        payout: Money,
        currency: &str,
    ) -> Result<PayoutAdjustment, LedgerError>;

    /// Sellers that currently have at least one pending debt. Feeds the periodic collection
    /// sweep.
    async fn sellers_with_pending_debts(&self) -> Result<Vec<SellerId>, LedgerError>;

    /// All debts still pending for the seller, oldest first.
    async fn pending_debts(&self, seller_id: SellerId) -> Result<Vec<SellerDebt>, LedgerError>;

    /// The total outstanding amount across the seller's pending debts, in platform currency.
    async fn outstanding_debt(&self, seller_id: SellerId) -> Result<Money, LedgerError>;
}
