use chrono::{DateTime, Utc};

use crate::{
    db_types::{CommissionObligation, NewCommission, OrderId},
    traits::LedgerError,
};

/// Affiliate commission lifecycle: created at order time, held `Pending` until the order is
/// irreversibly complete, then released by an explicit settle; overdue obligations are swept into
/// the debt ledger.
#[allow(async_fn_in_trait)]
pub trait CommissionManagement: Clone {
    /// Record a commission obligation for an order line. Idempotent on (order, product): the
    /// second slot is `false` when the obligation already existed.
    async fn create_commission(&self, commission: NewCommission) -> Result<(CommissionObligation, bool), LedgerError>;

    /// Release a pending commission for payment.
    ///
    /// Hard preconditions, both rejected with an error rather than a warning:
    /// * the underlying order must be `Completed`;
    /// * the obligation must still be `Pending` (a duplicate settle is a
    ///   [`LedgerError::CommissionNotPending`] — no double payment).
    async fn settle_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError>;

    /// Mark pending obligations whose deadline passed before `now` as `Overdue`, returning them.
    async fn mark_overdue_commissions(&self, now: DateTime<Utc>) -> Result<Vec<CommissionObligation>, LedgerError>;

    /// Close out one overdue obligation after its amount has been recovered (or written off):
    /// `Overdue → Resolved`.
    async fn resolve_overdue_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError>;

    /// All commission obligations recorded against an order.
    async fn commissions_for_order(&self, order_id: &OrderId) -> Result<Vec<CommissionObligation>, LedgerError>;

    /// Fetch a single obligation.
    async fn fetch_commission(&self, commission_id: i64) -> Result<Option<CommissionObligation>, LedgerError>;
}
