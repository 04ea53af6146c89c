use crate::{
    db_types::{Dispute, Money, NewDispute, OrderId, RefundObligation, RefundStatus},
    traits::LedgerError,
};

/// Dispute and refund state machines.
///
/// A dispute runs `Pending → Reviewing → Resolved`; at most one non-resolved dispute may exist
/// per order. A refund obligation derived from a resolution runs
/// `Pending → Processing → Completed | Failed` and is created idempotently per dispute.
#[allow(async_fn_in_trait)]
pub trait DisputeManagement: Clone {
    /// Open a dispute for an order. Rejected with [`LedgerError::DisputeAlreadyOpen`] while
    /// another dispute on the same order is unresolved.
    async fn open_dispute(&self, dispute: NewDispute) -> Result<Dispute, LedgerError>;

    /// Move a dispute `Pending → Reviewing` (the respondent has answered, or a reviewer picked
    /// it up).
    async fn begin_dispute_review(&self, dispute_id: i64) -> Result<Dispute, LedgerError>;

    /// Resolve a dispute, recording the reviewer and an optional refund amount in the order's
    /// currency. Only `Reviewing` disputes can be resolved.
    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        resolved_by: &str,
        refund_amount: Option<Money>,
        note: Option<&str>,
    ) -> Result<Dispute, LedgerError>;

    /// Create the refund obligation for a resolved dispute, reusing an existing one if the
    /// resolution is replayed. The second slot is `false` when the refund already existed.
    async fn refund_for_dispute(&self, dispute_id: i64) -> Result<(RefundObligation, bool), LedgerError>;

    /// Transition a refund along its status chain. Guarded: only `Pending|Failed → Processing`,
    /// `Processing → Completed` (with the provider's reference) and `Processing → Failed` are
    /// accepted, so a midway crash leaves the obligation in its last discrete state for retry.
    async fn update_refund_status(
        &self,
        refund_id: i64,
        status: RefundStatus,
        provider_ref: Option<&str>,
    ) -> Result<RefundObligation, LedgerError>;

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, LedgerError>;

    async fn fetch_refund(&self, refund_id: i64) -> Result<Option<RefundObligation>, LedgerError>;

    /// The open (non-resolved) dispute for an order, if any.
    async fn open_dispute_for_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, LedgerError>;
}
