use sqlx::SqliteConnection;

use crate::{
    db_types::{Dispute, Order, RefundObligation, RefundStatus},
    traits::LedgerError,
};

/// Creates the refund obligation for a resolved dispute, or returns the existing one if the
/// resolution was replayed.
pub async fn idempotent_insert_for_dispute(
    dispute: &Dispute,
    order: &Order,
    conn: &mut SqliteConnection,
) -> Result<(RefundObligation, bool), LedgerError> {
    if let Some(existing) = sqlx::query_as::<_, RefundObligation>("SELECT * FROM refunds WHERE dispute_id = $1")
        .bind(dispute.id)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok((existing, false));
    }
    let amount = dispute.refund_amount.ok_or(LedgerError::InvalidDisputeState(
        dispute.id,
        "resolved without a refund award".to_string(),
    ))?;
    let inserted = sqlx::query_as(
        "INSERT INTO refunds (dispute_id, order_id, seller_id, amount, currency, provider) VALUES ($1, $2, $3, $4, \
         $5, $6) RETURNING *",
    )
    .bind(dispute.id)
    .bind(order.order_id.as_str())
    .bind(order.seller_id)
    .bind(amount)
    .bind(&order.currency)
    .bind(order.payment_provider)
    .fetch_one(conn)
    .await?;
    Ok((inserted, true))
}

pub async fn fetch_refund(refund_id: i64, conn: &mut SqliteConnection) -> Result<Option<RefundObligation>, sqlx::Error> {
    let refund = sqlx::query_as("SELECT * FROM refunds WHERE id = $1").bind(refund_id).fetch_optional(conn).await?;
    Ok(refund)
}

/// Guarded refund status update. Legal moves: `Pending|Failed → Processing`,
/// `Processing → Completed` and `Processing → Failed`. Anything else finds zero rows and is
/// rejected with the refund's actual state.
pub async fn transition_status(
    refund_id: i64,
    to: RefundStatus,
    provider_ref: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<RefundObligation, LedgerError> {
    let query = match to {
        RefundStatus::Processing => {
            "UPDATE refunds SET status = 'Processing', updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status IN \
             ('Pending', 'Failed') RETURNING *"
        },
        RefundStatus::Completed => {
            "UPDATE refunds SET status = 'Completed', provider_ref = $1, updated_at = CURRENT_TIMESTAMP WHERE id = \
             $2 AND status = 'Processing' RETURNING *"
        },
        RefundStatus::Failed => {
            "UPDATE refunds SET status = 'Failed', updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = \
             'Processing' RETURNING *"
        },
        RefundStatus::Pending => {
            return Err(LedgerError::InvalidRefundState(refund_id, "cannot move a refund back to Pending".to_string()))
        },
    };
    let updated = sqlx::query_as::<_, RefundObligation>(query)
        .bind(provider_ref)
        .bind(refund_id)
        .fetch_optional(&mut *conn)
        .await?;
    match updated {
        Some(refund) => Ok(refund),
        None => {
            let existing = fetch_refund(refund_id, conn).await?.ok_or(LedgerError::RefundNotFound(refund_id))?;
            Err(LedgerError::InvalidRefundState(refund_id, existing.status.to_string()))
        },
    }
}
