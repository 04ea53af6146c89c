use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Dispute, DisputeStatus, Money, NewDispute, OrderId, SellerId},
    traits::LedgerError,
};

/// Opens a dispute. The partial unique index on open disputes turns a second open dispute for
/// the same order into a constraint violation, which surfaces as
/// [`LedgerError::DisputeAlreadyOpen`].
pub async fn insert_dispute(
    dispute: NewDispute,
    seller_id: SellerId,
    conn: &mut SqliteConnection,
) -> Result<Dispute, LedgerError> {
    let order_id = dispute.order_id.clone();
    let result = sqlx::query_as(
        "INSERT INTO disputes (order_id, seller_id, opened_by, reason) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(dispute.order_id.as_str())
    .bind(seller_id)
    .bind(dispute.opened_by)
    .bind(dispute.reason)
    .fetch_one(conn)
    .await;
    match result {
        Ok(dispute) => Ok(dispute),
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => Err(LedgerError::DisputeAlreadyOpen(order_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_dispute(dispute_id: i64, conn: &mut SqliteConnection) -> Result<Option<Dispute>, sqlx::Error> {
    let dispute = sqlx::query_as("SELECT * FROM disputes WHERE id = $1").bind(dispute_id).fetch_optional(conn).await?;
    Ok(dispute)
}

pub async fn open_dispute_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Dispute>, sqlx::Error> {
    let dispute = sqlx::query_as("SELECT * FROM disputes WHERE order_id = $1 AND status != 'Resolved'")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(dispute)
}

/// `Pending → Reviewing`, guarded.
pub async fn begin_review(dispute_id: i64, conn: &mut SqliteConnection) -> Result<Dispute, LedgerError> {
    let updated = sqlx::query_as::<_, Dispute>(
        "UPDATE disputes SET status = 'Reviewing', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND status = \
         'Pending' RETURNING *",
    )
    .bind(dispute_id)
    .fetch_optional(&mut *conn)
    .await?;
    require_transition(updated, dispute_id, conn).await
}

/// `Reviewing → Resolved`, guarded, recording the verdict.
pub async fn resolve(
    dispute_id: i64,
    resolved_by: &str,
    refund_amount: Option<Money>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Dispute, LedgerError> {
    let updated = sqlx::query_as::<_, Dispute>(
        "UPDATE disputes SET status = 'Resolved', resolved_by = $1, refund_amount = $2, resolution_note = $3, \
         updated_at = CURRENT_TIMESTAMP WHERE id = $4 AND status = 'Reviewing' RETURNING *",
    )
    .bind(resolved_by)
    .bind(refund_amount)
    .bind(note)
    .bind(dispute_id)
    .fetch_optional(&mut *conn)
    .await?;
    let dispute = require_transition(updated, dispute_id, conn).await?;
    debug!("🗃️ Dispute #{} resolved by {resolved_by}", dispute.id);
    Ok(dispute)
}

async fn require_transition(
    updated: Option<Dispute>,
    dispute_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Dispute, LedgerError> {
    match updated {
        Some(dispute) => Ok(dispute),
        None => {
            let existing = fetch_dispute(dispute_id, conn).await?.ok_or(LedgerError::DisputeNotFound(dispute_id))?;
            Err(LedgerError::InvalidDisputeState(dispute_id, existing.status.to_string()))
        },
    }
}

pub async fn dispute_status(dispute_id: i64, conn: &mut SqliteConnection) -> Result<Option<DisputeStatus>, sqlx::Error> {
    let status = sqlx::query_scalar("SELECT status FROM disputes WHERE id = $1").bind(dispute_id).fetch_optional(conn).await?;
    Ok(status)
}
