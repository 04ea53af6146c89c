use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CommissionObligation, CommissionStatus, NewCommission, OrderId},
    traits::LedgerError,
};

/// Inserts a commission obligation, returning `false` in the second slot if one already exists
/// for the (order, product) pair.
pub async fn idempotent_insert(
    commission: NewCommission,
    conn: &mut SqliteConnection,
) -> Result<(CommissionObligation, bool), LedgerError> {
    if let Some(existing) = sqlx::query_as::<_, CommissionObligation>(
        "SELECT * FROM commissions WHERE order_id = $1 AND product_id = $2",
    )
    .bind(commission.order_id.as_str())
    .bind(&commission.product_id)
    .fetch_optional(&mut *conn)
    .await?
    {
        return Ok((existing, false));
    }
    let inserted: CommissionObligation = sqlx::query_as(
        "INSERT INTO commissions (order_id, product_id, affiliate_id, seller_id, rate_bps, amount, due_at) VALUES \
         ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(commission.order_id.as_str())
    .bind(commission.product_id)
    .bind(commission.affiliate_id)
    .bind(commission.seller_id)
    .bind(commission.rate_bps)
    .bind(commission.amount)
    .bind(commission.due_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Commission #{} recorded on order [{}]", inserted.id, inserted.order_id);
    Ok((inserted, true))
}

pub async fn fetch_commission(
    commission_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CommissionObligation>, sqlx::Error> {
    let commission =
        sqlx::query_as("SELECT * FROM commissions WHERE id = $1").bind(commission_id).fetch_optional(conn).await?;
    Ok(commission)
}

pub async fn commissions_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionObligation>, sqlx::Error> {
    let commissions = sqlx::query_as("SELECT * FROM commissions WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(commissions)
}

/// Guarded status transition. Finding zero rows means the obligation was not in `from` anymore,
/// which for `Pending → Settled` is exactly the duplicate-settle case.
pub async fn transition_status(
    commission_id: i64,
    from: CommissionStatus,
    to: CommissionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<CommissionObligation>, sqlx::Error> {
    let updated = sqlx::query_as(
        "UPDATE commissions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to)
    .bind(commission_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

/// Flip pending obligations past their deadline to `Overdue`, returning the affected rows.
pub async fn mark_overdue(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionObligation>, sqlx::Error> {
    let overdue = sqlx::query_as(
        "UPDATE commissions SET status = 'Overdue', updated_at = CURRENT_TIMESTAMP WHERE status = 'Pending' AND \
         due_at < $1 RETURNING *",
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(overdue)
}
