use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, NewDebt, SellerDebt, SellerId},
    traits::LedgerError,
};

pub async fn insert_debt(debt: NewDebt, conn: &mut SqliteConnection) -> Result<SellerDebt, LedgerError> {
    let inserted: SellerDebt = sqlx::query_as(
        "INSERT INTO seller_debts (seller_id, cause, order_id, dispute_id, amount, outstanding) VALUES ($1, $2, $3, \
         $4, $5, $5) RETURNING *",
    )
    .bind(debt.seller_id)
    .bind(debt.cause)
    .bind(debt.order_id.map(|o| o.0))
    .bind(debt.dispute_id)
    .bind(debt.amount)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Debt #{} recorded against seller {}", inserted.id, inserted.seller_id);
    Ok(inserted)
}

pub async fn pending_debts(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Vec<SellerDebt>, sqlx::Error> {
    let debts = sqlx::query_as(
        "SELECT * FROM seller_debts WHERE seller_id = $1 AND status = 'Pending' ORDER BY created_at ASC, id ASC",
    )
    .bind(seller_id)
    .fetch_all(conn)
    .await?;
    Ok(debts)
}

pub async fn outstanding_total(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(outstanding), 0) FROM seller_debts WHERE seller_id = $1 AND status = 'Pending'")
            .bind(seller_id)
            .fetch_one(conn)
            .await?;
    Ok(Money::from(total))
}

pub async fn sellers_with_pending_debts(conn: &mut SqliteConnection) -> Result<Vec<SellerId>, sqlx::Error> {
    let ids = sqlx::query_scalar("SELECT DISTINCT seller_id FROM seller_debts WHERE status = 'Pending' ORDER BY seller_id")
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

/// Apply a recovered amount to a debt. The debt flips to `Collected` when nothing remains
/// outstanding. The guard (`outstanding >= $1`) means a concurrent collection cannot push the
/// balance negative.
pub async fn apply_collection(
    debt_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<SellerDebt, LedgerError> {
    let updated = sqlx::query_as::<_, SellerDebt>(
        "UPDATE seller_debts SET outstanding = outstanding - $1, status = CASE WHEN outstanding - $1 = 0 THEN \
         'Collected' ELSE status END, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = 'Pending' AND \
         outstanding >= $1 RETURNING *",
    )
    .bind(amount)
    .bind(debt_id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or_else(|| LedgerError::DatabaseError(format!("debt #{debt_id} could not absorb a collection of {amount}")))
}

/// Whether the seller has a pending debt older than `cutoff`. Feeds the `overdue_debt`
/// eligibility fact.
pub async fn has_debt_older_than(
    seller_id: SellerId,
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM seller_debts WHERE seller_id = $1 AND status = 'Pending' AND created_at < $2",
    )
    .bind(seller_id)
    .bind(cutoff)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}
