use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DepositLot, DepositLotStatus, Money, NewDepositLot, SellerId},
    traits::LedgerError,
};

/// Inserts a deposit lot, returning `false` in the second slot if the provider reference was
/// already recorded. Funding webhooks replay; collateral must not double-count.
pub async fn idempotent_insert(
    lot: NewDepositLot,
    conn: &mut SqliteConnection,
) -> Result<(DepositLot, bool), LedgerError> {
    if let Some(existing) = sqlx::query_as::<_, DepositLot>("SELECT * FROM deposit_lots WHERE provider_ref = $1")
        .bind(&lot.provider_ref)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok((existing, false));
    }
    let inserted: DepositLot = sqlx::query_as(
        "INSERT INTO deposit_lots (seller_id, amount, provider, provider_ref, refundable_after) VALUES ($1, $2, $3, \
         $4, $5) RETURNING *",
    )
    .bind(lot.seller_id)
    .bind(lot.amount)
    .bind(lot.provider)
    .bind(lot.provider_ref)
    .bind(lot.refundable_after)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Deposit lot #{} recorded for seller {}", inserted.id, inserted.seller_id);
    Ok((inserted, true))
}

pub async fn fetch_lot(lot_id: i64, conn: &mut SqliteConnection) -> Result<Option<DepositLot>, sqlx::Error> {
    let lot = sqlx::query_as("SELECT * FROM deposit_lots WHERE id = $1").bind(lot_id).fetch_optional(conn).await?;
    Ok(lot)
}

pub async fn lots_for_seller(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Vec<DepositLot>, sqlx::Error> {
    let lots = sqlx::query_as("SELECT * FROM deposit_lots WHERE seller_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(lots)
}

/// The seller's available collateral: the unforfeited remainder of held and refundable lots, in
/// platform currency.
pub async fn available_collateral(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount - forfeited_amount), 0) FROM deposit_lots WHERE seller_id = $1 AND status IN \
         ('Held', 'Refundable')",
    )
    .bind(seller_id)
    .fetch_one(conn)
    .await?;
    Ok(Money::from(total))
}

/// Lots with collectable value, oldest first. Collection consumes in this order.
pub async fn collectable_lots(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Vec<DepositLot>, sqlx::Error> {
    let lots = sqlx::query_as(
        "SELECT * FROM deposit_lots WHERE seller_id = $1 AND status IN ('Held', 'Refundable') AND amount > \
         forfeited_amount ORDER BY created_at ASC, id ASC",
    )
    .bind(seller_id)
    .fetch_all(conn)
    .await?;
    Ok(lots)
}

/// Guarded single-step status transition. The `WHERE status` clause means a racing transition
/// finds zero rows instead of skipping a state.
pub async fn transition_status(
    lot_id: i64,
    from: DepositLotStatus,
    to: DepositLotStatus,
    conn: &mut SqliteConnection,
) -> Result<DepositLot, LedgerError> {
    let updated = sqlx::query_as::<_, DepositLot>(
        "UPDATE deposit_lots SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to)
    .bind(lot_id)
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(lot) => Ok(lot),
        None => {
            let existing = fetch_lot(lot_id, conn).await?.ok_or(LedgerError::LotNotFound(lot_id))?;
            Err(LedgerError::InvalidLotState {
                lot_id,
                expected: from.to_string(),
                actual: existing.status.to_string(),
            })
        },
    }
}

/// `Refundable → Refunding`, guarded on ownership and on the hold period having lapsed.
pub async fn begin_refund(
    lot_id: i64,
    seller_id: SellerId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DepositLot, LedgerError> {
    let lot = fetch_lot(lot_id, &mut *conn).await?.ok_or(LedgerError::LotNotFound(lot_id))?;
    if lot.seller_id != seller_id {
        return Err(LedgerError::LotOwnershipMismatch(lot_id, seller_id));
    }
    if lot.refundable_after > now {
        return Err(LedgerError::LotNotYetRefundable(lot_id));
    }
    transition_status(lot_id, DepositLotStatus::Refundable, DepositLotStatus::Refunding, conn).await
}

/// `Refunding → Refunded`, recording the fee withheld and the amount returned.
pub async fn complete_refund(
    lot_id: i64,
    refund_fee: Money,
    refunded_amount: Money,
    conn: &mut SqliteConnection,
) -> Result<DepositLot, LedgerError> {
    let updated = sqlx::query_as::<_, DepositLot>(
        "UPDATE deposit_lots SET status = 'Refunded', refund_fee = $1, refunded_amount = $2, updated_at = \
         CURRENT_TIMESTAMP WHERE id = $3 AND status = 'Refunding' RETURNING *",
    )
    .bind(refund_fee)
    .bind(refunded_amount)
    .bind(lot_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(lot) => Ok(lot),
        None => {
            let existing = fetch_lot(lot_id, conn).await?.ok_or(LedgerError::LotNotFound(lot_id))?;
            Err(LedgerError::InvalidLotState {
                lot_id,
                expected: DepositLotStatus::Refunding.to_string(),
                actual: existing.status.to_string(),
            })
        },
    }
}

/// Consume `amount` from a lot's available value during debt collection. A fully consumed lot is
/// marked `Forfeited`; a partially consumed one keeps its status with a higher
/// `forfeited_amount`.
pub async fn consume_from_lot(
    lot_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<DepositLot, LedgerError> {
    let updated = sqlx::query_as::<_, DepositLot>(
        "UPDATE deposit_lots SET forfeited_amount = forfeited_amount + $1, status = CASE WHEN forfeited_amount + $1 \
         >= amount THEN 'Forfeited' ELSE status END, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status IN \
         ('Held', 'Refundable') AND forfeited_amount + $1 <= amount RETURNING *",
    )
    .bind(amount)
    .bind(lot_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(lot) => Ok(lot),
        None => {
            let existing = fetch_lot(lot_id, conn).await?.ok_or(LedgerError::LotNotFound(lot_id))?;
            Err(LedgerError::InvalidLotState {
                lot_id,
                expected: "an available lot with sufficient value".to_string(),
                actual: format!("{} with {} available", existing.status, existing.available()),
            })
        },
    }
}
