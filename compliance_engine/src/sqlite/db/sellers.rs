use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DepositTier, PayoutEligibility, Seller, SellerId},
    traits::SellerApiError,
};

pub async fn fetch_seller(seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Option<Seller>, sqlx::Error> {
    let seller = sqlx::query_as("SELECT * FROM sellers WHERE id = $1").bind(seller_id).fetch_optional(conn).await?;
    Ok(seller)
}

/// Registers a seller, or returns the existing record if the handle is already taken.
pub async fn register_seller(handle: &str, conn: &mut SqliteConnection) -> Result<Seller, SellerApiError> {
    if let Some(existing) =
        sqlx::query_as::<_, Seller>("SELECT * FROM sellers WHERE handle = $1").bind(handle).fetch_optional(&mut *conn).await?
    {
        return Ok(existing);
    }
    let seller = sqlx::query_as("INSERT INTO sellers (handle) VALUES ($1) RETURNING *").bind(handle).fetch_one(conn).await?;
    Ok(seller)
}

/// Persist a payout eligibility value.
///
/// Deliberately not exported beyond the sqlite backend: the only caller is the single-writer
/// update in `SqliteDatabase::update_payout_eligibility`, which computes, persists and verifies
/// inside one transaction.
pub(in crate::sqlite) async fn set_payout_eligibility(
    seller_id: SellerId,
    status: PayoutEligibility,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sellers SET payout_eligibility = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(status)
        .bind(seller_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_subscription(
    seller_id: SellerId,
    tier: DepositTier,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Seller, SellerApiError> {
    let seller = sqlx::query_as(
        "UPDATE sellers SET subscription_tier = $1, subscription_expires_at = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $3 RETURNING *",
    )
    .bind(tier)
    .bind(expires_at)
    .bind(seller_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SellerApiError::SellerNotFound(seller_id))?;
    Ok(seller)
}

pub async fn set_risk_flag(
    seller_id: SellerId,
    flagged: bool,
    conn: &mut SqliteConnection,
) -> Result<Seller, SellerApiError> {
    let seller = sqlx::query_as(
        "UPDATE sellers SET risk_flagged = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(flagged)
    .bind(seller_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SellerApiError::SellerNotFound(seller_id))?;
    Ok(seller)
}

/// Clears lapsed subscriptions and returns the sellers that were affected.
pub async fn expire_subscriptions(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<SellerId>, sqlx::Error> {
    let ids: Vec<SellerId> = sqlx::query_scalar(
        "UPDATE sellers SET subscription_tier = NULL, subscription_expires_at = NULL, updated_at = \
         CURRENT_TIMESTAMP WHERE subscription_expires_at IS NOT NULL AND subscription_expires_at < $1 RETURNING id",
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    if !ids.is_empty() {
        debug!("🗃️ {} subscription(s) lapsed", ids.len());
    }
    Ok(ids)
}
