use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentAccount, PaymentAccount, SellerId},
    traits::SellerApiError,
};

pub async fn insert_account(
    account: NewPaymentAccount,
    conn: &mut SqliteConnection,
) -> Result<PaymentAccount, SellerApiError> {
    let inserted = sqlx::query_as(
        "INSERT INTO payment_accounts (seller_id, provider, provider_ref) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(account.seller_id)
    .bind(account.provider)
    .bind(account.provider_ref)
    .fetch_one(conn)
    .await?;
    Ok(inserted)
}

pub async fn fetch_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAccount>, sqlx::Error> {
    let account =
        sqlx::query_as("SELECT * FROM payment_accounts WHERE id = $1").bind(account_id).fetch_optional(conn).await?;
    Ok(account)
}

/// Marks one account as the seller's default, clearing the flag on every other account they
/// hold. Run inside a transaction by the caller.
pub async fn set_default(
    account_id: i64,
    seller_id: SellerId,
    conn: &mut SqliteConnection,
) -> Result<PaymentAccount, SellerApiError> {
    let account =
        fetch_account(account_id, &mut *conn).await?.ok_or(SellerApiError::PaymentAccountNotFound(account_id))?;
    if account.seller_id != seller_id {
        return Err(SellerApiError::PaymentAccountOwnershipMismatch(account_id, seller_id));
    }
    sqlx::query("UPDATE payment_accounts SET is_default = 0, updated_at = CURRENT_TIMESTAMP WHERE seller_id = $1")
        .bind(seller_id)
        .execute(&mut *conn)
        .await?;
    let updated = sqlx::query_as(
        "UPDATE payment_accounts SET is_default = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(account_id)
    .fetch_one(conn)
    .await?;
    Ok(updated)
}

pub async fn set_verified(account_id: i64, conn: &mut SqliteConnection) -> Result<PaymentAccount, SellerApiError> {
    let updated = sqlx::query_as(
        "UPDATE payment_accounts SET verified = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SellerApiError::PaymentAccountNotFound(account_id))?;
    Ok(updated)
}

pub async fn set_provider_health(
    account_id: i64,
    enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<PaymentAccount, SellerApiError> {
    let updated = sqlx::query_as(
        "UPDATE payment_accounts SET provider_enabled = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(enabled)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SellerApiError::PaymentAccountNotFound(account_id))?;
    Ok(updated)
}

pub async fn default_for_seller(
    seller_id: SellerId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM payment_accounts WHERE seller_id = $1 AND is_default = 1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}
