use sqlx::SqliteConnection;

use crate::{
    db_types::SellerId,
    traits::{AuditEntry, AuditError, NewAuditEntry},
};

pub async fn insert_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<i64, AuditError> {
    let meta = entry.meta.map(|m| m.to_string());
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO audit_log (action, actor_id, resource_id, result, meta) VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(entry.action)
    .bind(entry.actor_id)
    .bind(entry.resource_id)
    .bind(entry.result)
    .bind(meta)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// The most recent audit entries whose subject is the given seller: entries keyed on the seller
/// id directly, plus entries whose metadata references it.
pub async fn trail_for_seller(
    seller_id: SellerId,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEntry>, AuditError> {
    let comma = format!("%\"seller_id\":{},%", seller_id.0);
    let brace = format!("%\"seller_id\":{}}}%", seller_id.0);
    let entries = sqlx::query_as(
        "SELECT * FROM audit_log WHERE resource_id = $1 OR meta LIKE $2 OR meta LIKE $3 ORDER BY created_at DESC, id \
         DESC LIMIT $4",
    )
    .bind(seller_id.to_string())
    .bind(comma)
    .bind(brace)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
