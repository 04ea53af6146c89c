use thiserror::Error;

use crate::{
    db_types::SellerId,
    traits::{AuditEntry, NewAuditEntry},
};

/// Append-only audit trail. Every compliance-relevant decision (deposit gate verdicts,
/// eligibility changes, collections, settlements, dispute resolutions) gets a record with the
/// actor, the decision, and enough context to reconstruct it later.
#[allow(async_fn_in_trait)]
pub trait AuditLog: Clone {
    async fn record_audit(&self, entry: NewAuditEntry) -> Result<i64, AuditError>;
    async fn audit_trail_for_seller(&self, seller_id: SellerId, limit: i64) -> Result<Vec<AuditEntry>, AuditError>;
}

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(e: sqlx::Error) -> Self {
        AuditError::DatabaseError(e.to_string())
    }
}
