use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{CommissionObligation, DebtCause, NewCommission, NewDebt, OrderId},
    traits::{AuditLog, CommissionManagement, DebtManagement, LedgerError, NewAuditEntry, SweepReport},
};

/// `CommissionApi` manages affiliate commission obligations: creation at order time, explicit
/// settlement once the order completes, and the overdue sweep that turns stale obligations into
/// seller debt.
pub struct CommissionApi<B> {
    db: B,
}

impl<B> Debug for CommissionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommissionApi")
    }
}

impl<B> CommissionApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CommissionApi<B>
where B: CommissionManagement + DebtManagement + AuditLog
{
    /// Record an obligation for an order line. Re-posting the same (order, product) pair returns
    /// the existing obligation instead of duplicating it.
    pub async fn create_commission(&self, commission: NewCommission) -> Result<CommissionObligation, LedgerError> {
        let (obligation, created) = self.db.create_commission(commission).await?;
        if created {
            debug!(
                "🪙️ Commission #{} of {} booked on order [{}] for affiliate {}",
                obligation.id, obligation.amount, obligation.order_id, obligation.affiliate_id
            );
        } else {
            debug!("🪙️ Commission for order [{}] already on file as #{}", obligation.order_id, obligation.id);
        }
        Ok(obligation)
    }

    /// Settle a pending commission. The backend enforces the hard preconditions (order completed,
    /// obligation still pending); this layer adds the audit record.
    pub async fn settle_commission(&self, commission_id: i64, actor: &str) -> Result<CommissionObligation, LedgerError> {
        let result = self.db.settle_commission(commission_id).await;
        let audit = match &result {
            Ok(c) => NewAuditEntry::new("commission.settle", actor, commission_id)
                .with_meta(serde_json::json!({ "order_id": c.order_id, "amount": c.amount })),
            Err(e) => NewAuditEntry::new("commission.settle", actor, commission_id).failed(e),
        };
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        let settled = result?;
        info!("🪙️ Commission #{} settled for affiliate {} by {actor}", settled.id, settled.affiliate_id);
        Ok(settled)
    }

    /// Close out an overdue commission after its amount has been recovered or written off.
    pub async fn resolve_overdue_commission(
        &self,
        commission_id: i64,
        actor: &str,
    ) -> Result<CommissionObligation, LedgerError> {
        let resolved = self.db.resolve_overdue_commission(commission_id).await?;
        let audit = NewAuditEntry::new("commission.resolve", actor, commission_id);
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        info!("🪙️ Overdue commission #{} resolved by {actor}", resolved.id);
        Ok(resolved)
    }

    pub async fn commissions_for_order(&self, order_id: &OrderId) -> Result<Vec<CommissionObligation>, LedgerError> {
        self.db.commissions_for_order(order_id).await
    }

    pub async fn fetch_commission(&self, commission_id: i64) -> Result<Option<CommissionObligation>, LedgerError> {
        self.db.fetch_commission(commission_id).await
    }

    /// The scheduled overdue sweep: flag pending obligations past their deadline as `Overdue` and
    /// book a matching seller debt for each, so the normal collection paths recover the amount.
    /// A failure to book one debt is reported per item and does not abort the batch.
    pub async fn run_overdue_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, LedgerError> {
        let overdue = self.db.mark_overdue_commissions(now).await?;
        debug!("🪙️ Overdue commission sweep found {} obligation(s)", overdue.len());
        let mut report = SweepReport::new();
        for commission in overdue {
            let debt = NewDebt {
                seller_id: commission.seller_id,
                cause: DebtCause::OverdueCommission,
                order_id: Some(commission.order_id.clone()),
                dispute_id: None,
                amount: commission.amount,
            };
            match self.db.create_debt(debt).await {
                Ok(d) => {
                    info!(
                        "🪙️ Commission #{} is overdue; debt #{} of {} booked against seller {}",
                        commission.id, d.id, d.amount, d.seller_id
                    );
                    report.success();
                },
                Err(e) => {
                    warn!("🪙️ Failed to book debt for overdue commission #{}: {e}", commission.id);
                    report.failure(format!("commission #{}", commission.id), e.to_string());
                },
            }
        }
        info!("🪙️ Overdue commission sweep complete. {}/{} succeeded", report.succeeded, report.processed);
        Ok(report)
    }
}
