use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{DebtCause, Money, NewDebt, SellerDebt, SellerId},
    events::{DebtCollectedEvent, EventProducers},
    traits::{
        AuditLog,
        DebtCollection,
        DebtManagement,
        LedgerError,
        NewAuditEntry,
        PayoutAdjustment,
        SweepReport,
    },
};

/// `DebtApi` books seller debts and drives the two recovery paths: opportunistic collection from
/// deposit collateral, and payout interception at disbursement time.
pub struct DebtApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DebtApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DebtApi")
    }
}

impl<B> DebtApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DebtApi<B>
where B: DebtManagement + AuditLog
{
    /// Record a new debt against a seller.
    pub async fn create_debt(&self, debt: NewDebt) -> Result<SellerDebt, LedgerError> {
        let created = self.db.create_debt(debt).await?;
        info!(
            "💳️ Debt #{} of {} booked against seller {} ({})",
            created.id, created.amount, created.seller_id, created.cause
        );
        Ok(created)
    }

    /// Book an admin-imposed violation penalty as a debt against the seller. Penalties enter the
    /// same collection pipeline as any other debt.
    pub async fn violation_penalty(
        &self,
        seller_id: SellerId,
        amount: Money,
        actor: &str,
    ) -> Result<SellerDebt, LedgerError> {
        let debt =
            NewDebt { seller_id, cause: DebtCause::ViolationPenalty, order_id: None, dispute_id: None, amount };
        let created = self.db.create_debt(debt).await?;
        info!("💳️ Violation penalty of {amount} imposed on seller {seller_id} by {actor} (debt #{})", created.id);
        let audit = NewAuditEntry::new("debt.penalty", actor, seller_id)
            .with_meta(serde_json::json!({ "debt_id": created.id, "amount": created.amount }));
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        Ok(created)
    }

    /// Drain the seller's available deposit collateral against their pending debts, oldest lot
    /// first. Collecting nothing is a normal outcome, not an error.
    pub async fn collect_from_deposits(&self, seller_id: SellerId) -> Result<DebtCollection, LedgerError> {
        let collection = self.db.collect_from_deposits(seller_id).await?;
        if collection.total_collected.is_positive() {
            info!(
                "💳️ Collected {} from {} deposit lot(s) for seller {seller_id}; {} outstanding",
                collection.total_collected, collection.lots_drained, collection.outstanding
            );
            let audit = NewAuditEntry::new("debt.collect_deposits", "system", seller_id).with_meta(
                serde_json::json!({
                    "collected": collection.total_collected,
                    "debts_settled": collection.debts_settled,
                    "outstanding": collection.outstanding,
                }),
            );
            self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
            self.call_debt_collected_hook(&collection).await;
        } else {
            trace!("💳️ No collectable collateral for seller {seller_id}");
        }
        Ok(collection)
    }

    /// Intercept an outbound payout, deducting outstanding debt before disbursement. The
    /// deduction is capped at the payout amount; payouts already disbursed are never clawed
    /// back.
    pub async fn adjust_payout(
        &self,
        seller_id: SellerId,
        payout: Money,
        currency: &str,
    ) -> Result<PayoutAdjustment, LedgerError> {
        let adjustment = self.db.collect_from_payout(seller_id, payout, currency).await?;
        if adjustment.deducted.is_positive() {
            info!(
                "💳️ Deducted {} from a {} payout for seller {seller_id}; {} remains outstanding",
                adjustment.deducted, adjustment.requested, adjustment.remaining_debt
            );
            let audit = NewAuditEntry::new("debt.collect_payout", "system", seller_id).with_meta(serde_json::json!({
                "requested": adjustment.requested,
                "deducted": adjustment.deducted,
                "disbursable": adjustment.disbursable,
            }));
            self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        }
        Ok(adjustment)
    }

    pub async fn pending_debts(&self, seller_id: SellerId) -> Result<Vec<SellerDebt>, LedgerError> {
        self.db.pending_debts(seller_id).await
    }

    pub async fn outstanding_debt(&self, seller_id: SellerId) -> Result<Money, LedgerError> {
        self.db.outstanding_debt(seller_id).await
    }

    /// The scheduled collection sweep: run a deposit collection pass for every seller carrying
    /// pending debt. One seller's failure never aborts the rest of the batch.
    pub async fn run_collection_sweep(&self) -> Result<SweepReport, LedgerError> {
        let sellers = self.db.sellers_with_pending_debts().await?;
        debug!("💳️ Debt collection sweep starting over {} seller(s)", sellers.len());
        let mut report = SweepReport::new();
        for seller_id in sellers {
            match self.collect_from_deposits(seller_id).await {
                Ok(_) => report.success(),
                Err(e) => {
                    warn!("💳️ Collection for seller {seller_id} failed during sweep: {e}");
                    report.failure(seller_id.to_string(), e.to_string());
                },
            }
        }
        info!("💳️ Debt collection sweep complete. {}/{} succeeded", report.succeeded, report.processed);
        Ok(report)
    }

    async fn call_debt_collected_hook(&self, collection: &DebtCollection) {
        for emitter in &self.producers.debt_collected_producer {
            debug!("💳️ Notifying debt-collected hook subscribers");
            emitter.publish_event(DebtCollectedEvent::new(collection.clone())).await;
        }
    }
}
