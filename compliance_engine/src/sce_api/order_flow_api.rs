use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Money, NewOrder, Order, OrderId, SellerId},
    events::{DepositRequiredEvent, EventProducers, OrderCompletedEvent},
    traits::{
        AuditLog,
        CommissionManagement,
        ComplianceLedger,
        DepositCheck,
        LedgerError,
        NewAuditEntry,
    },
};

/// `OrderFlowApi` handles order intake through the collateral gate and the lifecycle transitions
/// that move exposure on and off the books.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: ComplianceLedger + CommissionManagement + AuditLog
{
    /// Submit a new order through the collateral gate.
    ///
    /// The gate and the insert run atomically under the seller's serialization guard in the
    /// backend: either the seller's collateral covers the new total exposure and the order is
    /// inserted, or nothing is written and the check explains the shortfall. Gate failures
    /// (rate lookup, datastore) propagate as errors rather than letting the order through.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<(DepositCheck, Option<Order>), LedgerError> {
        let order_id = order.order_id.clone();
        let (check, inserted) = self.db.process_new_order(order).await?;
        let audit = NewAuditEntry::new("order.gate", "system", &order_id)
            .with_meta(serde_json::json!({ "accepted": inserted.is_some(), "reason": check.reason }));
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        match &inserted {
            Some(o) => {
                debug!("🔄️📦️ Order [{}] accepted for seller {}. Exposure is now {}", o.order_id, o.seller_id, check.total_exposure);
            },
            None => {
                info!(
                    "🔄️📦️ Order [{order_id}] blocked at the collateral gate for seller {}. Short by {}",
                    check.seller_id, check.required_amount
                );
                self.call_deposit_required_hook(&check).await;
            },
        }
        Ok((check, inserted))
    }

    /// Run the collateral gate for a prospective amount without inserting anything.
    pub async fn evaluate_deposit_requirement(
        &self,
        seller_id: SellerId,
        prospective: Money,
        currency: &str,
    ) -> Result<DepositCheck, LedgerError> {
        self.db.evaluate_deposit_requirement(seller_id, prospective, currency).await
    }

    pub async fn mark_order_shipped(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let order = self.db.mark_order_shipped(order_id).await?;
        debug!("🔄️📦️ Order [{order_id}] marked as shipped");
        Ok(order)
    }

    /// Complete an order. Exposure for the order is released and any commission obligations it
    /// carries become settleable.
    pub async fn complete_order(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let order = self.db.complete_order(order_id).await?;
        let commissions = self.db.commissions_for_order(order_id).await?;
        let commission_total = commissions.iter().map(|c| c.amount).sum::<Money>();
        debug!(
            "🔄️📦️ Order [{order_id}] completed for seller {}. {} commission obligation(s) now settleable",
            order.seller_id,
            commissions.len()
        );
        for emitter in &self.producers.order_completed_producer {
            emitter.publish_event(OrderCompletedEvent::new(order.clone(), commission_total)).await;
        }
        Ok(order)
    }

    /// Cancel an order, releasing its exposure. Callers should follow up with an eligibility
    /// refresh for the seller since the collateral picture changed.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let order = self.db.cancel_order(order_id).await?;
        debug!("🔄️📦️ Order [{order_id}] cancelled. Exposure released for seller {}", order.seller_id);
        Ok(order)
    }

    async fn call_deposit_required_hook(&self, check: &DepositCheck) {
        for emitter in &self.producers.deposit_required_producer {
            debug!("🔄️📦️ Notifying deposit-required hook subscribers");
            let event = DepositRequiredEvent::new(check.clone());
            emitter.publish_event(event).await;
        }
    }
}
