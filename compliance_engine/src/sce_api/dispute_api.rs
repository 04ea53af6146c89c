use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{DebtCause, Dispute, Money, NewDebt, NewDispute, OrderId, RefundObligation, RefundStatus},
    events::{DisputeResolvedEvent, EventProducers},
    sce_api::{ProviderClient, ProviderError},
    traits::{
        AuditLog,
        DebtManagement,
        DisputeManagement,
        ExchangeRates,
        LedgerError,
        NewAuditEntry,
        SellerAccounts,
    },
};

/// `DisputeApi` orchestrates the dispute lifecycle and the refunds resolutions produce.
///
/// The buyer is made whole first: the platform fronts the refund over the original payment
/// method, then attempts to recover the amount from the seller. Whatever cannot be recovered is
/// booked as a seller debt, never subtracted from the buyer's refund.
pub struct DisputeApi<B, P> {
    db: B,
    provider: P,
    producers: EventProducers,
}

impl<B, P> Debug for DisputeApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisputeApi")
    }
}

impl<B, P> DisputeApi<B, P> {
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        Self { db, provider, producers }
    }
}

impl<B, P> DisputeApi<B, P>
where
    B: DisputeManagement + DebtManagement + SellerAccounts + ExchangeRates + AuditLog,
    P: ProviderClient,
{
    /// Open a dispute against an order. At most one unresolved dispute may exist per order.
    pub async fn open_dispute(&self, dispute: NewDispute) -> Result<Dispute, LedgerError> {
        let opened = self.db.open_dispute(dispute).await?;
        info!(
            "⚖️ Dispute #{} opened on order [{}] by {} ({})",
            opened.id, opened.order_id, opened.opened_by, opened.reason
        );
        Ok(opened)
    }

    /// Move a dispute into review.
    pub async fn begin_review(&self, dispute_id: i64) -> Result<Dispute, LedgerError> {
        let dispute = self.db.begin_dispute_review(dispute_id).await?;
        debug!("⚖️ Dispute #{dispute_id} is now under review");
        Ok(dispute)
    }

    /// Resolve a dispute under review. When the resolution awards a refund, the refund
    /// obligation is created and executed immediately; a provider failure leaves the obligation
    /// in `Failed` for retry and does not undo the resolution.
    pub async fn resolve_dispute(
        &self,
        dispute_id: i64,
        resolved_by: &str,
        refund_amount: Option<Money>,
        note: Option<&str>,
    ) -> Result<(Dispute, Option<RefundObligation>), LedgerError> {
        let dispute = self.db.resolve_dispute(dispute_id, resolved_by, refund_amount, note).await?;
        let audit = NewAuditEntry::new("dispute.resolve", resolved_by, dispute_id).with_meta(serde_json::json!({
            "order_id": dispute.order_id,
            "refund_amount": refund_amount,
        }));
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        info!("⚖️ Dispute #{dispute_id} resolved by {resolved_by}; refund: {refund_amount:?}");

        let refund = match refund_amount {
            Some(_) => {
                let (refund, _) = self.db.refund_for_dispute(dispute_id).await?;
                let refund = match self.execute_refund(refund.id).await {
                    Ok(r) => r,
                    Err(e) => {
                        // The resolution stands; the refund stays Failed and is retried later.
                        warn!("⚖️ Refund for dispute #{dispute_id} did not complete: {e}");
                        self.db.fetch_refund(refund.id).await?.ok_or(LedgerError::RefundNotFound(refund.id))?
                    },
                };
                Some(refund)
            },
            None => None,
        };
        self.call_dispute_resolved_hook(&dispute, refund.as_ref()).await;
        Ok((dispute, refund))
    }

    /// Push a pending or previously failed refund through the provider, then recover the amount
    /// from the seller. Each status change is persisted before the next provider call so a crash
    /// leaves the obligation in a retryable state.
    pub async fn execute_refund(&self, refund_id: i64) -> Result<RefundObligation, LedgerError> {
        let refund = self.db.update_refund_status(refund_id, RefundStatus::Processing, None).await?;
        debug!("⚖️ Refund #{refund_id} of {} {} is processing", refund.amount, refund.currency);
        let order = self
            .db
            .fetch_order(&refund.order_id)
            .await
            .map_err(LedgerError::SellerError)?
            .ok_or_else(|| LedgerError::OrderNotFound(refund.order_id.clone()))?;
        match self.provider.refund_buyer(refund.provider, &order.payment_ref, refund.amount, &refund.currency).await {
            Ok(provider_ref) => {
                let refund =
                    self.db.update_refund_status(refund_id, RefundStatus::Completed, Some(&provider_ref)).await?;
                info!("⚖️ Refund #{refund_id} completed, provider ref {provider_ref}");
                self.recover_refund_from_seller(&refund).await?;
                Ok(refund)
            },
            Err(e) => {
                let _ = self.db.update_refund_status(refund_id, RefundStatus::Failed, None).await?;
                warn!("⚖️ Provider rejected refund #{refund_id}: {e}");
                Err(provider_error_to_ledger(e))
            },
        }
    }

    /// Recover a completed refund's amount from the seller. The shortfall between the refund and
    /// what the provider could pull from the seller's account becomes a debt in platform
    /// currency.
    async fn recover_refund_from_seller(&self, refund: &RefundObligation) -> Result<(), LedgerError> {
        let recovered = match self.db.default_payment_account(refund.seller_id).await? {
            Some(account) => match self.provider.recover_from_seller(&account, refund.amount).await {
                Ok(amount) => amount,
                Err(e) => {
                    warn!("⚖️ Recovery from seller {} failed entirely: {e}", refund.seller_id);
                    Money::default()
                },
            },
            None => {
                debug!("⚖️ Seller {} has no payout account to recover from", refund.seller_id);
                Money::default()
            },
        };
        let shortfall = refund.amount - recovered;
        if shortfall.is_positive() {
            let rate = self
                .db
                .fetch_exchange_rate(&refund.currency)
                .await
                .map_err(|_| LedgerError::UnknownCurrency(refund.currency.clone()))?;
            let debt = NewDebt {
                seller_id: refund.seller_id,
                cause: DebtCause::RefundShortfall,
                order_id: Some(refund.order_id.clone()),
                dispute_id: refund.dispute_id,
                amount: rate.convert_to_platform(shortfall),
            };
            let debt = self.db.create_debt(debt).await?;
            info!(
                "⚖️ Refund #{} recovered {recovered} of {}; shortfall booked as debt #{} ({})",
                refund.id, refund.amount, debt.id, debt.amount
            );
        } else {
            debug!("⚖️ Refund #{} fully recovered from seller {}", refund.id, refund.seller_id);
        }
        Ok(())
    }

    pub async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, LedgerError> {
        self.db.fetch_dispute(dispute_id).await
    }

    pub async fn fetch_refund(&self, refund_id: i64) -> Result<Option<RefundObligation>, LedgerError> {
        self.db.fetch_refund(refund_id).await
    }

    pub async fn open_dispute_for_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, LedgerError> {
        self.db.open_dispute_for_order(order_id).await
    }

    async fn call_dispute_resolved_hook(&self, dispute: &Dispute, refund: Option<&RefundObligation>) {
        for emitter in &self.producers.dispute_resolved_producer {
            debug!("⚖️ Notifying dispute-resolved hook subscribers");
            emitter.publish_event(DisputeResolvedEvent::new(dispute.clone(), refund.cloned())).await;
        }
    }
}

fn provider_error_to_ledger(e: ProviderError) -> LedgerError {
    LedgerError::ProviderError(e.to_string())
}
