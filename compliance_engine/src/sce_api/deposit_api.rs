use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{DepositLot, DepositLotStatus, Money, NewDepositLot, PaymentProvider, SellerId},
    sce_api::ProviderClient,
    traits::{AuditLog, ComplianceLedger, LedgerError, NewAuditEntry, SellerAccounts},
};

/// The fee withheld when a deposit lot is returned to the seller, per funding provider.
/// Bank transfers are returned in full; card and wallet rails carry a 2% processing fee.
pub fn refund_fee_for(provider: PaymentProvider, amount: Money) -> Money {
    match provider {
        PaymentProvider::BankTransfer => Money::default(),
        _ => Money::from(amount.value() * 200 / 10_000),
    }
}

/// `DepositApi` handles deposit lot custody: recording funded lots, releasing them from
/// collateral duty, and returning them to sellers through the provider they were funded with.
pub struct DepositApi<B, P> {
    db: B,
    provider: P,
}

impl<B, P> Debug for DepositApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DepositApi")
    }
}

impl<B, P> DepositApi<B, P> {
    pub fn new(db: B, provider: P) -> Self {
        Self { db, provider }
    }
}

impl<B, P> DepositApi<B, P>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    /// Record a funded deposit lot. Idempotent on the provider's funding reference, so a
    /// replayed webhook does not double-count collateral.
    pub async fn create_deposit_lot(&self, lot: NewDepositLot) -> Result<DepositLot, LedgerError> {
        let (lot, created) = self.db.create_deposit_lot(lot).await?;
        if created {
            info!("🧾️ Deposit lot #{} of {} recorded for seller {}", lot.id, lot.amount, lot.seller_id);
            let audit = NewAuditEntry::new("deposit.create", "system", lot.id)
                .with_meta(serde_json::json!({ "seller_id": lot.seller_id, "amount": lot.amount }));
            self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        } else {
            debug!("🧾️ Funding event for lot #{} replayed; ignoring", lot.id);
        }
        Ok(lot)
    }

    /// Release a held lot from collateral duty. Rejected while the seller's remaining collateral
    /// would no longer cover their exposure.
    pub async fn release_deposit_lot(&self, lot_id: i64, actor: &str) -> Result<DepositLot, LedgerError> {
        let lot = self.db.release_deposit_lot(lot_id).await?;
        let audit = NewAuditEntry::new("deposit.release", actor, lot_id);
        self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        info!("🧾️ Deposit lot #{lot_id} released for seller {}", lot.seller_id);
        Ok(lot)
    }

    /// Seller-initiated refund of a releasable lot. Moves the lot to `Refunding`, then pushes
    /// the transfer through the provider and finalizes to `Refunded` with the fee and the amount
    /// actually returned. A provider failure leaves the lot in `Refunding` for
    /// [`Self::retry_deposit_refund`].
    pub async fn request_deposit_refund(&self, lot_id: i64, seller_id: SellerId) -> Result<DepositLot, LedgerError> {
        let lot = self.db.request_deposit_refund(lot_id, seller_id).await?;
        self.push_refund_through_provider(lot).await
    }

    /// Retry the provider leg for a lot stuck in `Refunding`.
    pub async fn retry_deposit_refund(&self, lot_id: i64) -> Result<DepositLot, LedgerError> {
        let lot = self.db.fetch_deposit_lot(lot_id).await?.ok_or(LedgerError::LotNotFound(lot_id))?;
        if lot.status != DepositLotStatus::Refunding {
            return Err(LedgerError::InvalidLotState {
                lot_id,
                expected: DepositLotStatus::Refunding.to_string(),
                actual: lot.status.to_string(),
            });
        }
        self.push_refund_through_provider(lot).await
    }

    async fn push_refund_through_provider(&self, lot: DepositLot) -> Result<DepositLot, LedgerError> {
        let refundable = lot.available();
        let fee = refund_fee_for(lot.provider, refundable);
        let to_return = refundable - fee;
        match self.provider.refund_deposit(&lot, to_return).await {
            Ok(provider_ref) => {
                let finalized = self.db.complete_deposit_refund(lot.id, fee, to_return).await?;
                info!(
                    "🧾️ Deposit lot #{} refunded: {to_return} returned to seller {}, {fee} fee. Provider ref \
                     {provider_ref}",
                    lot.id, lot.seller_id
                );
                let audit = NewAuditEntry::new("deposit.refund", "system", lot.id).with_meta(serde_json::json!({
                    "refunded": to_return,
                    "fee": fee,
                    "provider_ref": provider_ref,
                }));
                self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
                Ok(finalized)
            },
            Err(e) => {
                warn!("🧾️ Provider transfer for deposit lot #{} failed: {e}", lot.id);
                Err(LedgerError::ProviderError(e.to_string()))
            },
        }
    }

    pub async fn lots_for_seller(&self, seller_id: SellerId) -> Result<Vec<DepositLot>, LedgerError> {
        self.db.deposit_lots_for_seller(seller_id).await.map_err(LedgerError::SellerError)
    }
}
