use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{DepositTier, Money, NewPaymentAccount, PaymentAccount, PayoutEligibility, Seller, SellerId},
    traits::{AuditEntry, AuditLog, ComplianceLedger, LedgerError, SellerAccounts, SellerApiError},
};

/// A read-only snapshot of a seller's compliance standing, assembled for the compliance
/// dashboard endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    pub seller: Seller,
    pub payout_eligibility: PayoutEligibility,
    pub exposure: Money,
    pub collateral: Money,
    pub outstanding_debt: Money,
}

/// `SellerApi` manages the seller-side facts that feed eligibility: payment accounts,
/// subscriptions and risk flags. Every mutation here is followed by an eligibility recompute
/// through the ledger's single write path, so the stored status never lags the facts.
pub struct SellerApi<B> {
    db: B,
}

impl<B> Debug for SellerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SellerApi")
    }
}

impl<B> SellerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> SellerApi<B>
where B: SellerAccounts + ComplianceLedger + crate::traits::DebtManagement + AuditLog
{
    pub async fn fetch_seller(&self, seller_id: SellerId) -> Result<Option<Seller>, SellerApiError> {
        self.db.fetch_seller(seller_id).await
    }

    pub async fn register_seller(&self, handle: &str) -> Result<Seller, SellerApiError> {
        let seller = self.db.register_seller(handle).await?;
        debug!("👤️ Seller {} registered as {}", seller.handle, seller.id);
        Ok(seller)
    }

    /// The full compliance standing of a seller, for the dashboard.
    pub async fn compliance_snapshot(&self, seller_id: SellerId) -> Result<ComplianceSnapshot, LedgerError> {
        let seller =
            self.db.fetch_seller(seller_id).await?.ok_or(LedgerError::SellerNotFound(seller_id))?;
        let exposure = self.db.exposure_for_seller(seller_id).await?;
        let collateral = self.db.collateral_for_seller(seller_id).await?;
        let outstanding_debt = self.db.outstanding_debt(seller_id).await?;
        Ok(ComplianceSnapshot {
            payout_eligibility: seller.payout_eligibility,
            seller,
            exposure,
            collateral,
            outstanding_debt,
        })
    }

    pub async fn add_payment_account(&self, account: NewPaymentAccount) -> Result<PaymentAccount, LedgerError> {
        let account = self.db.add_payment_account(account).await?;
        debug!("👤️ Payment account #{} added for seller {}", account.id, account.seller_id);
        Ok(account)
    }

    /// Bind a default payout account, then recompute eligibility from the new facts.
    pub async fn set_default_payment_account(
        &self,
        account_id: i64,
        seller_id: SellerId,
    ) -> Result<PaymentAccount, LedgerError> {
        let account = self.db.set_default_payment_account(account_id, seller_id).await?;
        self.db.update_payout_eligibility(seller_id).await?;
        info!("👤️ Account #{account_id} is now the default payout account for seller {seller_id}");
        Ok(account)
    }

    /// Admin verification of a payout account, then an eligibility recompute.
    pub async fn verify_payment_account(&self, account_id: i64) -> Result<PaymentAccount, LedgerError> {
        let account = self.db.verify_payment_account(account_id).await?;
        self.db.update_payout_eligibility(account.seller_id).await?;
        info!("👤️ Payment account #{account_id} verified for seller {}", account.seller_id);
        Ok(account)
    }

    /// Provider callback reporting account health, then an eligibility recompute.
    pub async fn set_provider_account_health(
        &self,
        account_id: i64,
        enabled: bool,
    ) -> Result<PaymentAccount, LedgerError> {
        let account = self.db.set_provider_account_health(account_id, enabled).await?;
        self.db.update_payout_eligibility(account.seller_id).await?;
        info!("👤️ Provider reports account #{account_id} as {}", if enabled { "enabled" } else { "disabled" });
        Ok(account)
    }

    /// Set or extend a subscription, then recompute eligibility.
    pub async fn set_subscription(
        &self,
        seller_id: SellerId,
        tier: DepositTier,
        expires_at: DateTime<Utc>,
    ) -> Result<Seller, LedgerError> {
        let seller = self.db.set_subscription(seller_id, tier, expires_at).await?;
        self.db.update_payout_eligibility(seller_id).await?;
        info!("👤️ Seller {seller_id} subscribed to {tier} until {expires_at}");
        Ok(seller)
    }

    /// Raise or clear a risk flag, then recompute eligibility.
    pub async fn set_risk_flag(&self, seller_id: SellerId, flagged: bool) -> Result<Seller, LedgerError> {
        let seller = self.db.set_risk_flag(seller_id, flagged).await?;
        self.db.update_payout_eligibility(seller_id).await?;
        info!("👤️ Risk flag for seller {seller_id} {}", if flagged { "raised" } else { "cleared" });
        Ok(seller)
    }

    /// The most recent audit entries touching this seller, newest first.
    pub async fn audit_trail(&self, seller_id: SellerId, limit: i64) -> Result<Vec<AuditEntry>, LedgerError> {
        self.db.audit_trail_for_seller(seller_id, limit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))
    }

    /// The subscription expiry sweep: lapse expired subscriptions and recompute eligibility for
    /// each affected seller.
    pub async fn run_subscription_sweep(&self, now: DateTime<Utc>) -> Result<crate::traits::SweepReport, LedgerError> {
        let expired = self.db.expire_subscriptions(now).await?;
        debug!("👤️ Subscription sweep found {} lapsed seller(s)", expired.len());
        let mut report = crate::traits::SweepReport::new();
        for seller_id in expired {
            match self.db.update_payout_eligibility(seller_id).await {
                Ok(_) => report.success(),
                Err(e) => {
                    warn!("👤️ Eligibility recompute after subscription lapse failed for {seller_id}: {e}");
                    report.failure(seller_id.to_string(), e.to_string());
                },
            }
        }
        info!("👤️ Subscription sweep complete. {}/{} succeeded", report.succeeded, report.processed);
        Ok(report)
    }
}
