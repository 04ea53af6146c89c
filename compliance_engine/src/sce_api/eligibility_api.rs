use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{PayoutEligibility, SellerId},
    events::{EligibilityChangedEvent, EventProducers},
    traits::{AuditLog, ComplianceLedger, EligibilityFacts, EligibilityUpdate, LedgerError, NewAuditEntry},
};

/// Compute payout eligibility from a fact snapshot.
///
/// This is the *only* place the status is derived; the backend's single writer calls this and
/// persists exactly what it returns. Hard violations take precedence over incomplete setup:
/// a seller that is both unverified and risk-flagged is `Blocked`, not `PendingReview`.
pub fn calculate_eligibility(facts: &EligibilityFacts) -> (PayoutEligibility, &'static str) {
    if facts.risk_flagged {
        return (PayoutEligibility::Blocked, "an active risk flag exists for the seller");
    }
    if facts.collateral_breach {
        return (PayoutEligibility::Blocked, "unfulfilled exposure exceeds deposit collateral");
    }
    if facts.overdue_debt {
        return (PayoutEligibility::Blocked, "a debt has gone uncollected past the overdue window");
    }
    if facts.account_bound && !facts.provider_enabled {
        return (PayoutEligibility::Blocked, "the provider reports the payout account as disabled");
    }
    if !facts.subscription_active {
        return (PayoutEligibility::PendingReview, "no active seller subscription");
    }
    if !facts.account_bound {
        return (PayoutEligibility::PendingReview, "no default payout account is bound");
    }
    if !facts.account_verified {
        return (PayoutEligibility::PendingReview, "the payout account has not been verified");
    }
    (PayoutEligibility::Eligible, "all eligibility facts are satisfied")
}

/// `EligibilityApi` exposes the payout-eligibility surface: triggering a recompute through the
/// backend's single write path and reading the current status. There is no method to *set* a
/// status.
pub struct EligibilityApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for EligibilityApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EligibilityApi")
    }
}

impl<B> EligibilityApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> EligibilityApi<B>
where B: ComplianceLedger + AuditLog
{
    /// Recompute and persist the seller's payout eligibility from current facts. Emits an
    /// [`EligibilityChangedEvent`] and writes an audit record when the status actually changed.
    pub async fn refresh(&self, seller_id: SellerId) -> Result<EligibilityUpdate, LedgerError> {
        let update = self.db.update_payout_eligibility(seller_id).await?;
        if update.changed() {
            info!(
                "🧮️ Payout eligibility for seller {seller_id} changed: {} -> {}",
                update.previous, update.current
            );
            let audit = NewAuditEntry::new("eligibility.update", "system", seller_id).with_meta(serde_json::json!({
                "previous": update.previous.to_string(),
                "current": update.current.to_string(),
            }));
            self.db.record_audit(audit).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
            self.call_eligibility_changed_hook(&update).await;
        } else {
            trace!("🧮️ Payout eligibility for seller {seller_id} unchanged at {}", update.current);
        }
        Ok(update)
    }

    /// Refresh eligibility for a batch of sellers, isolating per-seller failures.
    pub async fn refresh_all(&self, seller_ids: &[SellerId]) -> crate::traits::SweepReport {
        let mut report = crate::traits::SweepReport::new();
        for id in seller_ids {
            match self.refresh(*id).await {
                Ok(_) => report.success(),
                Err(e) => {
                    warn!("🧮️ Eligibility refresh for seller {id} failed: {e}");
                    report.failure(id.to_string(), e.to_string());
                },
            }
        }
        report
    }

    async fn call_eligibility_changed_hook(&self, update: &EligibilityUpdate) {
        for emitter in &self.producers.eligibility_changed_producer {
            debug!("🧮️ Notifying eligibility-changed hook subscribers");
            let event = EligibilityChangedEvent::new(update.seller_id, update.previous, update.current);
            emitter.publish_event(event).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn good_facts() -> EligibilityFacts {
        EligibilityFacts {
            subscription_active: true,
            account_bound: true,
            account_verified: true,
            provider_enabled: true,
            risk_flagged: false,
            collateral_breach: false,
            overdue_debt: false,
        }
    }

    #[test]
    fn all_facts_satisfied_is_eligible() {
        let (status, _) = calculate_eligibility(&good_facts());
        assert_eq!(status, PayoutEligibility::Eligible);
    }

    #[test]
    fn disabled_account_is_never_eligible() {
        let facts = EligibilityFacts { provider_enabled: false, ..good_facts() };
        let (status, reason) = calculate_eligibility(&facts);
        assert_eq!(status, PayoutEligibility::Blocked);
        assert!(reason.contains("disabled"));
    }

    #[test]
    fn violations_outrank_incomplete_setup() {
        // Unverified account alone is a review case...
        let facts = EligibilityFacts { account_verified: false, ..good_facts() };
        assert_eq!(calculate_eligibility(&facts).0, PayoutEligibility::PendingReview);
        // ...but combined with a risk flag the seller is blocked outright.
        let facts = EligibilityFacts { account_verified: false, risk_flagged: true, ..good_facts() };
        assert_eq!(calculate_eligibility(&facts).0, PayoutEligibility::Blocked);
    }

    #[test]
    fn collateral_breach_and_overdue_debt_block() {
        let facts = EligibilityFacts { collateral_breach: true, ..good_facts() };
        assert_eq!(calculate_eligibility(&facts).0, PayoutEligibility::Blocked);
        let facts = EligibilityFacts { overdue_debt: true, ..good_facts() };
        assert_eq!(calculate_eligibility(&facts).0, PayoutEligibility::Blocked);
    }

    #[test]
    fn default_facts_fail_closed() {
        let (status, _) = calculate_eligibility(&EligibilityFacts::default());
        assert_ne!(status, PayoutEligibility::Eligible);
    }
}
