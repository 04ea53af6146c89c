use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{DepositTier, Money, PayoutEligibility, SellerId};

//--------------------------------------    DepositCheck     ---------------------------------------------------------
/// The outcome of a collateral evaluation for a prospective order. All amounts are in platform
/// currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositCheck {
    pub seller_id: SellerId,
    pub requires_deposit: bool,
    /// The shortfall between total exposure and held collateral. Zero when the check passes.
    pub required_amount: Money,
    /// The seller's exposure including the prospective order.
    pub total_exposure: Money,
    /// The seller's available (held, non-forfeited) collateral.
    pub collateral: Money,
    pub current_tier: Option<DepositTier>,
    pub suggested_tier: Option<DepositTier>,
    pub reason: String,
}

impl DepositCheck {
    pub fn satisfied(seller_id: SellerId, total_exposure: Money, collateral: Money) -> Self {
        Self {
            seller_id,
            requires_deposit: false,
            required_amount: Money::default(),
            total_exposure,
            collateral,
            current_tier: None,
            suggested_tier: None,
            reason: "collateral covers exposure".to_string(),
        }
    }

    pub fn short(
        seller_id: SellerId,
        total_exposure: Money,
        collateral: Money,
        current_tier: Option<DepositTier>,
    ) -> Self {
        let required_amount = total_exposure - collateral;
        let suggested_tier = DepositTier::minimum_covering(total_exposure);
        Self {
            seller_id,
            requires_deposit: true,
            required_amount,
            total_exposure,
            collateral,
            current_tier,
            suggested_tier: Some(suggested_tier),
            reason: format!(
                "exposure {total_exposure} exceeds collateral {collateral}; post a deposit of at least \
                 {required_amount} or subscribe to {suggested_tier}"
            ),
        }
    }
}

//--------------------------------------  EligibilityFacts   ---------------------------------------------------------
/// The facts the payout eligibility calculation is a pure function of. Assembled in one
/// transaction by the backend so that the calculation and the persisted result cannot diverge.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EligibilityFacts {
    /// The seller has a subscription that is currently active and unexpired.
    pub subscription_active: bool,
    /// A default payment account is bound.
    pub account_bound: bool,
    /// The bound default account has passed platform verification.
    pub account_verified: bool,
    /// The provider reports the bound account as enabled/healthy.
    pub provider_enabled: bool,
    /// An active risk or violation flag exists for the seller.
    pub risk_flagged: bool,
    /// The seller's unfulfilled exposure currently exceeds their collateral.
    pub collateral_breach: bool,
    /// A pending debt has gone uncollected past the overdue window.
    pub overdue_debt: bool,
}

//--------------------------------------  EligibilityUpdate  ---------------------------------------------------------
/// The result of the single-writer eligibility update: the state before, the freshly computed
/// state, and the facts it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityUpdate {
    pub seller_id: SellerId,
    pub previous: PayoutEligibility,
    pub current: PayoutEligibility,
    pub facts: EligibilityFacts,
}

impl EligibilityUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

//--------------------------------------    DebtCollection   ---------------------------------------------------------
/// The aggregate result of draining deposit collateral against pending debts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtCollection {
    pub seller_id: SellerId,
    pub debts_settled: usize,
    pub lots_drained: usize,
    pub total_collected: Money,
    /// Debt still outstanding after the collection pass.
    pub outstanding: Money,
}

impl DebtCollection {
    pub fn empty(seller_id: SellerId) -> Self {
        Self {
            seller_id,
            debts_settled: 0,
            lots_drained: 0,
            total_collected: Money::default(),
            outstanding: Money::default(),
        }
    }
}

//--------------------------------------   PayoutAdjustment  ---------------------------------------------------------
/// The result of intercepting an outbound payout to recover debt before disbursement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutAdjustment {
    pub seller_id: SellerId,
    pub requested: Money,
    /// The amount that may actually leave the platform.
    pub disbursable: Money,
    pub deducted: Money,
    /// Debt still outstanding after the deduction.
    pub remaining_debt: Money,
}

//--------------------------------------     SweepReport     ---------------------------------------------------------
/// Per-item outcome of a scheduled sweep. Item failures never abort the batch; each one is
/// reported individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn new() -> Self {
        Self { processed: 0, succeeded: 0, failures: Vec::new() }
    }

    pub fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn failure(&mut self, item: String, error: String) {
        self.processed += 1;
        self.failures.push(SweepFailure { item, error });
    }
}

impl Default for SweepReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub item: String,
    pub error: String,
}

//--------------------------------------    ExchangeRate     ---------------------------------------------------------
/// The conversion rate from one currency into the platform currency, expressed in parts per
/// million: `platform_amount = amount * rate_ppm / 1_000_000`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub base_currency: String,
    pub rate_ppm: i64,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(currency: &str, rate_ppm: i64, updated_at: Option<DateTime<Utc>>) -> Self {
        let updated_at = updated_at.unwrap_or_else(Utc::now);
        Self { base_currency: currency.to_string(), rate_ppm, updated_at }
    }

    /// A 1:1 rate, used for the platform currency itself.
    pub fn parity(currency: &str) -> Self {
        Self::new(currency, 1_000_000, None)
    }

    pub fn convert_to_platform(&self, amount: Money) -> Money {
        Money::from(amount.value() * self.rate_ppm / 1_000_000)
    }
}

//--------------------------------------     AuditEntry      ---------------------------------------------------------
/// One row in the audit log. Every mutating operation records one of these, whether it succeeded
/// or not.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub actor_id: String,
    pub resource_id: String,
    pub result: String,
    pub meta: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub action: String,
    pub actor_id: String,
    pub resource_id: String,
    pub result: String,
    pub meta: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(action: &str, actor_id: &str, resource_id: impl std::fmt::Display) -> Self {
        Self {
            action: action.to_string(),
            actor_id: actor_id.to_string(),
            resource_id: resource_id.to_string(),
            result: "ok".to_string(),
            meta: None,
        }
    }

    pub fn failed(mut self, error: impl std::fmt::Display) -> Self {
        self.result = format!("error: {error}");
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exchange_rate_conversion() {
        let parity = ExchangeRate::parity("USD");
        assert_eq!(parity.convert_to_platform(Money::from(12_345)), Money::from(12_345));
        // 1 unit of base = 0.14 platform units
        let cny = ExchangeRate::new("CNY", 140_000, None);
        assert_eq!(cny.convert_to_platform(Money::from_units(100)), Money::from_units(14));
    }

    #[test]
    fn short_check_suggests_covering_tier() {
        let check = DepositCheck::short(SellerId(1), Money::from_units(130), Money::default(), None);
        assert!(check.requires_deposit);
        assert_eq!(check.required_amount, Money::from_units(130));
        assert_eq!(check.suggested_tier, Some(DepositTier::Tier300));
    }
}
