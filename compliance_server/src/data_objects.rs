use std::fmt::Display;

use chrono::{DateTime, Utc};
use compliance_engine::db_types::{DepositTier, Money, OrderId, SellerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSellerRequest {
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateDepositRequest {
    pub seller_id: SellerId,
    pub amount: Money,
    pub currency: String,
}

/// The caller's identity supplies `opened_by`; the body only names the order and the grievance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDisputeRequest {
    pub order_id: OrderId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    /// The refund awarded to the buyer, if any. `None` closes the dispute without a refund.
    #[serde(default)]
    pub refund_amount: Option<Money>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub seller_id: SellerId,
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyRequest {
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub tier: DepositTier,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlagRequest {
    pub flagged: bool,
}

/// Provider webhook reporting a payout account's health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHealthNotification {
    pub account_id: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateUpdate {
    pub currency: String,
    pub rate_ppm: i64,
}
