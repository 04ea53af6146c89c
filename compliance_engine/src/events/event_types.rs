use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Dispute, Money, Order, PayoutEligibility, RefundObligation, SellerId},
    traits::{DebtCollection, DepositCheck},
};

/// A new order was blocked at the compliance gate because the seller's deposit collateral does
/// not cover the prospective exposure. Notification hooks use this to nudge the seller to top up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRequiredEvent {
    pub seller_id: SellerId,
    pub check: DepositCheck,
}

impl DepositRequiredEvent {
    pub fn new(check: DepositCheck) -> Self {
        Self { seller_id: check.seller_id, check }
    }
}

/// A seller's payout eligibility changed value. Only emitted when the recomputed status differs
/// from the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityChangedEvent {
    pub seller_id: SellerId,
    pub previous: PayoutEligibility,
    pub current: PayoutEligibility,
}

impl EligibilityChangedEvent {
    pub fn new(seller_id: SellerId, previous: PayoutEligibility, current: PayoutEligibility) -> Self {
        Self { seller_id, previous, current }
    }
}

/// Debt was recovered from a seller's deposit lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtCollectedEvent {
    pub collection: DebtCollection,
}

impl DebtCollectedEvent {
    pub fn new(collection: DebtCollection) -> Self {
        Self { collection }
    }
}

/// A dispute reached its terminal state. Carries the refund obligation, if the resolution
/// produced one, so hooks can notify both buyer and seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeResolvedEvent {
    pub dispute: Dispute,
    pub refund: Option<RefundObligation>,
}

impl DisputeResolvedEvent {
    pub fn new(dispute: Dispute, refund: Option<RefundObligation>) -> Self {
        Self { dispute, refund }
    }
}

/// An order completed and became payout-relevant revenue for the seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
    pub commission_total: Money,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, commission_total: Money) -> Self {
        Self { order, commission_total }
    }
}
