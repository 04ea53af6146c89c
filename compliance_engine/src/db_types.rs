use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use scp_common::{Money, PLATFORM_CURRENCY_CODE};

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------      SellerId       ---------------------------------------------------------
/// The internal ledger id of a seller. Sellers are created by the account subsystem; the ledger
/// only ever references them by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct SellerId(pub i64);

impl Display for SellerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for SellerId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   PaymentProvider   ---------------------------------------------------------
/// The payment network a transaction was executed on. The raw provider integrations live outside
/// this crate; the ledger only records which one was used so that refunds and transfers can be
/// routed back through the same network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentProvider {
    CardNetwork,
    PayPal,
    Alipay,
    WeChatPay,
    BankTransfer,
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::CardNetwork => write!(f, "CardNetwork"),
            PaymentProvider::PayPal => write!(f, "PayPal"),
            PaymentProvider::Alipay => write!(f, "Alipay"),
            PaymentProvider::WeChatPay => write!(f, "WeChatPay"),
            PaymentProvider::BankTransfer => write!(f, "BankTransfer"),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CardNetwork" => Ok(Self::CardNetwork),
            "PayPal" => Ok(Self::PayPal),
            "Alipay" => Ok(Self::Alipay),
            "WeChatPay" => Ok(Self::WeChatPay),
            "BankTransfer" => Ok(Self::BankTransfer),
            s => Err(ConversionError(format!("Invalid payment provider: {s}"))),
        }
    }
}

impl From<String> for PaymentProvider {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!(
                "Invalid payment provider: {value}. But this conversion cannot fail. Defaulting to BankTransfer"
            );
            PaymentProvider::BankTransfer
        })
    }
}

//-------------------------------------- PayoutEligibility   ---------------------------------------------------------
/// The single three-state flag gating whether a seller may receive disbursed funds.
///
/// Every state other than [`PayoutEligibility::Eligible`] means "cannot receive funds" — there is
/// no partial trust in between. The only legal writer of this field is
/// [`crate::traits::ComplianceLedger::update_payout_eligibility`]; no raw setter exists anywhere
/// on the public surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutEligibility {
    Eligible,
    Blocked,
    PendingReview,
}

impl PayoutEligibility {
    pub fn can_receive_funds(&self) -> bool {
        matches!(self, PayoutEligibility::Eligible)
    }
}

impl Display for PayoutEligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutEligibility::Eligible => write!(f, "Eligible"),
            PayoutEligibility::Blocked => write!(f, "Blocked"),
            PayoutEligibility::PendingReview => write!(f, "PendingReview"),
        }
    }
}

impl FromStr for PayoutEligibility {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Eligible" => Ok(Self::Eligible),
            "Blocked" => Ok(Self::Blocked),
            "PendingReview" => Ok(Self::PendingReview),
            s => Err(ConversionError(format!("Invalid payout eligibility: {s}"))),
        }
    }
}

impl From<String> for PayoutEligibility {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid payout eligibility: {value}. Failing closed to Blocked");
            PayoutEligibility::Blocked
        })
    }
}

//--------------------------------------     DepositTier     ---------------------------------------------------------
/// The monotonic deposit tier ladder. Each tier carries a fixed collateral credit; an
/// under-collateralized seller is pointed at the smallest tier whose credit covers their total
/// exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
pub enum DepositTier {
    Tier10,
    Tier20,
    Tier50,
    Tier100,
    Tier300,
}

impl DepositTier {
    pub const LADDER: [DepositTier; 5] =
        [DepositTier::Tier10, DepositTier::Tier20, DepositTier::Tier50, DepositTier::Tier100, DepositTier::Tier300];

    /// The collateral credit this tier provides, in platform currency.
    pub fn credit(&self) -> Money {
        match self {
            DepositTier::Tier10 => Money::from_units(10),
            DepositTier::Tier20 => Money::from_units(20),
            DepositTier::Tier50 => Money::from_units(50),
            DepositTier::Tier100 => Money::from_units(100),
            DepositTier::Tier300 => Money::from_units(300),
        }
    }

    /// The smallest tier whose credit covers `exposure`, or the top tier if none does.
    pub fn minimum_covering(exposure: Money) -> DepositTier {
        Self::LADDER.iter().copied().find(|t| t.credit() >= exposure).unwrap_or(DepositTier::Tier300)
    }
}

impl Display for DepositTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositTier::Tier10 => write!(f, "Tier10"),
            DepositTier::Tier20 => write!(f, "Tier20"),
            DepositTier::Tier50 => write!(f, "Tier50"),
            DepositTier::Tier100 => write!(f, "Tier100"),
            DepositTier::Tier300 => write!(f, "Tier300"),
        }
    }
}

impl FromStr for DepositTier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tier10" => Ok(Self::Tier10),
            "Tier20" => Ok(Self::Tier20),
            "Tier50" => Ok(Self::Tier50),
            "Tier100" => Ok(Self::Tier100),
            "Tier300" => Ok(Self::Tier300),
            s => Err(ConversionError(format!("Invalid deposit tier: {s}"))),
        }
    }
}

impl From<String> for DepositTier {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid deposit tier: {value}. Defaulting to Tier10");
            DepositTier::Tier10
        })
    }
}

//--------------------------------------       Seller        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub handle: String,
    pub payout_eligibility: PayoutEligibility,
    pub risk_flagged: bool,
    pub subscription_tier: Option<DepositTier>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Seller {
    pub fn subscription_active(&self, now: DateTime<Utc>) -> bool {
        self.subscription_tier.is_some() && self.subscription_expires_at.map(|exp| exp > now).unwrap_or(false)
    }
}

//--------------------------------------  DepositLotStatus   ---------------------------------------------------------
/// The lifecycle of a deposit lot. A lot only ever moves forward through
/// `Held → Refundable → Refunding → Refunded`, or sideways to `Forfeited` while still held or
/// refundable. Skipping a state is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DepositLotStatus {
    Held,
    Refundable,
    Refunding,
    Refunded,
    Forfeited,
}

impl DepositLotStatus {
    pub fn can_transition_to(&self, next: DepositLotStatus) -> bool {
        use DepositLotStatus::*;
        matches!(
            (self, next),
            (Held, Refundable) | (Refundable, Refunding) | (Refunding, Refunded) | (Held, Forfeited) |
                (Refundable, Forfeited)
        )
    }

    /// Whether the lot still counts towards the seller's collateral.
    pub fn is_available(&self) -> bool {
        matches!(self, DepositLotStatus::Held | DepositLotStatus::Refundable)
    }
}

impl Display for DepositLotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositLotStatus::Held => write!(f, "Held"),
            DepositLotStatus::Refundable => write!(f, "Refundable"),
            DepositLotStatus::Refunding => write!(f, "Refunding"),
            DepositLotStatus::Refunded => write!(f, "Refunded"),
            DepositLotStatus::Forfeited => write!(f, "Forfeited"),
        }
    }
}

impl FromStr for DepositLotStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Held" => Ok(Self::Held),
            "Refundable" => Ok(Self::Refundable),
            "Refunding" => Ok(Self::Refunding),
            "Refunded" => Ok(Self::Refunded),
            "Forfeited" => Ok(Self::Forfeited),
            s => Err(ConversionError(format!("Invalid deposit lot status: {s}"))),
        }
    }
}

impl From<String> for DepositLotStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid deposit lot status: {value}. Defaulting to Held");
            DepositLotStatus::Held
        })
    }
}

//--------------------------------------     DepositLot      ---------------------------------------------------------
/// One unit of collateral a seller has posted. `amount` is what was originally funded;
/// `forfeited_amount` tracks how much of it has been drained to cover debts. The available
/// remainder is `amount - forfeited_amount` while the status is `Held` or `Refundable`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DepositLot {
    pub id: i64,
    pub seller_id: SellerId,
    pub amount: Money,
    pub forfeited_amount: Money,
    pub currency: String,
    pub status: DepositLotStatus,
    pub provider: PaymentProvider,
    pub provider_ref: String,
    pub refundable_after: DateTime<Utc>,
    pub refund_fee: Option<Money>,
    pub refunded_amount: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepositLot {
    pub fn available(&self) -> Money {
        if self.status.is_available() {
            self.amount - self.forfeited_amount
        } else {
            Money::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDepositLot {
    pub seller_id: SellerId,
    pub amount: Money,
    /// The payment network the lot was funded through.
    pub provider: PaymentProvider,
    /// The provider's transaction reference. Doubles as the idempotency key for lot creation.
    pub provider_ref: String,
    pub refundable_after: DateTime<Utc>,
}

//--------------------------------------     DebtStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DebtStatus {
    /// The debt is outstanding, in whole or in part.
    Pending,
    /// The debt was recovered from collateral or an intercepted payout.
    Collected,
    /// The debt was settled directly by the seller.
    Paid,
}

impl Display for DebtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebtStatus::Pending => write!(f, "Pending"),
            DebtStatus::Collected => write!(f, "Collected"),
            DebtStatus::Paid => write!(f, "Paid"),
        }
    }
}

impl FromStr for DebtStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Collected" => Ok(Self::Collected),
            "Paid" => Ok(Self::Paid),
            s => Err(ConversionError(format!("Invalid debt status: {s}"))),
        }
    }
}

impl From<String> for DebtStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid debt status: {value}. Defaulting to Pending");
            DebtStatus::Pending
        })
    }
}

//--------------------------------------      DebtCause      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DebtCause {
    RefundShortfall,
    OverdueCommission,
    ViolationPenalty,
}

impl Display for DebtCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebtCause::RefundShortfall => write!(f, "RefundShortfall"),
            DebtCause::OverdueCommission => write!(f, "OverdueCommission"),
            DebtCause::ViolationPenalty => write!(f, "ViolationPenalty"),
        }
    }
}

impl FromStr for DebtCause {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RefundShortfall" => Ok(Self::RefundShortfall),
            "OverdueCommission" => Ok(Self::OverdueCommission),
            "ViolationPenalty" => Ok(Self::ViolationPenalty),
            s => Err(ConversionError(format!("Invalid debt cause: {s}"))),
        }
    }
}

impl From<String> for DebtCause {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid debt cause: {value}. Defaulting to ViolationPenalty");
            DebtCause::ViolationPenalty
        })
    }
}

//--------------------------------------     SellerDebt      ---------------------------------------------------------
/// An amount a seller owes the platform. Debts are append-only: they are created once and then
/// only resolved by collection events, never edited in place. Partial collection reduces
/// `outstanding` and leaves the status `Pending`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SellerDebt {
    pub id: i64,
    pub seller_id: SellerId,
    pub cause: DebtCause,
    pub order_id: Option<OrderId>,
    pub dispute_id: Option<i64>,
    pub amount: Money,
    pub outstanding: Money,
    pub currency: String,
    pub status: DebtStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDebt {
    pub seller_id: SellerId,
    pub cause: DebtCause,
    pub order_id: Option<OrderId>,
    pub dispute_id: Option<i64>,
    pub amount: Money,
}

//--------------------------------------  CommissionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CommissionStatus {
    Pending,
    Settled,
    Overdue,
    Resolved,
}

impl Display for CommissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionStatus::Pending => write!(f, "Pending"),
            CommissionStatus::Settled => write!(f, "Settled"),
            CommissionStatus::Overdue => write!(f, "Overdue"),
            CommissionStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

impl FromStr for CommissionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Settled" => Ok(Self::Settled),
            "Overdue" => Ok(Self::Overdue),
            "Resolved" => Ok(Self::Resolved),
            s => Err(ConversionError(format!("Invalid commission status: {s}"))),
        }
    }
}

impl From<String> for CommissionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid commission status: {value}. Defaulting to Pending");
            CommissionStatus::Pending
        })
    }
}

//-------------------------------------- CommissionObligation ---------------------------------------------------------
/// An amount owed to an affiliate for one order line. Tied 1:1 to an (order, product) pair and
/// only becomes settleable once the underlying order reaches `Completed`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommissionObligation {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub affiliate_id: String,
    pub seller_id: SellerId,
    pub rate_bps: i64,
    pub amount: Money,
    pub currency: String,
    pub status: CommissionStatus,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommission {
    pub order_id: OrderId,
    pub product_id: String,
    pub affiliate_id: String,
    pub seller_id: SellerId,
    pub rate_bps: i64,
    pub amount: Money,
    pub due_at: DateTime<Utc>,
}

//--------------------------------------   DisputeStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DisputeStatus {
    Pending,
    Reviewing,
    Resolved,
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeStatus::Pending => write!(f, "Pending"),
            DisputeStatus::Reviewing => write!(f, "Reviewing"),
            DisputeStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

impl FromStr for DisputeStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Reviewing" => Ok(Self::Reviewing),
            "Resolved" => Ok(Self::Resolved),
            s => Err(ConversionError(format!("Invalid dispute status: {s}"))),
        }
    }
}

impl From<String> for DisputeStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid dispute status: {value}. Defaulting to Pending");
            DisputeStatus::Pending
        })
    }
}

//--------------------------------------      Dispute        ---------------------------------------------------------
/// A buyer/seller dispute over an order. At most one non-resolved dispute may exist per order at
/// a time; the database enforces this with a partial unique index.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Dispute {
    pub id: i64,
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub opened_by: String,
    pub reason: String,
    pub status: DisputeStatus,
    pub refund_amount: Option<Money>,
    pub resolved_by: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDispute {
    pub order_id: OrderId,
    pub opened_by: String,
    pub reason: String,
}

//--------------------------------------    RefundStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RefundStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "Pending"),
            RefundStatus::Processing => write!(f, "Processing"),
            RefundStatus::Completed => write!(f, "Completed"),
            RefundStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid refund status: {s}"))),
        }
    }
}

impl From<String> for RefundStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid refund status: {value}. Defaulting to Pending");
            RefundStatus::Pending
        })
    }
}

//--------------------------------------  RefundObligation   ---------------------------------------------------------
/// A buyer-facing refund derived from a dispute resolution or an admin action. It is driven to
/// completion through the provider that carried the original payment; a shortfall on the seller
/// side becomes a [`SellerDebt`] after the buyer has been made whole.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RefundObligation {
    pub id: i64,
    pub dispute_id: Option<i64>,
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub amount: Money,
    pub currency: String,
    pub provider: PaymentProvider,
    pub provider_ref: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   PaymentAccount    ---------------------------------------------------------
/// A seller's receiving account at a payment provider. `verified` is the platform-side admin
/// verification; `provider_enabled` is the provider-reported account health.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub id: i64,
    pub seller_id: SellerId,
    pub provider: PaymentProvider,
    pub provider_ref: String,
    pub is_default: bool,
    pub verified: bool,
    pub provider_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentAccount {
    pub seller_id: SellerId,
    pub provider: PaymentProvider,
    pub provider_ref: String,
}

//--------------------------------------  OrderStatusType    ---------------------------------------------------------
/// The ledger's view of an order. Orders enter the ledger once they are paid; `Paid` and
/// `Shipped` orders make up the seller's unfulfilled exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatusType {
    /// Paid-but-not-fulfilled orders are what deposit collateral must cover.
    pub fn counts_as_exposure(&self) -> bool {
        matches!(self, OrderStatusType::Paid | OrderStatusType::Shipped)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(Self::Paid),
            "Shipped" => Ok(Self::Shipped),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Paid");
            OrderStatusType::Paid
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub buyer_id: String,
    pub total_price: Money,
    pub currency: String,
    /// The provider and reference of the original payment, used to route refunds.
    pub payment_provider: PaymentProvider,
    pub payment_ref: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub seller_id: SellerId,
    pub buyer_id: String,
    pub total_price: Money,
    pub currency: String,
    pub payment_provider: PaymentProvider,
    pub payment_ref: String,
}

impl NewOrder {
    pub fn new(order_id: OrderId, seller_id: SellerId, buyer_id: String, total_price: Money) -> Self {
        Self {
            order_id,
            seller_id,
            buyer_id,
            total_price,
            currency: PLATFORM_CURRENCY_CODE.to_string(),
            payment_provider: PaymentProvider::CardNetwork,
            payment_ref: String::new(),
        }
    }

    pub fn with_payment(mut self, provider: PaymentProvider, payment_ref: &str) -> Self {
        self.payment_provider = provider;
        self.payment_ref = payment_ref.to_string();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }
}

//--------------------------------------        Role         ---------------------------------------------------------
/// The access roles the upstream gateway may assert for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// A regular marketplace user (buyer or seller).
    User,
    /// Platform operators: dispute resolution, account verification, manual collections.
    Admin,
    /// The scheduled job runner.
    Cron,
}

pub type Roles = Vec<Role>;

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::Cron => write!(f, "cron"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "cron" => Ok(Self::Cron),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tier_ladder_is_monotone() {
        let mut last = Money::default();
        for tier in DepositTier::LADDER {
            assert!(tier.credit() > last);
            last = tier.credit();
        }
    }

    #[test]
    fn minimum_covering_tier() {
        assert_eq!(DepositTier::minimum_covering(Money::from_units(5)), DepositTier::Tier10);
        assert_eq!(DepositTier::minimum_covering(Money::from_units(10)), DepositTier::Tier10);
        assert_eq!(DepositTier::minimum_covering(Money::from_units(11)), DepositTier::Tier20);
        assert_eq!(DepositTier::minimum_covering(Money::from_units(130)), DepositTier::Tier300);
        // exposure above the top rung still suggests the top tier
        assert_eq!(DepositTier::minimum_covering(Money::from_units(1_000)), DepositTier::Tier300);
    }

    #[test]
    fn deposit_lot_transitions_are_forward_only() {
        use DepositLotStatus::*;
        assert!(Held.can_transition_to(Refundable));
        assert!(Refundable.can_transition_to(Refunding));
        assert!(Refunding.can_transition_to(Refunded));
        assert!(Held.can_transition_to(Forfeited));
        assert!(Refundable.can_transition_to(Forfeited));
        // skipping a state is invalid
        assert!(!Held.can_transition_to(Refunding));
        assert!(!Held.can_transition_to(Refunded));
        assert!(!Refundable.can_transition_to(Refunded));
        // no going back
        assert!(!Refunded.can_transition_to(Held));
        assert!(!Forfeited.can_transition_to(Held));
        assert!(!Refunding.can_transition_to(Refundable));
    }

    #[test]
    fn exposure_statuses() {
        assert!(OrderStatusType::Paid.counts_as_exposure());
        assert!(OrderStatusType::Shipped.counts_as_exposure());
        assert!(!OrderStatusType::Completed.counts_as_exposure());
        assert!(!OrderStatusType::Cancelled.counts_as_exposure());
    }
}
