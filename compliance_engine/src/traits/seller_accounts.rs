use thiserror::Error;

use crate::db_types::{DepositLot, Money, NewPaymentAccount, Order, PaymentAccount, Seller, SellerId};

/// Read-side queries over sellers plus the payment-account bookkeeping that feeds the
/// eligibility calculation. Mutations here (binding a default account, admin verification,
/// provider health updates) change *facts*; callers must follow up with an eligibility recompute
/// through [`crate::traits::ComplianceLedger::update_payout_eligibility`].
#[allow(async_fn_in_trait)]
pub trait SellerAccounts: Clone {
    async fn fetch_seller(&self, seller_id: SellerId) -> Result<Option<Seller>, SellerApiError>;

    /// Register a seller with the ledger. Used by the account subsystem when a seller first
    /// lists; idempotent on the handle.
    async fn register_seller(&self, handle: &str) -> Result<Seller, SellerApiError>;

    /// The seller's unfulfilled order exposure, converted to platform currency.
    async fn exposure_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError>;

    /// The seller's available deposit collateral (held/refundable, non-forfeited lots).
    async fn collateral_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError>;

    async fn deposit_lots_for_seller(&self, seller_id: SellerId) -> Result<Vec<DepositLot>, SellerApiError>;

    async fn fetch_order(&self, order_id: &crate::db_types::OrderId) -> Result<Option<Order>, SellerApiError>;

    async fn add_payment_account(&self, account: NewPaymentAccount) -> Result<PaymentAccount, SellerApiError>;

    /// Bind an account as the seller's default receiving account. Clears the flag on any other
    /// account of the same seller.
    async fn set_default_payment_account(
        &self,
        account_id: i64,
        seller_id: SellerId,
    ) -> Result<PaymentAccount, SellerApiError>;

    /// Admin verification of a payment account.
    async fn verify_payment_account(&self, account_id: i64) -> Result<PaymentAccount, SellerApiError>;

    /// Record the provider-reported health of an account (provider callback).
    async fn set_provider_account_health(&self, account_id: i64, enabled: bool)
        -> Result<PaymentAccount, SellerApiError>;

    /// The seller's default payment account, if one is bound.
    async fn default_payment_account(&self, seller_id: SellerId) -> Result<Option<PaymentAccount>, SellerApiError>;

    /// Set or extend a seller's subscription. `expires_at` is absolute.
    async fn set_subscription(
        &self,
        seller_id: SellerId,
        tier: crate::db_types::DepositTier,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Seller, SellerApiError>;

    /// Raise or clear the seller's risk/violation flag.
    async fn set_risk_flag(&self, seller_id: SellerId, flagged: bool) -> Result<Seller, SellerApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum SellerApiError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested seller {0} does not exist")]
    SellerNotFound(SellerId),
    #[error("The requested payment account {0} does not exist")]
    PaymentAccountNotFound(i64),
    #[error("Payment account {0} does not belong to seller {1}")]
    PaymentAccountOwnershipMismatch(i64, SellerId),
    #[error("No exchange rate is known for currency {0}")]
    UnknownCurrency(String),
}

impl From<sqlx::Error> for SellerApiError {
    fn from(e: sqlx::Error) -> Self {
        SellerApiError::DatabaseError(e.to_string())
    }
}
