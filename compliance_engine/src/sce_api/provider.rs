use thiserror::Error;

use crate::db_types::{DepositLot, Money, PaymentAccount, PaymentProvider};

/// Outbound calls to payment providers. Implementations talk to the real provider APIs; the
/// engine only ever sees this trait, so tests and the dispute orchestrator can run against a
/// stub.
///
/// All calls are fallible and side-effecting. Callers must persist their own state transitions
/// around each call so that a crash between "provider accepted" and "we recorded it" is
/// recoverable from the stored status.
#[allow(async_fn_in_trait)]
pub trait ProviderClient: Clone {
    /// Push a refund to the buyer over the payment method the order was paid with. Returns the
    /// provider's reference for the refund transaction.
    async fn refund_buyer(
        &self,
        provider: PaymentProvider,
        payment_ref: &str,
        amount: Money,
        currency: &str,
    ) -> Result<String, ProviderError>;

    /// Attempt to recover `amount` from the seller's payment account. Returns the amount the
    /// provider actually recovered, which may be less than requested; the caller books the
    /// difference as debt.
    async fn recover_from_seller(&self, account: &PaymentAccount, amount: Money) -> Result<Money, ProviderError>;

    /// Return (part of) a deposit lot to the seller via the provider it was funded through.
    /// Returns the provider's reference for the transfer.
    async fn refund_deposit(&self, lot: &DepositLot, amount: Money) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The provider declined the request: {0}")]
    Declined(String),
    #[error("The provider could not be reached: {0}")]
    Unavailable(String),
    #[error("The provider rejected the request as malformed: {0}")]
    InvalidRequest(String),
}
