use thiserror::Error;

use crate::traits::ExchangeRate;

/// Exchange-rate lookups are an injected dependency. The sqlite backend keeps an updatable table
/// of rates, but any implementation (a fixed table in tests, a cache in front of a market feed)
/// satisfies the trait. The platform currency always converts at parity.
#[allow(async_fn_in_trait)]
pub trait ExchangeRates: Clone {
    async fn fetch_exchange_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError>;
    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
}

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("No exchange rate is available for {0}")]
    RateDoesNotExist(String),
}

impl From<sqlx::Error> for ExchangeRateError {
    fn from(e: sqlx::Error) -> Self {
        ExchangeRateError::DatabaseError(e.to_string())
    }
}
