//! The exchange-rate surface lets operators keep the conversion table current. The engine only
//! ever converts *into* the platform currency; original amounts and currencies are preserved on
//! the rows that carry them.

use std::fmt::Debug;

use crate::traits::{ExchangeRate, ExchangeRateError, ExchangeRates};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_exchange_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_exchange_rate(currency).await
    }

    pub async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        self.db.set_exchange_rate(rate).await
    }
}
