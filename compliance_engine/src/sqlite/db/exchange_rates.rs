use sqlx::SqliteConnection;

use crate::{
    db_types::PLATFORM_CURRENCY_CODE,
    traits::{ExchangeRate, ExchangeRateError},
};

/// The latest known rate for a currency. The platform currency always converts at parity and
/// needs no table entry.
pub async fn fetch_rate(currency: &str, conn: &mut SqliteConnection) -> Result<ExchangeRate, ExchangeRateError> {
    if currency.eq_ignore_ascii_case(PLATFORM_CURRENCY_CODE) {
        return Ok(ExchangeRate::parity(PLATFORM_CURRENCY_CODE));
    }
    let rate = sqlx::query_as::<_, ExchangeRate>(
        "SELECT base_currency, rate_ppm, updated_at FROM exchange_rates WHERE base_currency = $1 ORDER BY updated_at \
         DESC LIMIT 1",
    )
    .bind(currency)
    .fetch_optional(conn)
    .await
    .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?
    .ok_or_else(|| ExchangeRateError::RateDoesNotExist(currency.to_string()))?;
    Ok(rate)
}

pub async fn set_rate(rate: &ExchangeRate, conn: &mut SqliteConnection) -> Result<(), ExchangeRateError> {
    sqlx::query("INSERT INTO exchange_rates (base_currency, rate_ppm, updated_at) VALUES ($1, $2, $3)")
        .bind(&rate.base_currency)
        .bind(rate.rate_ppm)
        .bind(rate.updated_at)
        .execute(conn)
        .await
        .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
    Ok(())
}
