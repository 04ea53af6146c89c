//! Client for the payment-operations service.
//!
//! The engine never talks to payment rails directly; it goes through
//! [`compliance_engine::ProviderClient`]. This is the production implementation, which forwards
//! each call to the internal payment-operations service over HTTP.

use std::sync::Arc;

use compliance_engine::{
    db_types::{DepositLot, Money, PaymentAccount, PaymentProvider},
    ProviderClient,
    ProviderError,
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{config::ProviderConfig, errors::ServerError};

#[derive(Clone)]
pub struct PaymentOpsClient {
    config: ProviderConfig,
    client: Arc<Client>,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    provider: PaymentProvider,
    reference: &'a str,
    amount: Money,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct RecoveryResponse {
    recovered: Money,
}

impl PaymentOpsClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.access_token.reveal()))
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ProviderError> {
        let url = self.url(path);
        trace!("Sending payment-ops request: {url}");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| ProviderError::Unavailable(e.to_string()));
        }
        let message = response.text().await.unwrap_or_else(|e| e.to_string());
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(ProviderError::InvalidRequest(message)),
            s if s.is_client_error() => Err(ProviderError::Declined(message)),
            _ => Err(ProviderError::Unavailable(format!("{status}: {message}"))),
        }
    }
}

impl ProviderClient for PaymentOpsClient {
    async fn refund_buyer(
        &self,
        provider: PaymentProvider,
        payment_ref: &str,
        amount: Money,
        currency: &str,
    ) -> Result<String, ProviderError> {
        let body = TransferRequest { provider, reference: payment_ref, amount, currency };
        let response: TransferResponse = self.post("/v1/refunds", &body).await?;
        debug!("Payment-ops accepted buyer refund of {amount} over {provider}. Ref {}", response.reference);
        Ok(response.reference)
    }

    async fn recover_from_seller(&self, account: &PaymentAccount, amount: Money) -> Result<Money, ProviderError> {
        let body = TransferRequest {
            provider: account.provider,
            reference: &account.provider_ref,
            amount,
            currency: scp_common::PLATFORM_CURRENCY_CODE,
        };
        let response: RecoveryResponse = self.post("/v1/recoveries", &body).await?;
        debug!("Payment-ops recovered {} of {amount} from account #{}", response.recovered, account.id);
        Ok(response.recovered)
    }

    async fn refund_deposit(&self, lot: &DepositLot, amount: Money) -> Result<String, ProviderError> {
        let body = TransferRequest {
            provider: lot.provider,
            reference: &lot.provider_ref,
            amount,
            currency: scp_common::PLATFORM_CURRENCY_CODE,
        };
        let response: TransferResponse = self.post("/v1/transfers", &body).await?;
        debug!("Payment-ops accepted deposit return of {amount} for lot #{}. Ref {}", lot.id, response.reference);
        Ok(response.reference)
    }
}
