//! Seller Compliance Engine
//!
//! The compliance engine keeps marketplace sellers financially accountable: it gates new orders
//! on deposit collateral, derives payout eligibility from verifiable facts, recovers seller
//! debts, settles affiliate commissions, and orchestrates dispute refunds. This library contains
//! the core logic and is HTTP-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend today,
//!    with Postgres stubbed behind a feature flag. You should never need to access the database
//!    directly; use the public API instead. The exception is the data types used in the
//!    database, defined in the public [`mod@db_types`] module.
//! 2. The engine public API ([`mod@sce_api`]). Backends implement the traits in [`mod@traits`]
//!    to power these APIs, and different APIs can run against different backends.
//!
//! The engine also emits events when compliance-relevant actions occur (an order blocked at the
//! collateral gate, an eligibility change, a debt collection, a dispute resolution). Subscribe
//! via [`events::EventHooks`] to deliver notifications; handler failures never propagate back
//! into the flows that emitted them.

pub mod db_types;
pub mod events;
pub mod helpers;
mod sce_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sce_api::{
    commission_api::CommissionApi,
    debt_api::DebtApi,
    deposit_api::{refund_fee_for, DepositApi},
    dispute_api::DisputeApi,
    eligibility_api::{calculate_eligibility, EligibilityApi},
    exchange_rate_api::ExchangeRateApi,
    order_flow_api::OrderFlowApi,
    provider::{ProviderClient, ProviderError},
    seller_api::{ComplianceSnapshot, SellerApi},
};
