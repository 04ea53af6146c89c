//! # Compliance engine public API
//!
//! The `sce_api` module exposes the programmatic API for the seller compliance engine. The API
//! is modular: clients pick the pieces they need, and different pieces can run against different
//! backends as long as each backend implements the traits the piece requires.
//!
//! * [`order_flow_api`] runs order intake through the collateral gate and the order lifecycle.
//! * [`deposit_api`] handles deposit lot custody and refunds.
//! * [`eligibility_api`] is the payout-eligibility surface (recompute and read; never set).
//! * [`debt_api`] books debts and drives the two collection paths.
//! * [`commission_api`] manages affiliate commission obligations and the overdue sweep.
//! * [`dispute_api`] orchestrates disputes and the refunds their resolutions produce.
//! * [`seller_api`] manages the seller facts (accounts, subscriptions, flags) that eligibility
//!   is computed from.
//! * [`exchange_rate_api`] maintains the conversion table for non-platform currencies.
//!
//! The pattern for using all the APIs is the same: construct the API over a backend that
//! implements the traits it requires.
//!
//! ```rust,ignore
//! use compliance_engine::{DebtApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements DebtManagement and AuditLog
//! let api = DebtApi::new(db, producers);
//! let report = api.run_collection_sweep().await?;
//! ```

pub mod commission_api;
pub mod debt_api;
pub mod deposit_api;
pub mod dispute_api;
pub mod eligibility_api;
pub mod exchange_rate_api;
pub mod order_flow_api;
pub mod provider;
pub mod seller_api;

pub use provider::{ProviderClient, ProviderError};
