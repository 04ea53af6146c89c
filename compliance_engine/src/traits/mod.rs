//! The behaviour of the compliance engine is defined by the traits in this module. Each backing
//! store (sqlite today, postgres behind a feature flag tomorrow) implements these traits and the
//! rest of the system is written against them.
//!
//! * [`ComplianceLedger`] - the order lifecycle, the deposit requirement gate, deposit lot
//!   custody, and the single writer for payout eligibility.
//! * [`SellerAccounts`] - seller records, exposure/collateral queries and payment accounts.
//! * [`DebtManagement`] - seller debt creation and the two collection paths.
//! * [`CommissionManagement`] - affiliate commission obligations and settlement.
//! * [`DisputeManagement`] - disputes and the refunds they resolve into.
//! * [`ExchangeRates`] - injected currency conversion.
//! * [`AuditLog`] - the append-only audit trail.

mod audit;
mod commission_management;
mod compliance_ledger;
mod data_objects;
mod debt_management;
mod dispute_management;
mod exchange_rates;
mod seller_accounts;

pub use audit::{AuditError, AuditLog};
pub use commission_management::CommissionManagement;
pub use compliance_ledger::{ComplianceLedger, LedgerError};
pub use data_objects::{
    AuditEntry,
    DebtCollection,
    DepositCheck,
    EligibilityFacts,
    EligibilityUpdate,
    ExchangeRate,
    NewAuditEntry,
    PayoutAdjustment,
    SweepFailure,
    SweepReport,
};
pub use debt_management::DebtManagement;
pub use dispute_management::DisputeManagement;
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use seller_accounts::{SellerAccounts, SellerApiError};
