use chrono::{DateTime, Utc};
use compliance_engine::{
    db_types::{
        CommissionObligation,
        DepositLot,
        DepositTier,
        Money,
        NewCommission,
        NewDebt,
        NewDepositLot,
        NewOrder,
        NewPaymentAccount,
        Order,
        OrderId,
        PaymentAccount,
        Seller,
        SellerDebt,
        SellerId,
    },
    traits::{
        AuditEntry,
        AuditError,
        AuditLog,
        CommissionManagement,
        ComplianceLedger,
        DebtCollection,
        DebtManagement,
        DepositCheck,
        EligibilityUpdate,
        LedgerError,
        NewAuditEntry,
        PayoutAdjustment,
        SellerAccounts,
        SellerApiError,
    },
};
use mockall::mock;

mock! {
    pub Backend {}

    impl Clone for Backend {
        fn clone(&self) -> Self;
    }

    impl ComplianceLedger for Backend {
        fn url(&self) -> &str;
        async fn process_new_order(&self, order: NewOrder) -> Result<(DepositCheck, Option<Order>), LedgerError>;
        async fn evaluate_deposit_requirement(&self, seller_id: SellerId, prospective: Money, currency: &str) -> Result<DepositCheck, LedgerError>;
        async fn mark_order_shipped(&self, order_id: &OrderId) -> Result<Order, LedgerError>;
        async fn complete_order(&self, order_id: &OrderId) -> Result<Order, LedgerError>;
        async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, LedgerError>;
        async fn create_deposit_lot(&self, lot: NewDepositLot) -> Result<(DepositLot, bool), LedgerError>;
        async fn fetch_deposit_lot(&self, lot_id: i64) -> Result<Option<DepositLot>, LedgerError>;
        async fn release_deposit_lot(&self, lot_id: i64) -> Result<DepositLot, LedgerError>;
        async fn request_deposit_refund(&self, lot_id: i64, seller_id: SellerId) -> Result<DepositLot, LedgerError>;
        async fn complete_deposit_refund(&self, lot_id: i64, refund_fee: Money, refunded_amount: Money) -> Result<DepositLot, LedgerError>;
        async fn update_payout_eligibility(&self, seller_id: SellerId) -> Result<EligibilityUpdate, LedgerError>;
        async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<SellerId>, LedgerError>;
    }

    impl CommissionManagement for Backend {
        async fn create_commission(&self, commission: NewCommission) -> Result<(CommissionObligation, bool), LedgerError>;
        async fn settle_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError>;
        async fn mark_overdue_commissions(&self, now: DateTime<Utc>) -> Result<Vec<CommissionObligation>, LedgerError>;
        async fn resolve_overdue_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError>;
        async fn commissions_for_order(&self, order_id: &OrderId) -> Result<Vec<CommissionObligation>, LedgerError>;
        async fn fetch_commission(&self, commission_id: i64) -> Result<Option<CommissionObligation>, LedgerError>;
    }

    impl AuditLog for Backend {
        async fn record_audit(&self, entry: NewAuditEntry) -> Result<i64, AuditError>;
        async fn audit_trail_for_seller(&self, seller_id: SellerId, limit: i64) -> Result<Vec<AuditEntry>, AuditError>;
    }

    impl DebtManagement for Backend {
        async fn create_debt(&self, debt: NewDebt) -> Result<SellerDebt, LedgerError>;
        async fn collect_from_deposits(&self, seller_id: SellerId) -> Result<DebtCollection, LedgerError>;
        async fn collect_from_payout(&self, seller_id: SellerId, payout: Money, currency: &str) -> Result<PayoutAdjustment, LedgerError>;
        async fn sellers_with_pending_debts(&self) -> Result<Vec<SellerId>, LedgerError>;
        async fn pending_debts(&self, seller_id: SellerId) -> Result<Vec<SellerDebt>, LedgerError>;
        async fn outstanding_debt(&self, seller_id: SellerId) -> Result<Money, LedgerError>;
    }

    impl SellerAccounts for Backend {
        async fn fetch_seller(&self, seller_id: SellerId) -> Result<Option<Seller>, SellerApiError>;
        async fn register_seller(&self, handle: &str) -> Result<Seller, SellerApiError>;
        async fn exposure_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError>;
        async fn collateral_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError>;
        async fn deposit_lots_for_seller(&self, seller_id: SellerId) -> Result<Vec<DepositLot>, SellerApiError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SellerApiError>;
        async fn add_payment_account(&self, account: NewPaymentAccount) -> Result<PaymentAccount, SellerApiError>;
        async fn set_default_payment_account(&self, account_id: i64, seller_id: SellerId) -> Result<PaymentAccount, SellerApiError>;
        async fn verify_payment_account(&self, account_id: i64) -> Result<PaymentAccount, SellerApiError>;
        async fn set_provider_account_health(&self, account_id: i64, enabled: bool) -> Result<PaymentAccount, SellerApiError>;
        async fn default_payment_account(&self, seller_id: SellerId) -> Result<Option<PaymentAccount>, SellerApiError>;
        async fn set_subscription(&self, seller_id: SellerId, tier: DepositTier, expires_at: DateTime<Utc>) -> Result<Seller, SellerApiError>;
        async fn set_risk_flag(&self, seller_id: SellerId, flagged: bool) -> Result<Seller, SellerApiError>;
    }
}
