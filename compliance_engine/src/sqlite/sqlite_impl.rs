//! `SqliteDatabase` is a concrete implementation of a compliance ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backing store and implements all the traits defined in
//! the [`crate::traits`] module. Compliance-critical read-then-write flows (the collateral gate,
//! the eligibility writer, debt collection) run inside a transaction *and* under a per-seller
//! lease from [`SellerLocks`], so two concurrent flows for the same seller serialize.
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{accounts, audit, commissions, db_url, debts, deposits, disputes, exchange_rates, new_pool, orders, refunds, sellers};
use crate::{
    db_types::{
        CommissionObligation,
        CommissionStatus,
        DepositLot,
        DepositLotStatus,
        Dispute,
        DisputeStatus,
        DepositTier,
        Money,
        NewCommission,
        NewDebt,
        NewDepositLot,
        NewDispute,
        NewOrder,
        NewPaymentAccount,
        Order,
        OrderId,
        OrderStatusType,
        PaymentAccount,
        PayoutEligibility,
        RefundObligation,
        RefundStatus,
        Seller,
        SellerDebt,
        SellerId,
    },
    helpers::SellerLocks,
    sce_api::eligibility_api::calculate_eligibility,
    traits::{
        AuditEntry,
        AuditError,
        AuditLog,
        CommissionManagement,
        ComplianceLedger,
        DebtCollection,
        DebtManagement,
        DepositCheck,
        DisputeManagement,
        EligibilityFacts,
        EligibilityUpdate,
        ExchangeRate,
        ExchangeRateError,
        ExchangeRates,
        LedgerError,
        NewAuditEntry,
        PayoutAdjustment,
        SellerAccounts,
        SellerApiError,
    },
};
use crate::db_types::PLATFORM_CURRENCY_CODE;

/// A pending debt this old marks the seller's `overdue_debt` eligibility fact.
const DEBT_OVERDUE_DAYS: i64 = 30;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    locks: SellerLocks,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool using the `SCE_DATABASE_URL` environment variable, or the
    /// default if unset.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, locks: SellerLocks::new() })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Converts an amount in `currency` into platform currency using the stored rate table.
    /// Unknown currencies are an error, never a silent pass-through.
    async fn to_platform(
        &self,
        amount: Money,
        currency: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Money, LedgerError> {
        let rate = exchange_rates::fetch_rate(currency, conn).await.map_err(|e| match e {
            ExchangeRateError::RateDoesNotExist(c) => LedgerError::UnknownCurrency(c),
            ExchangeRateError::DatabaseError(m) => LedgerError::DatabaseError(m),
        })?;
        Ok(rate.convert_to_platform(amount))
    }

    /// The seller's unfulfilled exposure in platform currency.
    async fn exposure_in_platform(
        &self,
        seller_id: SellerId,
        conn: &mut SqliteConnection,
    ) -> Result<Money, LedgerError> {
        let by_currency = orders::exposure_by_currency(seller_id, &mut *conn).await?;
        let mut total = Money::default();
        for (currency, amount) in by_currency {
            total += self.to_platform(amount, &currency, &mut *conn).await?;
        }
        Ok(total)
    }

    /// Evaluate the collateral requirement given a prospective exposure addition (already in
    /// platform currency). The caller holds the seller lease and the transaction.
    async fn deposit_check(
        &self,
        seller: &Seller,
        prospective: Money,
        conn: &mut SqliteConnection,
    ) -> Result<DepositCheck, LedgerError> {
        let existing = self.exposure_in_platform(seller.id, &mut *conn).await?;
        let total_exposure = existing + prospective;
        let collateral = deposits::available_collateral(seller.id, &mut *conn).await?;
        let check = if collateral >= total_exposure {
            DepositCheck::satisfied(seller.id, total_exposure, collateral)
        } else {
            DepositCheck::short(seller.id, total_exposure, collateral, seller.subscription_tier)
        };
        trace!(
            "🗃️ Collateral check for seller {}: exposure {total_exposure}, collateral {collateral}, requires deposit: \
             {}",
            seller.id,
            check.requires_deposit
        );
        Ok(check)
    }

    async fn require_seller(&self, seller_id: SellerId, conn: &mut SqliteConnection) -> Result<Seller, LedgerError> {
        sellers::fetch_seller(seller_id, conn).await?.ok_or(LedgerError::SellerNotFound(seller_id))
    }

    /// Assemble the eligibility facts inside the caller's transaction.
    async fn gather_facts(
        &self,
        seller: &Seller,
        now: DateTime<Utc>,
        conn: &mut SqliteConnection,
    ) -> Result<EligibilityFacts, LedgerError> {
        let account = accounts::default_for_seller(seller.id, &mut *conn).await?;
        let exposure = self.exposure_in_platform(seller.id, &mut *conn).await?;
        let collateral = deposits::available_collateral(seller.id, &mut *conn).await?;
        let cutoff = now - Duration::days(DEBT_OVERDUE_DAYS);
        let overdue_debt = debts::has_debt_older_than(seller.id, cutoff, &mut *conn).await?;
        Ok(EligibilityFacts {
            subscription_active: seller.subscription_active(now),
            account_bound: account.is_some(),
            account_verified: account.as_ref().map(|a| a.verified).unwrap_or(false),
            provider_enabled: account.as_ref().map(|a| a.provider_enabled).unwrap_or(false),
            risk_flagged: seller.risk_flagged,
            collateral_breach: exposure > collateral,
            overdue_debt,
        })
    }
}

impl ComplianceLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn process_new_order(&self, order: NewOrder) -> Result<(DepositCheck, Option<Order>), LedgerError> {
        let _lease = self.locks.lease(order.seller_id).await;
        let mut tx = self.pool.begin().await?;
        let seller = self.require_seller(order.seller_id, &mut tx).await?;
        let prospective = self.to_platform(order.total_price, &order.currency, &mut tx).await?;
        let check = self.deposit_check(&seller, prospective, &mut tx).await?;
        if check.requires_deposit {
            debug!("🗃️ Order [{}] rejected by the collateral gate: {}", order.order_id, check.reason);
            return Ok((check, None));
        }
        let (inserted, created) = orders::idempotent_insert(order, &mut tx).await?;
        if !created {
            return Err(LedgerError::OrderAlreadyExists(inserted.order_id));
        }
        tx.commit().await?;
        Ok((check, Some(inserted)))
    }

    async fn evaluate_deposit_requirement(
        &self,
        seller_id: SellerId,
        prospective: Money,
        currency: &str,
    ) -> Result<DepositCheck, LedgerError> {
        let _lease = self.locks.lease(seller_id).await;
        let mut conn = self.pool.acquire().await?;
        let seller = self.require_seller(seller_id, &mut conn).await?;
        let prospective = self.to_platform(prospective, currency, &mut conn).await?;
        self.deposit_check(&seller, prospective, &mut conn).await
    }

    async fn mark_order_shipped(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::transition_status(order_id, OrderStatusType::Paid, OrderStatusType::Shipped, &mut conn).await
    }

    async fn complete_order(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::transition_status(order_id, OrderStatusType::Shipped, OrderStatusType::Completed, &mut conn).await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::transition_status(order_id, OrderStatusType::Paid, OrderStatusType::Cancelled, &mut conn).await
    }

    async fn create_deposit_lot(&self, lot: NewDepositLot) -> Result<(DepositLot, bool), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        deposits::idempotent_insert(lot, &mut conn).await
    }

    async fn fetch_deposit_lot(&self, lot_id: i64) -> Result<Option<DepositLot>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(deposits::fetch_lot(lot_id, &mut conn).await?)
    }

    async fn release_deposit_lot(&self, lot_id: i64) -> Result<DepositLot, LedgerError> {
        let lot = {
            let mut conn = self.pool.acquire().await?;
            deposits::fetch_lot(lot_id, &mut conn).await?.ok_or(LedgerError::LotNotFound(lot_id))?
        };
        let _lease = self.locks.lease(lot.seller_id).await;
        let mut tx = self.pool.begin().await?;
        let exposure = self.exposure_in_platform(lot.seller_id, &mut tx).await?;
        let collateral = deposits::available_collateral(lot.seller_id, &mut tx).await?;
        // Releasing does not change collateral (Refundable lots still count); the strict check
        // is against the lot leaving custody entirely once its hold period lapses.
        if collateral - lot.available() < exposure {
            return Err(LedgerError::LotStillSecuringExposure(lot_id));
        }
        let lot = deposits::transition_status(lot_id, DepositLotStatus::Held, DepositLotStatus::Refundable, &mut tx).await?;
        tx.commit().await?;
        Ok(lot)
    }

    async fn request_deposit_refund(&self, lot_id: i64, seller_id: SellerId) -> Result<DepositLot, LedgerError> {
        let _lease = self.locks.lease(seller_id).await;
        let mut tx = self.pool.begin().await?;
        let lot = deposits::begin_refund(lot_id, seller_id, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(lot)
    }

    async fn complete_deposit_refund(
        &self,
        lot_id: i64,
        refund_fee: Money,
        refunded_amount: Money,
    ) -> Result<DepositLot, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        deposits::complete_refund(lot_id, refund_fee, refunded_amount, &mut conn).await
    }

    async fn update_payout_eligibility(&self, seller_id: SellerId) -> Result<EligibilityUpdate, LedgerError> {
        let _lease = self.locks.lease(seller_id).await;
        let mut tx = self.pool.begin().await?;
        let seller = self.require_seller(seller_id, &mut tx).await?;
        let previous = seller.payout_eligibility;
        let now = Utc::now();
        // Fail closed: if the facts cannot be read, the seller is blocked until they can.
        let (facts, current) = match self.gather_facts(&seller, now, &mut tx).await {
            Ok(facts) => {
                let (status, reason) = calculate_eligibility(&facts);
                trace!("🗃️ Eligibility for seller {seller_id} computed as {status}: {reason}");
                (facts, status)
            },
            Err(e) => {
                warn!("🗃️ Could not gather eligibility facts for seller {seller_id}: {e}. Blocking payouts.");
                (EligibilityFacts::default(), PayoutEligibility::Blocked)
            },
        };
        sellers::set_payout_eligibility(seller_id, current, &mut tx).await?;
        let stored = self.require_seller(seller_id, &mut tx).await?.payout_eligibility;
        if stored != current {
            return Err(LedgerError::EligibilityWriteRace(seller_id));
        }
        tx.commit().await?;
        Ok(EligibilityUpdate { seller_id, previous, current, facts })
    }

    async fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<SellerId>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sellers::expire_subscriptions(now, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SellerAccounts for SqliteDatabase {
    async fn fetch_seller(&self, seller_id: SellerId) -> Result<Option<Seller>, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sellers::fetch_seller(seller_id, &mut conn).await?)
    }

    async fn register_seller(&self, handle: &str) -> Result<Seller, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        sellers::register_seller(handle, &mut conn).await
    }

    async fn exposure_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        self.exposure_in_platform(seller_id, &mut conn).await.map_err(|e| match e {
            LedgerError::UnknownCurrency(c) => SellerApiError::UnknownCurrency(c),
            other => SellerApiError::DatabaseError(other.to_string()),
        })
    }

    async fn collateral_for_seller(&self, seller_id: SellerId) -> Result<Money, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(deposits::available_collateral(seller_id, &mut conn).await?)
    }

    async fn deposit_lots_for_seller(&self, seller_id: SellerId) -> Result<Vec<DepositLot>, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(deposits::lots_for_seller(seller_id, &mut conn).await?)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn add_payment_account(&self, account: NewPaymentAccount) -> Result<PaymentAccount, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::insert_account(account, &mut conn).await
    }

    async fn set_default_payment_account(
        &self,
        account_id: i64,
        seller_id: SellerId,
    ) -> Result<PaymentAccount, SellerApiError> {
        let mut tx = self.pool.begin().await?;
        let account = accounts::set_default(account_id, seller_id, &mut tx).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn verify_payment_account(&self, account_id: i64) -> Result<PaymentAccount, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::set_verified(account_id, &mut conn).await
    }

    async fn set_provider_account_health(
        &self,
        account_id: i64,
        enabled: bool,
    ) -> Result<PaymentAccount, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::set_provider_health(account_id, enabled, &mut conn).await
    }

    async fn default_payment_account(&self, seller_id: SellerId) -> Result<Option<PaymentAccount>, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::default_for_seller(seller_id, &mut conn).await?)
    }

    async fn set_subscription(
        &self,
        seller_id: SellerId,
        tier: DepositTier,
        expires_at: DateTime<Utc>,
    ) -> Result<Seller, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        sellers::set_subscription(seller_id, tier, expires_at, &mut conn).await
    }

    async fn set_risk_flag(&self, seller_id: SellerId, flagged: bool) -> Result<Seller, SellerApiError> {
        let mut conn = self.pool.acquire().await?;
        sellers::set_risk_flag(seller_id, flagged, &mut conn).await
    }
}

impl DebtManagement for SqliteDatabase {
    async fn create_debt(&self, debt: NewDebt) -> Result<SellerDebt, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        debts::insert_debt(debt, &mut conn).await
    }

    /// The debt list and the lot list are read inside the same transaction that consumes them,
    /// under the seller lease, so a concurrent deposit refund or second collection pass cannot
    /// double-spend a lot.
    async fn collect_from_deposits(&self, seller_id: SellerId) -> Result<DebtCollection, LedgerError> {
        let _lease = self.locks.lease(seller_id).await;
        let mut tx = self.pool.begin().await?;
        let pending = debts::pending_debts(seller_id, &mut tx).await?;
        if pending.is_empty() {
            return Ok(DebtCollection::empty(seller_id));
        }
        let lots = deposits::collectable_lots(seller_id, &mut tx).await?;
        let mut lot_iter = lots.into_iter();
        let mut current_lot: Option<(i64, Money)> = lot_iter.next().map(|l| (l.id, l.available()));
        let mut collection = DebtCollection::empty(seller_id);
        let mut drained_lots = 0usize;
        for debt in pending {
            let mut remaining = debt.outstanding;
            while remaining.is_positive() {
                let Some((lot_id, available)) = current_lot else { break };
                let take = remaining.min(available);
                deposits::consume_from_lot(lot_id, take, &mut tx).await?;
                debts::apply_collection(debt.id, take, &mut tx).await?;
                collection.total_collected += take;
                remaining -= take;
                let left_in_lot = available - take;
                if left_in_lot.is_zero() {
                    drained_lots += 1;
                    current_lot = lot_iter.next().map(|l| (l.id, l.available()));
                } else {
                    current_lot = Some((lot_id, left_in_lot));
                }
            }
            if remaining.is_zero() {
                collection.debts_settled += 1;
            }
            collection.outstanding += remaining;
        }
        // A partially consumed lot still counts as touched.
        if collection.total_collected.is_positive() && current_lot.is_some() {
            drained_lots += 1;
        }
        collection.lots_drained = drained_lots;
        tx.commit().await?;
        debug!(
            "🗃️ Collection for seller {seller_id}: {} recovered, {} debts settled, {} outstanding",
            collection.total_collected, collection.debts_settled, collection.outstanding
        );
        Ok(collection)
    }

    async fn collect_from_payout(
        &self,
        seller_id: SellerId,
        payout: Money,
        currency: &str,
    ) -> Result<PayoutAdjustment, LedgerError> {
        if !currency.eq_ignore_ascii_case(PLATFORM_CURRENCY_CODE) {
            return Err(LedgerError::CurrencyMismatch(currency.to_string(), PLATFORM_CURRENCY_CODE.to_string()));
        }
        let _lease = self.locks.lease(seller_id).await;
        let mut tx = self.pool.begin().await?;
        let pending = debts::pending_debts(seller_id, &mut tx).await?;
        let outstanding = pending.iter().map(|d| d.outstanding).sum::<Money>();
        let mut to_deduct = outstanding.min(payout);
        let deducted = to_deduct;
        for debt in &pending {
            if !to_deduct.is_positive() {
                break;
            }
            let take = to_deduct.min(debt.outstanding);
            debts::apply_collection(debt.id, take, &mut tx).await?;
            to_deduct -= take;
        }
        tx.commit().await?;
        Ok(PayoutAdjustment {
            seller_id,
            requested: payout,
            disbursable: payout - deducted,
            deducted,
            remaining_debt: outstanding - deducted,
        })
    }

    async fn sellers_with_pending_debts(&self) -> Result<Vec<SellerId>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(debts::sellers_with_pending_debts(&mut conn).await?)
    }

    async fn pending_debts(&self, seller_id: SellerId) -> Result<Vec<SellerDebt>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(debts::pending_debts(seller_id, &mut conn).await?)
    }

    async fn outstanding_debt(&self, seller_id: SellerId) -> Result<Money, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(debts::outstanding_total(seller_id, &mut conn).await?)
    }
}

impl CommissionManagement for SqliteDatabase {
    async fn create_commission(&self, commission: NewCommission) -> Result<(CommissionObligation, bool), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        commissions::idempotent_insert(commission, &mut conn).await
    }

    async fn settle_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let commission = commissions::fetch_commission(commission_id, &mut tx)
            .await?
            .ok_or(LedgerError::CommissionNotFound(commission_id))?;
        let order = orders::fetch_order_by_order_id(&commission.order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(commission.order_id.clone()))?;
        if order.status != OrderStatusType::Completed {
            return Err(LedgerError::CommissionOrderNotCompleted(commission_id, order.order_id));
        }
        let settled = commissions::transition_status(commission_id, CommissionStatus::Pending, CommissionStatus::Settled, &mut tx)
            .await?
            .ok_or(LedgerError::CommissionNotPending(commission_id))?;
        tx.commit().await?;
        Ok(settled)
    }

    async fn mark_overdue_commissions(&self, now: DateTime<Utc>) -> Result<Vec<CommissionObligation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::mark_overdue(now, &mut conn).await?)
    }

    async fn resolve_overdue_commission(&self, commission_id: i64) -> Result<CommissionObligation, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        commissions::transition_status(commission_id, CommissionStatus::Overdue, CommissionStatus::Resolved, &mut conn)
            .await?
            .ok_or(LedgerError::CommissionNotOverdue(commission_id))
    }

    async fn commissions_for_order(&self, order_id: &OrderId) -> Result<Vec<CommissionObligation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::commissions_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_commission(&self, commission_id: i64) -> Result<Option<CommissionObligation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commissions::fetch_commission(commission_id, &mut conn).await?)
    }
}

impl DisputeManagement for SqliteDatabase {
    async fn open_dispute(&self, dispute: NewDispute) -> Result<Dispute, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(&dispute.order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(dispute.order_id.clone()))?;
        let opened = disputes::insert_dispute(dispute, order.seller_id, &mut tx).await?;
        tx.commit().await?;
        Ok(opened)
    }

    async fn begin_dispute_review(&self, dispute_id: i64) -> Result<Dispute, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        disputes::begin_review(dispute_id, &mut conn).await
    }

    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        resolved_by: &str,
        refund_amount: Option<Money>,
        note: Option<&str>,
    ) -> Result<Dispute, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        disputes::resolve(dispute_id, resolved_by, refund_amount, note, &mut conn).await
    }

    async fn refund_for_dispute(&self, dispute_id: i64) -> Result<(RefundObligation, bool), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let dispute =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(LedgerError::DisputeNotFound(dispute_id))?;
        if dispute.status != DisputeStatus::Resolved {
            return Err(LedgerError::InvalidDisputeState(dispute_id, dispute.status.to_string()));
        }
        let order = orders::fetch_order_by_order_id(&dispute.order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(dispute.order_id.clone()))?;
        let result = refunds::idempotent_insert_for_dispute(&dispute, &order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn update_refund_status(
        &self,
        refund_id: i64,
        status: RefundStatus,
        provider_ref: Option<&str>,
    ) -> Result<RefundObligation, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        refunds::transition_status(refund_id, status, provider_ref, &mut conn).await
    }

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(disputes::fetch_dispute(dispute_id, &mut conn).await?)
    }

    async fn fetch_refund(&self, refund_id: i64) -> Result<Option<RefundObligation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(refunds::fetch_refund(refund_id, &mut conn).await?)
    }

    async fn open_dispute_for_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(disputes::open_dispute_for_order(order_id, &mut conn).await?)
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_exchange_rate(&self, currency: &str) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::fetch_rate(currency, &mut conn).await
    }

    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::set_rate(rate, &mut conn).await
    }
}

impl AuditLog for SqliteDatabase {
    async fn record_audit(&self, entry: NewAuditEntry) -> Result<i64, AuditError> {
        let mut conn = self.pool.acquire().await?;
        audit::insert_entry(entry, &mut conn).await
    }

    async fn audit_trail_for_seller(&self, seller_id: SellerId, limit: i64) -> Result<Vec<AuditEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        audit::trail_for_seller(seller_id, limit, &mut conn).await
    }
}
