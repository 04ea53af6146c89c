use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use compliance_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CommissionApi,
    DebtApi,
    DepositApi,
    DisputeApi,
    EligibilityApi,
    ExchangeRateApi,
    OrderFlowApi,
    SellerApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::CronAccess,
    config::ServerConfig,
    errors::ServerError,
    integrations::PaymentOpsClient,
    middleware::IdentityMiddlewareFactory,
    routes::{
        health,
        AccountHealthRoute,
        AddPaymentAccountRoute,
        AdjustPayoutRoute,
        AuditTrailRoute,
        CancelOrderRoute,
        ComplianceSnapshotRoute,
        CompleteOrderRoute,
        CronCommissionSweepRoute,
        CronDebtSweepRoute,
        CronSubscriptionSweepRoute,
        EvaluateDepositRoute,
        GetExchangeRateRoute,
        ImposePenaltyRoute,
        MyComplianceRoute,
        MyDepositsRoute,
        NewCommissionRoute,
        NewDepositRoute,
        NewOrderRoute,
        OpenDisputeRoute,
        OrderCommissionsRoute,
        RefreshEligibilityRoute,
        RefundDepositRoute,
        RegisterSellerRoute,
        ReleaseDepositRoute,
        ResolveCommissionRoute,
        ResolveDisputeRoute,
        RetryDepositRefundRoute,
        RetryRefundRoute,
        ReviewDisputeRoute,
        SetDefaultAccountRoute,
        SetExchangeRateRoute,
        SetRiskFlagRoute,
        SetSubscriptionRoute,
        SettleCommissionRoute,
        ShipOrderRoute,
        VerifyAccountRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The fire-and-forget notification sink. Every compliance-relevant event lands here after the
/// emitting flow has already committed; a slow or broken hook never fails the request that
/// produced it. Delivery to sellers is handled upstream off these log lines for now.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_deposit_required(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Seller {} had an order blocked at the deposit gate. Required top-up: {}. {}",
                    ev.seller_id, ev.check.required_amount, ev.check.reason
                );
            })
        })
        .on_eligibility_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Seller {} payout eligibility moved from {} to {}", ev.seller_id, ev.previous, ev.current);
            })
        })
        .on_debt_collected(|ev| {
            Box::pin(async move {
                let c = ev.collection;
                info!(
                    "📬️ Collected {} from seller {} ({} debt(s) settled, {} lot(s) drained). Outstanding: {}",
                    c.total_collected, c.seller_id, c.debts_settled, c.lots_drained, c.outstanding
                );
            })
        })
        .on_dispute_resolved(|ev| {
            Box::pin(async move {
                match &ev.refund {
                    Some(refund) => info!(
                        "📬️ Dispute #{} on order [{}] resolved with a buyer refund of {} {}",
                        ev.dispute.id, ev.dispute.order_id, refund.amount, refund.currency
                    ),
                    None => info!("📬️ Dispute #{} on order [{}] resolved without a refund", ev.dispute.id, ev.dispute.order_id),
                }
            })
        })
        .on_order_completed(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Order [{}] completed for seller {}. Commission obligations total {}",
                    ev.order.order_id, ev.order.seller_id, ev.commission_total
                );
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let provider = PaymentOpsClient::new(config.provider.clone())?;
    let srv = HttpServer::new(move || {
        let order_api = OrderFlowApi::new(db.clone(), producers.clone());
        let seller_api = SellerApi::new(db.clone());
        let eligibility_api = EligibilityApi::new(db.clone(), producers.clone());
        let debt_api = DebtApi::new(db.clone(), producers.clone());
        let commission_api = CommissionApi::new(db.clone());
        let dispute_api = DisputeApi::new(db.clone(), provider.clone(), producers.clone());
        let deposit_api = DepositApi::new(db.clone(), provider.clone());
        let rates_api = ExchangeRateApi::new(db.clone());
        let cron_access = CronAccess::new(config.cron_secret.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sce::access_log"))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(seller_api))
            .app_data(web::Data::new(eligibility_api))
            .app_data(web::Data::new(debt_api))
            .app_data(web::Data::new(commission_api))
            .app_data(web::Data::new(dispute_api))
            .app_data(web::Data::new(deposit_api))
            .app_data(web::Data::new(rates_api))
            .app_data(web::Data::new(cron_access));
        // Routes that require a gateway-signed identity
        let api_scope = web::scope("/api")
            .wrap(IdentityMiddlewareFactory::new(config.auth.gateway_secret.clone()))
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(EvaluateDepositRoute::<SqliteDatabase>::new())
            .service(ShipOrderRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(OrderCommissionsRoute::<SqliteDatabase>::new())
            .service(RegisterSellerRoute::<SqliteDatabase>::new())
            .service(ComplianceSnapshotRoute::<SqliteDatabase>::new())
            .service(MyComplianceRoute::<SqliteDatabase>::new())
            .service(AuditTrailRoute::<SqliteDatabase>::new())
            .service(RefreshEligibilityRoute::<SqliteDatabase>::new())
            .service(SetRiskFlagRoute::<SqliteDatabase>::new())
            .service(SetSubscriptionRoute::<SqliteDatabase>::new())
            .service(ImposePenaltyRoute::<SqliteDatabase>::new())
            .service(AddPaymentAccountRoute::<SqliteDatabase>::new())
            .service(SetDefaultAccountRoute::<SqliteDatabase>::new())
            .service(VerifyAccountRoute::<SqliteDatabase>::new())
            .service(AccountHealthRoute::<SqliteDatabase>::new())
            .service(NewDepositRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(MyDepositsRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(ReleaseDepositRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(RefundDepositRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(RetryDepositRefundRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(OpenDisputeRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(ReviewDisputeRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(ResolveDisputeRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(RetryRefundRoute::<SqliteDatabase, PaymentOpsClient>::new())
            .service(NewCommissionRoute::<SqliteDatabase>::new())
            .service(SettleCommissionRoute::<SqliteDatabase>::new())
            .service(ResolveCommissionRoute::<SqliteDatabase>::new())
            .service(AdjustPayoutRoute::<SqliteDatabase>::new())
            .service(GetExchangeRateRoute::<SqliteDatabase>::new())
            .service(SetExchangeRateRoute::<SqliteDatabase>::new());
        // The scheduler authenticates with the cron bearer secret, not a gateway identity
        let cron_scope = web::scope("/cron")
            .service(CronDebtSweepRoute::<SqliteDatabase>::new())
            .service(CronCommissionSweepRoute::<SqliteDatabase>::new())
            .service(CronSubscriptionSweepRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(cron_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?;
    Ok(srv.run())
}
