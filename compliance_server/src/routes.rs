//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every route under `/api` sits behind the identity middleware, so handlers can take
//! [`AuthClaims`] as an extractor and trust its contents. Role enforcement happens in the
//! [`AclMiddlewareFactory`](crate::middleware::AclMiddlewareFactory) wrapper that the `route!`
//! macro attaches; ownership checks (a seller acting on their own lot, say) happen in the
//! handler itself via [`AuthClaims::require_seller`].

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use compliance_engine::{
    db_types::{NewCommission, NewDepositLot, NewDispute, NewOrder, NewPaymentAccount, OrderId, Role, SellerId},
    traits::{
        AuditLog,
        CommissionManagement,
        ComplianceLedger,
        DebtManagement,
        DisputeManagement,
        ExchangeRate,
        ExchangeRates,
        SellerAccounts,
    },
    CommissionApi,
    DebtApi,
    DepositApi,
    DisputeApi,
    EligibilityApi,
    ExchangeRateApi,
    OrderFlowApi,
    ProviderClient,
    SellerApi,
};
use log::*;
use serde_json::json;

use crate::{
    auth::{AuthClaims, CronAccess},
    data_objects::{
        AccountHealthNotification,
        AuditQuery,
        EvaluateDepositRequest,
        ExchangeRateUpdate,
        JsonResponse,
        NewSellerRequest,
        OpenDisputeRequest,
        PayoutRequest,
        PenaltyRequest,
        ResolveDisputeRequest,
        RiskFlagRequest,
        SubscriptionRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ with $client:ident requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A, C>(core::marker::PhantomData<fn() -> (A, C)>);}
        paste::paste! { impl<A, C> [<$name:camel Route>]<A, C> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (A, C)>)
            }
        }}
        paste::paste! { impl<A, C> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A, C>
        where
            A: $($bounds +)+ 'static,
            C: $client + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A, C>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    // Cron routes live outside the identity scope, so no ACL wrapper is attached. The handler
    // is responsible for checking the cron bearer secret itself.
    ($name:ident => $method:ident $path:literal for cron impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(new_order => Post "/orders" impl ComplianceLedger, CommissionManagement, AuditLog requires [Role::User]);
/// Route handler for the POST orders endpoint
///
/// A paid order enters the ledger here. The deposit gate runs before the order is accepted: if
/// the seller's collateral does not cover the new exposure, the order is NOT recorded and the
/// response is a `409 Conflict` carrying the [`DepositCheck`](compliance_engine::traits::DepositCheck)
/// that explains the shortfall and the required top-up.
pub async fn new_order<B>(
    order: web::Json<NewOrder>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + CommissionManagement + AuditLog,
{
    let order = order.into_inner();
    debug!("💻️ POST order [{}] for seller {}", order.order_id, order.seller_id);
    let (check, inserted) = api.process_new_order(order).await?;
    match inserted {
        Some(order) => Ok(HttpResponse::Ok().json(json!({ "check": check, "order": order }))),
        None => Ok(HttpResponse::Conflict().json(check)),
    }
}

route!(evaluate_deposit => Post "/orders/evaluate" impl ComplianceLedger, CommissionManagement, AuditLog requires [Role::User]);
/// A dry-run of the deposit gate. Nothing is recorded; storefronts use this to warn sellers
/// before a listing goes live.
pub async fn evaluate_deposit<B>(
    body: web::Json<EvaluateDepositRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + CommissionManagement + AuditLog,
{
    let req = body.into_inner();
    debug!("💻️ POST evaluate deposit for seller {} ({} {})", req.seller_id, req.amount, req.currency);
    let check = api.evaluate_deposit_requirement(req.seller_id, req.amount, &req.currency).await?;
    Ok(HttpResponse::Ok().json(check))
}

route!(ship_order => Post "/orders/{order_id}/ship" impl ComplianceLedger, CommissionManagement, AuditLog requires [Role::User]);
pub async fn ship_order<B>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + CommissionManagement + AuditLog,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST ship order [{order_id}]");
    let order = api.mark_order_shipped(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_order => Post "/orders/{order_id}/complete" impl ComplianceLedger, CommissionManagement, AuditLog requires [Role::User]);
pub async fn complete_order<B>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + CommissionManagement + AuditLog,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST complete order [{order_id}]");
    let order = api.complete_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl ComplianceLedger, CommissionManagement, AuditLog requires [Role::User]);
pub async fn cancel_order<B>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + CommissionManagement + AuditLog,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ POST cancel order [{order_id}]");
    let order = api.cancel_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_commissions => Get "/orders/{order_id}/commissions" impl CommissionManagement, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn order_commissions<B>(
    path: web::Path<String>,
    api: web::Data<CommissionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommissionManagement + DebtManagement + AuditLog,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET commissions for order [{order_id}]");
    let commissions = api.commissions_for_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(commissions))
}

//----------------------------------------------   Sellers  ----------------------------------------------------

route!(register_seller => Post "/sellers" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn register_seller<B>(
    body: web::Json<NewSellerRequest>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let handle = body.into_inner().handle;
    debug!("💻️ POST register seller {handle}");
    let seller = api.register_seller(&handle).await?;
    Ok(HttpResponse::Ok().json(seller))
}

route!(compliance_snapshot => Get "/sellers/{seller_id}/compliance" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
/// The full compliance standing for a seller: deposit balance and tier, unfulfilled exposure,
/// payout eligibility with its reason, outstanding debt and open dispute count.
pub async fn compliance_snapshot<B>(
    path: web::Path<i64>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    debug!("💻️ GET compliance snapshot for seller {seller_id}");
    let snapshot = api.compliance_snapshot(seller_id).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

route!(my_compliance => Get "/compliance" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::User]);
/// Sellers fetch their own standing here. The seller is taken from the gateway identity, never
/// from the request.
pub async fn my_compliance<B>(
    claims: AuthClaims,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let seller_id = claims.require_seller()?;
    debug!("💻️ GET my compliance snapshot for seller {seller_id}");
    let snapshot = api.compliance_snapshot(seller_id).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

route!(audit_trail => Get "/sellers/{seller_id}/audit" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn audit_trail<B>(
    path: web::Path<i64>,
    query: web::Query<AuditQuery>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    let limit = query.limit.unwrap_or(50);
    debug!("💻️ GET audit trail for seller {seller_id} (limit {limit})");
    let entries = api.audit_trail(seller_id, limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(refresh_eligibility => Post "/sellers/{seller_id}/eligibility" impl ComplianceLedger, AuditLog requires [Role::Admin]);
/// Force a payout eligibility recalculation for a seller. The engine recalculates on every
/// relevant fact change already; this endpoint exists for support staff working a ticket.
pub async fn refresh_eligibility<B>(
    path: web::Path<i64>,
    api: web::Data<EligibilityApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    debug!("💻️ POST refresh eligibility for seller {seller_id}");
    let update = api.refresh(seller_id).await?;
    Ok(HttpResponse::Ok().json(update))
}

route!(set_risk_flag => Post "/sellers/{seller_id}/risk-flag" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn set_risk_flag<B>(
    path: web::Path<i64>,
    body: web::Json<RiskFlagRequest>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    let flagged = body.into_inner().flagged;
    info!("💻️ POST risk flag {flagged} for seller {seller_id}");
    let seller = api.set_risk_flag(seller_id, flagged).await?;
    Ok(HttpResponse::Ok().json(seller))
}

route!(set_subscription => Post "/sellers/{seller_id}/subscription" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn set_subscription<B>(
    path: web::Path<i64>,
    body: web::Json<SubscriptionRequest>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    let req = body.into_inner();
    debug!("💻️ POST subscription {} until {} for seller {seller_id}", req.tier, req.expires_at);
    let seller = api.set_subscription(seller_id, req.tier, req.expires_at).await?;
    Ok(HttpResponse::Ok().json(seller))
}

route!(impose_penalty => Post "/sellers/{seller_id}/penalty" impl DebtManagement, AuditLog requires [Role::Admin]);
/// Book a violation penalty against a seller. The penalty becomes an ordinary debt and is
/// collected through the usual deposit and payout channels.
pub async fn impose_penalty<B>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<PenaltyRequest>,
    api: web::Data<DebtApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: DebtManagement + AuditLog,
{
    let seller_id = SellerId(path.into_inner());
    let amount = body.into_inner().amount;
    info!("💻️ POST violation penalty of {amount} on seller {seller_id} by {}", claims.sub);
    let debt = api.violation_penalty(seller_id, amount, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(debt))
}

//------------------------------------------   Payment accounts  -----------------------------------------------

route!(add_payment_account => Post "/payment-accounts" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::User]);
/// Sellers may only add accounts to their own profile; admins may add accounts for anyone.
pub async fn add_payment_account<B>(
    claims: AuthClaims,
    body: web::Json<NewPaymentAccount>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let account = body.into_inner();
    if !claims.has_role(Role::Admin) && claims.require_seller()? != account.seller_id {
        debug!("💻️ {} tried to add a payment account for seller {}", claims.sub, account.seller_id);
        return Err(ServerError::InsufficientPermissions(
            "Payment accounts can only be added to your own seller profile.".to_string(),
        ));
    }
    debug!("💻️ POST payment account for seller {} at {}", account.seller_id, account.provider);
    let account = api.add_payment_account(account).await?;
    Ok(HttpResponse::Ok().json(account))
}

route!(set_default_account => Post "/payment-accounts/{account_id}/default" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::User]);
pub async fn set_default_account<B>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let account_id = path.into_inner();
    let seller_id = claims.require_seller()?;
    debug!("💻️ POST default payment account #{account_id} for seller {seller_id}");
    let account = api.set_default_payment_account(account_id, seller_id).await?;
    Ok(HttpResponse::Ok().json(account))
}

route!(verify_account => Post "/payment-accounts/{account_id}/verify" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn verify_account<B>(
    path: web::Path<i64>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let account_id = path.into_inner();
    info!("💻️ POST verify payment account #{account_id}");
    let account = api.verify_payment_account(account_id).await?;
    Ok(HttpResponse::Ok().json(account))
}

route!(account_health => Post "/callbacks/account-health" impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog requires [Role::Admin]);
/// Provider webhook, relayed by the gateway. A disabled receiving account suspends the seller's
/// payout eligibility until the provider reports it healthy again.
pub async fn account_health<B>(
    body: web::Json<AccountHealthNotification>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    let event = body.into_inner();
    info!("💻️ POST account health: account #{} enabled={}", event.account_id, event.enabled);
    let account = api.set_provider_account_health(event.account_id, event.enabled).await?;
    Ok(HttpResponse::Ok().json(account))
}

//----------------------------------------------   Deposits  ----------------------------------------------------

route!(new_deposit => Post "/deposits" impl ComplianceLedger, SellerAccounts, AuditLog with ProviderClient requires [Role::Admin]);
/// Record a funded deposit lot. Idempotent on the provider funding reference, so the payment
/// webhook may be replayed safely.
pub async fn new_deposit<B, P>(
    body: web::Json<NewDepositLot>,
    api: web::Data<DepositApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    let lot = body.into_inner();
    debug!("💻️ POST deposit lot of {} for seller {}", lot.amount, lot.seller_id);
    let lot = api.create_deposit_lot(lot).await?;
    Ok(HttpResponse::Ok().json(lot))
}

route!(my_deposits => Get "/deposits" impl ComplianceLedger, SellerAccounts, AuditLog with ProviderClient requires [Role::User]);
pub async fn my_deposits<B, P>(
    claims: AuthClaims,
    api: web::Data<DepositApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    let seller_id = claims.require_seller()?;
    debug!("💻️ GET deposit lots for seller {seller_id}");
    let lots = api.lots_for_seller(seller_id).await?;
    Ok(HttpResponse::Ok().json(lots))
}

route!(release_deposit => Post "/deposits/{lot_id}/release" impl ComplianceLedger, SellerAccounts, AuditLog with ProviderClient requires [Role::Admin]);
pub async fn release_deposit<B, P>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<DepositApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    let lot_id = path.into_inner();
    info!("💻️ POST release deposit lot #{lot_id} by {}", claims.sub);
    let lot = api.release_deposit_lot(lot_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(lot))
}

route!(refund_deposit => Post "/deposits/{lot_id}/refund" impl ComplianceLedger, SellerAccounts, AuditLog with ProviderClient requires [Role::User]);
/// A seller asks for a released lot back. The engine checks the holding period and that the lot
/// is not still securing exposure or debt, then pushes the refund through the provider.
pub async fn refund_deposit<B, P>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<DepositApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    let lot_id = path.into_inner();
    let seller_id = claims.require_seller()?;
    debug!("💻️ POST refund deposit lot #{lot_id} for seller {seller_id}");
    let lot = api.request_deposit_refund(lot_id, seller_id).await?;
    Ok(HttpResponse::Ok().json(lot))
}

route!(retry_deposit_refund => Post "/deposits/{lot_id}/refund/retry" impl ComplianceLedger, SellerAccounts, AuditLog with ProviderClient requires [Role::Admin]);
pub async fn retry_deposit_refund<B, P>(
    path: web::Path<i64>,
    api: web::Data<DepositApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ComplianceLedger + SellerAccounts + AuditLog,
    P: ProviderClient,
{
    let lot_id = path.into_inner();
    info!("💻️ POST retry refund for deposit lot #{lot_id}");
    let lot = api.retry_deposit_refund(lot_id).await?;
    Ok(HttpResponse::Ok().json(lot))
}

//------------------------------------------   Disputes & refunds  ---------------------------------------------

route!(open_dispute => Post "/disputes" impl DisputeManagement, DebtManagement, SellerAccounts, ExchangeRates, AuditLog with ProviderClient requires [Role::User]);
pub async fn open_dispute<B, P>(
    claims: AuthClaims,
    body: web::Json<OpenDisputeRequest>,
    api: web::Data<DisputeApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: DisputeManagement + DebtManagement + SellerAccounts + ExchangeRates + AuditLog,
    P: ProviderClient,
{
    let req = body.into_inner();
    debug!("💻️ POST dispute on order [{}] by {}", req.order_id, claims.sub);
    let dispute = NewDispute { order_id: req.order_id, opened_by: claims.sub, reason: req.reason };
    let dispute = api.open_dispute(dispute).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

route!(review_dispute => Post "/disputes/{dispute_id}/review" impl DisputeManagement, DebtManagement, SellerAccounts, ExchangeRates, AuditLog with ProviderClient requires [Role::Admin]);
pub async fn review_dispute<B, P>(
    path: web::Path<i64>,
    api: web::Data<DisputeApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: DisputeManagement + DebtManagement + SellerAccounts + ExchangeRates + AuditLog,
    P: ProviderClient,
{
    let dispute_id = path.into_inner();
    debug!("💻️ POST review dispute #{dispute_id}");
    let dispute = api.begin_review(dispute_id).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

route!(resolve_dispute => Post "/disputes/{dispute_id}/resolve" impl DisputeManagement, DebtManagement, SellerAccounts, ExchangeRates, AuditLog with ProviderClient requires [Role::Admin]);
/// Close a dispute, optionally awarding the buyer a refund. When a refund is awarded, the
/// response carries the refund obligation alongside the resolved dispute; the refund itself is
/// executed immediately and any seller-side shortfall has already been booked as debt.
pub async fn resolve_dispute<B, P>(
    claims: AuthClaims,
    path: web::Path<i64>,
    body: web::Json<ResolveDisputeRequest>,
    api: web::Data<DisputeApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: DisputeManagement + DebtManagement + SellerAccounts + ExchangeRates + AuditLog,
    P: ProviderClient,
{
    let dispute_id = path.into_inner();
    let req = body.into_inner();
    info!("💻️ POST resolve dispute #{dispute_id} by {} (refund: {:?})", claims.sub, req.refund_amount);
    let (dispute, refund) = api.resolve_dispute(dispute_id, &claims.sub, req.refund_amount, req.note.as_deref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "dispute": dispute, "refund": refund })))
}

route!(retry_refund => Post "/refunds/{refund_id}/retry" impl DisputeManagement, DebtManagement, SellerAccounts, ExchangeRates, AuditLog with ProviderClient requires [Role::Admin]);
pub async fn retry_refund<B, P>(
    path: web::Path<i64>,
    api: web::Data<DisputeApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: DisputeManagement + DebtManagement + SellerAccounts + ExchangeRates + AuditLog,
    P: ProviderClient,
{
    let refund_id = path.into_inner();
    info!("💻️ POST retry refund #{refund_id}");
    let refund = api.execute_refund(refund_id).await?;
    Ok(HttpResponse::Ok().json(refund))
}

//----------------------------------------------   Commissions  -------------------------------------------------

route!(new_commission => Post "/commissions" impl CommissionManagement, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn new_commission<B>(
    body: web::Json<NewCommission>,
    api: web::Data<CommissionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommissionManagement + DebtManagement + AuditLog,
{
    let commission = body.into_inner();
    debug!("💻️ POST commission on order [{}] for affiliate {}", commission.order_id, commission.affiliate_id);
    let commission = api.create_commission(commission).await?;
    Ok(HttpResponse::Ok().json(commission))
}

route!(settle_commission => Post "/commissions/{commission_id}/settle" impl CommissionManagement, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn settle_commission<B>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<CommissionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommissionManagement + DebtManagement + AuditLog,
{
    let commission_id = path.into_inner();
    info!("💻️ POST settle commission #{commission_id} by {}", claims.sub);
    let commission = api.settle_commission(commission_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(commission))
}

route!(resolve_commission => Post "/commissions/{commission_id}/resolve" impl CommissionManagement, DebtManagement, AuditLog requires [Role::Admin]);
pub async fn resolve_commission<B>(
    claims: AuthClaims,
    path: web::Path<i64>,
    api: web::Data<CommissionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommissionManagement + DebtManagement + AuditLog,
{
    let commission_id = path.into_inner();
    info!("💻️ POST resolve overdue commission #{commission_id} by {}", claims.sub);
    let commission = api.resolve_overdue_commission(commission_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(commission))
}

//----------------------------------------------   Payouts  -----------------------------------------------------

route!(adjust_payout => Post "/payouts" impl DebtManagement, AuditLog requires [Role::Admin]);
/// The payout pipeline calls this before releasing funds to a seller. Outstanding debt is
/// deducted from the payout (never more than the payout itself) and the adjusted amount comes
/// back in the response.
pub async fn adjust_payout<B>(
    body: web::Json<PayoutRequest>,
    api: web::Data<DebtApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: DebtManagement + AuditLog,
{
    let req = body.into_inner();
    debug!("💻️ POST payout adjustment for seller {} ({} {})", req.seller_id, req.amount, req.currency);
    let adjustment = api.adjust_payout(req.seller_id, req.amount, &req.currency).await?;
    Ok(HttpResponse::Ok().json(adjustment))
}

//--------------------------------------------   Exchange rates  ------------------------------------------------

route!(get_exchange_rate => Get "/exchange-rates/{currency}" impl ExchangeRates requires [Role::User]);
pub async fn get_exchange_rate<B>(
    path: web::Path<String>,
    api: web::Data<ExchangeRateApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ExchangeRates,
{
    let currency = path.into_inner();
    debug!("💻️ GET exchange rate for {currency}");
    let rate = api.fetch_exchange_rate(&currency).await?;
    Ok(HttpResponse::Ok().json(rate))
}

route!(set_exchange_rate => Post "/exchange-rates" impl ExchangeRates requires [Role::Admin]);
pub async fn set_exchange_rate<B>(
    body: web::Json<ExchangeRateUpdate>,
    api: web::Data<ExchangeRateApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ExchangeRates,
{
    let req = body.into_inner();
    info!("💻️ POST exchange rate {} = {} ppm", req.currency, req.rate_ppm);
    let rate = ExchangeRate::new(&req.currency, req.rate_ppm, None);
    api.set_exchange_rate(&rate).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Exchange rate for {} updated", req.currency))))
}

//----------------------------------------------   Cron  --------------------------------------------------------

route!(cron_debt_sweep => Post "/debt-sweep" for cron impl DebtManagement, AuditLog);
/// Scheduled debt collection. Walks every seller with pending debt and collects what their
/// released deposit lots can cover, oldest lot first.
pub async fn cron_debt_sweep<B>(
    req: HttpRequest,
    cron: web::Data<CronAccess>,
    api: web::Data<DebtApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: DebtManagement + AuditLog,
{
    cron.check(&req)?;
    info!("💻️ Cron debt sweep triggered");
    let report = api.run_collection_sweep().await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(cron_commission_sweep => Post "/commission-sweep" for cron impl CommissionManagement, DebtManagement, AuditLog);
pub async fn cron_commission_sweep<B>(
    req: HttpRequest,
    cron: web::Data<CronAccess>,
    api: web::Data<CommissionApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CommissionManagement + DebtManagement + AuditLog,
{
    cron.check(&req)?;
    info!("💻️ Cron commission sweep triggered");
    let report = api.run_overdue_sweep(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(cron_subscription_sweep => Post "/subscription-sweep" for cron impl SellerAccounts, ComplianceLedger, DebtManagement, AuditLog);
pub async fn cron_subscription_sweep<B>(
    req: HttpRequest,
    cron: web::Data<CronAccess>,
    api: web::Data<SellerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SellerAccounts + ComplianceLedger + DebtManagement + AuditLog,
{
    cron.check(&req)?;
    info!("💻️ Cron subscription sweep triggered");
    let report = api.run_subscription_sweep(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}
