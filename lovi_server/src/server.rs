use std::{net::IpAddr, time::Duration};

use actix_web::{
    dev::{Server, Service, ServiceFactory, ServiceRequest, ServiceResponse},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    Error,
    HttpServer,
    Scope,
};
use futures::future::{ok, Either};
use log::*;
use lovi_engine::{events::EventProducers, traits::OrderManagement, InventoryApi, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    helpers::get_service_remote_ip,
    notifications::{create_notification_handlers, NotificationForwarder},
    routes::{
        health,
        AdjustStockRoute,
        AllocationPreviewRoute,
        CreateOrderRoute,
        CreateVariantRoute,
        OrderByNumberRoute,
        OrderPaymentFormRoute,
        ReceiveStockRoute,
        RedsysWebhookRoute,
        RemoveStockEntryRoute,
        StockMovementsRoute,
        UpdateOrderStatusRoute,
        VariantStockRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;

/// Connects to and migrates the database, starts the notification hooks and the expiry worker, and then runs the
/// server until it is shut down.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let forwarder = match &config.notification_url {
        Some(url) => Some(NotificationForwarder::new(url.as_str())?),
        None => None,
    };
    let handlers = create_notification_handlers(forwarder);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _worker =
        start_expiry_worker(db.clone(), producers.clone(), config.policy.clone(), config.pending_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone(), config.policy.clone());
        let inventory_api = InventoryApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lv::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(config.redsys.clone()))
            .configure(configure_extractors);
        let webhooks = webhook_scope::<SqliteDatabase>(
            config.redsys_whitelist.clone(),
            config.use_x_forwarded_for,
            config.use_forwarded,
        );
        app.service(health).service(api_scope::<SqliteDatabase>()).service(webhooks)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The store API. Handlers expect an [`OrderFlowApi`] and an [`InventoryApi`] over `B` in the application data.
pub fn api_scope<B: OrderManagement + 'static>() -> Scope {
    web::scope("/api")
        .service(CreateOrderRoute::<B>::new())
        .service(OrderByNumberRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(OrderPaymentFormRoute::<B>::new())
        .service(CreateVariantRoute::<B>::new())
        .service(VariantStockRoute::<B>::new())
        .service(AllocationPreviewRoute::<B>::new())
        .service(ReceiveStockRoute::<B>::new())
        .service(AdjustStockRoute::<B>::new())
        .service(RemoveStockEntryRoute::<B>::new())
        .service(StockMovementsRoute::<B>::new())
}

/// Gateway callbacks. If a whitelist is given, only those peers may call in.
pub fn webhook_scope<B: OrderManagement + 'static>(
    whitelist: Option<Vec<IpAddr>>,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
) -> Scope<impl ServiceFactory<ServiceRequest, Config = (), Response = ServiceResponse, Error = Error, InitError = ()>>
{
    web::scope("/webhooks")
        .wrap_fn(move |req, srv| {
            // Collect peer IP from x-forwarded-for, or forwarded headers _if_ `use_nnn` has been set to true
            // in the configuration. Otherwise, use the peer address from the connection info.
            let peer_ip = get_service_remote_ip(&req, use_x_forwarded_for, use_forwarded);
            let whitelisted = match (peer_ip, &whitelist) {
                (_, None) => true,
                (Some(ip), Some(whitelist)) => {
                    debug!("💻️ Gateway callback from {ip}");
                    whitelist.contains(&ip)
                },
                (None, Some(_)) => {
                    warn!("💻️ No IP address found in gateway callback request, denying access.");
                    false
                },
            };
            if whitelisted {
                Either::Left(srv.call(req))
            } else {
                let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown peer".to_string());
                warn!("💻️ Gateway callback from {peer} is not whitelisted. Denying access.");
                Either::Right(ok(req.error_response(ServerError::ForbiddenPeer(peer))))
            }
        })
        .service(RedsysWebhookRoute::<B>::new())
}

/// Renders request extraction failures in the same `{"error": ...}` shape as every other error.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    );
}
