use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mercado_tools::MercadoApi;
use qr_payment_engine::{
    traits::{ProviderApi, ReconciliationDatabase},
    SqliteDatabase,
    WebhookFlowApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, NewSaleRoute, SaleByIdRoute, SaleEventsRoute, WebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let provider = MercadoApi::new(config.mercado.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, provider)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B, P>(config: ServerConfig, db: B, provider: P) -> Result<Server, ServerError>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    // One flow api for the whole server, cloned into every worker: the sale subscriptions and
    // the live retry chains are process-wide registries, not per-worker state.
    let flow_api = WebhookFlowApi::new(db, provider);
    if !config.webhook_auth.strict() {
        warn!("💻️ Webhook signature verification is not strict. Unsigned deliveries will be processed.");
    }
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("qpg::access_log"))
            .app_data(web::Data::new(flow_api.clone()))
            .app_data(web::Data::new(config.webhook_auth.clone()))
            .service(health)
            .service(WebhookRoute::<B, P>::new())
            .service(NewSaleRoute::<B, P>::new())
            .service(SaleEventsRoute::<B, P>::new())
            .service(SaleByIdRoute::<B, P>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
