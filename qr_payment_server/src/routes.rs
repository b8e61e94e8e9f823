//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, provider queries, etc.) must be expressed as futures or asynchronous functions, so that worker
//! threads keep serving other requests while the operation is in flight.

use std::collections::HashMap;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use futures::{stream, StreamExt};
use log::*;
use qr_payment_engine::{
    db_types::{NewSale, SaleId},
    events::PaymentStatusEvent,
    traits::{ProviderApi, ReconciliationDatabase},
    webhook::{resource::resolve_resource_id, signature::verify_webhook_signature},
    WebhookFlowApi,
    WebhookOutcome,
    WebhookRequest,
};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

use crate::{
    config::WebhookAuthConfig,
    data_objects::{JsonResponse, NewSaleRequest, SaleCreatedResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
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

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(webhook => Post "/wh/payments" impl ReconciliationDatabase, ProviderApi);
/// Route handler for the provider webhook endpoint.
///
/// The provider retries any delivery that does not come back with a 2xx, so this handler
/// acknowledges everything it received and understood, whatever reconciliation concluded; the
/// body's `success` flag and message are informational only. The exceptions:
/// * a delivery that fails signature verification in strict mode is rejected with a 401, and
/// * a transient provider-query failure comes back as a 502, precisely so that the provider
///   redelivers later.
pub async fn webhook<B, P>(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    body: Bytes,
    api: web::Data<WebhookFlowApi<B, P>>,
    auth: web::Data<WebhookAuthConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    trace!("🔔️ Received webhook request: {}", req.uri());
    let event = flatten_request(&req, query.into_inner(), &body);
    if auth.strict() {
        check_signature(&event, auth.as_ref())?;
    }
    let ack = match api.process_webhook(&event).await? {
        WebhookOutcome::Updated { sale_id, payment_status, sale_status } => {
            info!("🔔️ Sale {sale_id} is now {sale_status}/{payment_status}");
            JsonResponse::success(format!("Sale {sale_id} updated to {sale_status}/{payment_status}"))
        },
        WebhookOutcome::NoChange { sale_id } => JsonResponse::success(format!("Sale {sale_id} is already up to date")),
        WebhookOutcome::Duplicate => JsonResponse::success("Duplicate delivery. Already processed."),
        WebhookOutcome::Unresolvable => JsonResponse::failure("No resource id or topic in the notification"),
        WebhookOutcome::SaleNotFound => JsonResponse::failure("No sale matches the notification"),
        WebhookOutcome::PaymentNotVisible => JsonResponse::success("Resource is not queryable yet"),
        WebhookOutcome::AwaitingPayment { retries_scheduled } => {
            let suffix = if retries_scheduled { "Re-polling has been scheduled." } else { "Awaiting the payment webhook." };
            JsonResponse::success(format!("Merchant order has no payment yet. {suffix}"))
        },
    };
    Ok(HttpResponse::Ok().json(ack))
}

/// Collapses the actix request into the engine's plain `{headers, query, body}` value struct.
/// Headers that are not valid UTF-8 cannot be part of a signature manifest and are dropped.
fn flatten_request(req: &HttpRequest, query: HashMap<String, String>, body: &[u8]) -> WebhookRequest {
    let mut event = WebhookRequest::new();
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            event = event.with_header(name.as_str(), value);
        }
    }
    for (key, value) in query {
        event = event.with_query(key, value);
    }
    if !body.is_empty() {
        match serde_json::from_slice::<Value>(body) {
            Ok(json) => event = event.with_body(json),
            Err(e) => debug!("🔔️ Webhook body is not JSON ({e}). Resolving from the query string only."),
        }
    }
    event
}

/// The strict-mode signature gate. A notification whose resource id cannot even be resolved is
/// waved through; it carries nothing to verify a manifest against, and the flow acknowledges and
/// drops it anyway.
fn check_signature(event: &WebhookRequest, auth: &WebhookAuthConfig) -> Result<(), ServerError> {
    let Some(resource_id) = resolve_resource_id(event) else {
        debug!("🔔️ No resource id to verify a signature against. Letting the flow acknowledge and drop it.");
        return Ok(());
    };
    verify_webhook_signature(event, &resource_id, auth.secret.reveal()).map_err(|reason| {
        warn!(
            "🔔️ Rejecting webhook delivery {} for resource {resource_id}: {reason}",
            event.request_id().unwrap_or("-")
        );
        ServerError::InvalidWebhookSignature(reason.to_string())
    })
}

//----------------------------------------------   Sales  ----------------------------------------------------
route!(new_sale => Post "/sales" impl ReconciliationDatabase, ProviderApi);
/// Route handler for creating a sale.
///
/// The point of sale calls this before presenting the QR code. The response carries the external
/// reference to attach to the provider charge; without it, webhook notifications can only
/// correlate through stored linkages.
pub async fn new_sale<B, P>(
    body: web::Json<NewSaleRequest>,
    api: web::Data<WebhookFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    let request = body.into_inner();
    let id = request.id.unwrap_or_else(random_sale_id);
    debug!("💻️ POST new sale {id} for {}", request.total);
    let sale = api.db().insert_sale(NewSale::new(id, request.total)).await?;
    info!("💻️ Sale {} created for {}", sale.id, sale.total);
    let response =
        SaleCreatedResponse { external_reference: sale.external_reference(), id: sale.id, total: sale.total };
    Ok(HttpResponse::Ok().json(response))
}

route!(sale_by_id => Get "/sales/{id}" impl ReconciliationDatabase, ProviderApi);
pub async fn sale_by_id<B, P>(
    path: web::Path<SaleId>,
    api: web::Data<WebhookFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    let id = path.into_inner();
    debug!("💻️ GET sale {id}");
    let sale = api.db().fetch_sale(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Sale {id}")))?;
    Ok(HttpResponse::Ok().json(sale))
}

route!(sale_events => Get "/sales/{id}/events" impl ReconciliationDatabase, ProviderApi);
/// Route handler for a sale's payment status event stream.
///
/// Streams [`PaymentStatusEvent`]s for one sale as server-sent events: first the sale's current
/// state, then every status change the reconciliation flow applies, until the client disconnects.
/// This is how a point-of-sale display finds out that the buyer's QR payment went through without
/// polling.
pub async fn sale_events<B, P>(
    path: web::Path<SaleId>,
    api: web::Data<WebhookFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase + 'static,
    P: ProviderApi + 'static,
{
    let id = path.into_inner();
    debug!("💻️ GET event stream for sale {id}");
    let sale = api.db().fetch_sale(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Sale {id}")))?;
    // Subscribe before snapshotting so no transition can fall between the two.
    let rx = api.subscriptions().subscribe(&id).await;
    let snapshot = stream::iter(vec![sse_frame(&PaymentStatusEvent::from_sale(&sale))]);
    let live = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (sse_frame(&event), rx)) });
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("cache-control", "no-cache"))
        .streaming(snapshot.chain(live)))
}

fn sse_frame(event: &PaymentStatusEvent) -> Result<Bytes, actix_web::Error> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Ok(Bytes::from(format!("data: {data}\n\n")))
}

fn random_sale_id() -> SaleId {
    let id: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    SaleId::new(id.to_lowercase())
}
