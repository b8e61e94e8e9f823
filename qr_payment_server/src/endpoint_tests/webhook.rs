use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use mercado_tools::PaymentDetail;
use qpg_common::Cents;
use qr_payment_engine::{
    db_types::{PaymentStatus, Sale, SaleId, SaleStatus},
    webhook::signature::{sign_manifest, signature_manifest},
    RetryConfig,
    WebhookFlowApi,
};

use super::mocks::{MockProvider, MockReconciliationDb};
use crate::{
    config::WebhookAuthConfig,
    routes::WebhookRoute,
};

const SECRET: &str = "secret";

fn strict_auth() -> WebhookAuthConfig {
    WebhookAuthConfig { signature_checks: true, secret: Default::default() }.with_secret(SECRET)
}

fn lax_auth() -> WebhookAuthConfig {
    WebhookAuthConfig::default()
}

fn pending_sale(id: &str) -> Sale {
    Sale {
        id: SaleId::new(id),
        total: Cents::from(1500),
        sale_status: SaleStatus::Pending,
        payment_status: PaymentStatus::Pending,
        provider_payment_id: None,
        provider_order_id: None,
        provider_status: None,
        provider_status_detail: None,
        provider_payload: None,
        paid_at: None,
        status_updated_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn approved_payment(id: i64, reference: &str) -> PaymentDetail {
    PaymentDetail {
        id,
        status: "approved".to_string(),
        status_detail: Some("accredited".to_string()),
        date_approved: Some(Utc::now()),
        external_reference: Some(reference.to_string()),
        ..Default::default()
    }
}

/// A valid `x-signature` header for the given resource id, request id and timestamp.
fn signature_header(resource_id: &str, request_id: &str, ts: &str) -> String {
    let digest = sign_manifest(&signature_manifest(resource_id, request_id, ts), SECRET);
    format!("ts={ts},v1={digest}")
}

async fn post_webhook(
    db: MockReconciliationDb,
    provider: MockProvider,
    auth: WebhookAuthConfig,
    req: TestRequest,
) -> (StatusCode, String) {
    let flow = WebhookFlowApi::new(db, provider).with_retry_config(RetryConfig::none());
    let app = App::new()
        .app_data(web::Data::new(flow))
        .app_data(web::Data::new(auth))
        .service(WebhookRoute::<MockReconciliationDb, MockProvider>::new());
    let app = test::init_service(app).await;
    let (_, res) = test::call_service(&app, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn unsigned_deliveries_are_rejected_in_strict_mode() {
    let req = TestRequest::post()
        .uri("/wh/payments?topic=payment&data.id=100")
        .insert_header(("x-request-id", "req-1"));
    let (status, body) = post_webhook(MockReconciliationDb::new(), MockProvider::new(), strict_auth(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("missing_headers"), "{body}");
}

#[actix_web::test]
async fn a_tampered_digest_is_rejected() {
    let mut header = signature_header("100", "req-1", "1700000000");
    // flip the last hex character of the digest
    let flipped = if header.ends_with('0') { "1" } else { "0" };
    header.replace_range(header.len() - 1.., flipped);
    let req = TestRequest::post()
        .uri("/wh/payments?topic=payment&data.id=100")
        .insert_header(("x-request-id", "req-1"))
        .insert_header(("x-signature", header));
    let (status, body) = post_webhook(MockReconciliationDb::new(), MockProvider::new(), strict_auth(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("digest_mismatch"), "{body}");
}

#[actix_web::test]
async fn a_correctly_signed_delivery_is_processed() {
    let mut db = MockReconciliationDb::new();
    db.expect_record_webhook_event_if_new().returning(|_, _, _| Ok(true));
    db.expect_fetch_sale().returning(|id| Ok(Some(pending_sale(id.as_str()))));
    db.expect_update_sale_payment().returning(|id, update| {
        let mut sale = pending_sale(id.as_str());
        sale.sale_status = update.sale_status.unwrap_or(sale.sale_status);
        sale.payment_status = update.payment_status.unwrap_or(sale.payment_status);
        Ok(sale)
    });
    let mut provider = MockProvider::new();
    provider.expect_payment().returning(|id| Ok(approved_payment(id.parse().unwrap(), "sale-sale-1")));

    let req = TestRequest::post()
        .uri("/wh/payments?topic=payment&data.id=100")
        .insert_header(("x-request-id", "req-1"))
        .insert_header(("x-signature", signature_header("100", "req-1", "1700000000")))
        .set_json(serde_json::json!({"type": "payment", "data": {"id": "100"}}));
    let (status, body) = post_webhook(db, provider, strict_auth(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":true"#), "{body}");
    assert!(body.contains("sale-1"), "{body}");
    assert!(body.contains("Approved"), "{body}");
}

#[actix_web::test]
async fn duplicate_deliveries_are_acknowledged_without_processing() {
    let mut db = MockReconciliationDb::new();
    db.expect_record_webhook_event_if_new().returning(|_, _, _| Ok(false));
    // no provider expectations: a duplicate must never reach the query API
    let req = TestRequest::post().uri("/wh/payments?topic=payment&data.id=100");
    let (status, body) = post_webhook(db, MockProvider::new(), lax_auth(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Duplicate"), "{body}");
}

#[actix_web::test]
async fn provider_outages_surface_as_bad_gateway() {
    let mut db = MockReconciliationDb::new();
    db.expect_record_webhook_event_if_new().returning(|_, _, _| Ok(true));
    let mut provider = MockProvider::new();
    provider
        .expect_payment()
        .returning(|id| Err(qr_payment_engine::traits::ProviderApiError::Timeout(id.to_string())));

    let req = TestRequest::post().uri("/wh/payments?topic=payment&data.id=100");
    let (status, body) = post_webhook(db, provider, lax_auth(), req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("provider"), "{body}");
}

#[actix_web::test]
async fn payments_the_provider_cannot_see_yet_are_benign() {
    let mut db = MockReconciliationDb::new();
    db.expect_record_webhook_event_if_new().returning(|_, _, _| Ok(true));
    let mut provider = MockProvider::new();
    provider
        .expect_payment()
        .returning(|id| Err(qr_payment_engine::traits::ProviderApiError::NotFound(id.to_string())));

    let req = TestRequest::post().uri("/wh/payments?topic=payment&data.id=100");
    let (status, body) = post_webhook(db, provider, lax_auth(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("not queryable yet"), "{body}");
}

#[actix_web::test]
async fn unresolvable_notifications_are_acknowledged_and_dropped() {
    // no topic, no id, not even in strict mode: nothing to verify, nothing to process
    let req = TestRequest::post().uri("/wh/payments").set_json(serde_json::json!({"action": "ping"}));
    let (status, body) = post_webhook(MockReconciliationDb::new(), MockProvider::new(), strict_auth(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "{body}");
}
