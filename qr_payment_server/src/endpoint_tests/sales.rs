use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use qpg_common::Cents;
use qr_payment_engine::{
    db_types::{PaymentStatus, Sale, SaleId, SaleStatus},
    traits::SaleApiError,
    RetryConfig,
    WebhookFlowApi,
};

use super::mocks::{MockProvider, MockReconciliationDb};
use crate::routes::{NewSaleRoute, SaleByIdRoute};

fn pending_sale(id: &str, total: Cents) -> Sale {
    Sale {
        id: SaleId::new(id),
        total,
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

async fn call(db: MockReconciliationDb, req: TestRequest) -> (StatusCode, String) {
    let flow = WebhookFlowApi::new(db, MockProvider::new()).with_retry_config(RetryConfig::none());
    let app = App::new()
        .app_data(web::Data::new(flow))
        .service(NewSaleRoute::<MockReconciliationDb, MockProvider>::new())
        .service(SaleByIdRoute::<MockReconciliationDb, MockProvider>::new());
    let app = test::init_service(app).await;
    let (_, res) = test::call_service(&app, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn creating_a_sale_returns_its_external_reference() {
    let mut db = MockReconciliationDb::new();
    db.expect_insert_sale().returning(|new_sale| Ok(pending_sale(new_sale.id.as_str(), new_sale.total)));

    let req = TestRequest::post().uri("/sales").set_json(serde_json::json!({"id": "till-4-1015", "total": 1500}));
    let (status, body) = call(db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""external_reference":"sale-till-4-1015""#), "{body}");
}

#[actix_web::test]
async fn sales_without_an_id_get_one_minted() {
    let mut db = MockReconciliationDb::new();
    db.expect_insert_sale().returning(|new_sale| {
        assert_eq!(new_sale.id.as_str().len(), 12);
        Ok(pending_sale(new_sale.id.as_str(), new_sale.total))
    });

    let req = TestRequest::post().uri("/sales").set_json(serde_json::json!({"total": 990}));
    let (status, body) = call(db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""total":990"#), "{body}");
}

#[actix_web::test]
async fn reusing_a_sale_id_is_a_conflict() {
    let mut db = MockReconciliationDb::new();
    db.expect_insert_sale().returning(|new_sale| Err(SaleApiError::SaleAlreadyExists(new_sale.id)));

    let req = TestRequest::post().uri("/sales").set_json(serde_json::json!({"id": "till-4-1015", "total": 1500}));
    let (status, body) = call(db, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("till-4-1015"), "{body}");
}

#[actix_web::test]
async fn fetching_a_sale_returns_its_current_state() {
    let mut db = MockReconciliationDb::new();
    db.expect_fetch_sale().returning(|id| {
        let mut sale = pending_sale(id.as_str(), Cents::from(1500));
        sale.sale_status = SaleStatus::Approved;
        sale.payment_status = PaymentStatus::Approved;
        Ok(Some(sale))
    });

    let req = TestRequest::get().uri("/sales/till-4-1015");
    let (status, body) = call(db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""sale_status":"Approved""#), "{body}");
}

#[actix_web::test]
async fn fetching_an_unknown_sale_is_a_404() {
    let mut db = MockReconciliationDb::new();
    db.expect_fetch_sale().returning(|_| Ok(None));

    let req = TestRequest::get().uri("/sales/nope");
    let (status, body) = call(db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("nope"), "{body}");
}
