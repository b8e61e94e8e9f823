use std::{pin::Pin, time::Duration};

use actix_web::{body::MessageBody, http::StatusCode, rt::time::timeout, test, test::TestRequest, web, App};
use chrono::Utc;
use futures::future::poll_fn;
use qpg_common::Cents;
use qr_payment_engine::{
    db_types::{PaymentStatus, Sale, SaleId, SaleStatus},
    events::PaymentStatusEvent,
    RetryConfig,
    WebhookFlowApi,
};

use super::mocks::{MockProvider, MockReconciliationDb};
use crate::routes::SaleEventsRoute;

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

/// Pulls the next server-sent-event frame off a streaming response body.
async fn next_frame<B>(body: &mut B) -> String
where
    B: MessageBody + Unpin,
    B::Error: std::fmt::Debug,
{
    let frame = timeout(Duration::from_secs(5), poll_fn(|cx| Pin::new(&mut *body).poll_next(cx)))
        .await
        .expect("no frame arrived in time")
        .expect("the event stream ended");
    String::from_utf8(frame.unwrap().to_vec()).unwrap()
}

#[actix_web::test]
async fn the_event_stream_sends_a_snapshot_then_live_updates() {
    let mut db = MockReconciliationDb::new();
    db.expect_fetch_sale().returning(|id| Ok(Some(pending_sale(id.as_str()))));
    let flow = web::Data::new(WebhookFlowApi::new(db, MockProvider::new()).with_retry_config(RetryConfig::none()));
    let app = App::new()
        .app_data(flow.clone())
        .service(SaleEventsRoute::<MockReconciliationDb, MockProvider>::new());
    let app = test::init_service(app).await;

    let res = test::call_service(&app, TestRequest::get().uri("/sales/till-4-1015/events").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "text/event-stream");
    let (_, res) = res.into_parts();
    let mut body = res.into_body();

    // the first frame replays the sale's current state
    let snapshot = next_frame(&mut body).await;
    assert!(snapshot.starts_with("data: "), "{snapshot}");
    assert!(snapshot.contains(r#""payment_status":"Pending""#), "{snapshot}");

    // every event published for the sale thereafter arrives as its own frame
    flow.subscriptions()
        .notify(PaymentStatusEvent {
            sale_id: SaleId::new("till-4-1015"),
            payment_status: PaymentStatus::Approved,
            sale_status: SaleStatus::Approved,
            provider_status: Some("approved".to_string()),
            provider_status_detail: Some("accredited".to_string()),
        })
        .await;
    let live = next_frame(&mut body).await;
    assert!(live.contains(r#""payment_status":"Approved""#), "{live}");
    assert!(live.ends_with("\n\n"), "{live}");
}

#[actix_web::test]
async fn streaming_an_unknown_sale_is_a_404() {
    let mut db = MockReconciliationDb::new();
    db.expect_fetch_sale().returning(|_| Ok(None));
    let flow = web::Data::new(WebhookFlowApi::new(db, MockProvider::new()).with_retry_config(RetryConfig::none()));
    let app = App::new().app_data(flow).service(SaleEventsRoute::<MockReconciliationDb, MockProvider>::new());
    let app = test::init_service(app).await;

    let res = test::call_service(&app, TestRequest::get().uri("/sales/nope/events").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
