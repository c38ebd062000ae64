use std::net::IpAddr;

use actix_web::{http::StatusCode, test::TestRequest};
use lovi_common::Money;
use lovi_engine::db_types::{OrderNumber, OrderStatusType, PaymentRecordStatus, PaymentStatusType};

use super::helpers::{signed_callback, signed_notification, TestStore};
use crate::data_objects::WebhookAck;

const WEBHOOK: &str = "/webhooks/redsys";

#[actix_web::test]
async fn authorized_payment() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let order_number = details.order.order_number.clone();
    assert_eq!(details.order.total_amount, Money::from_cents(2915));

    let params = signed_callback(&order_number, Money::from_cents(2915), "0000", Some("123456"));
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ack: WebhookAck = serde_json::from_str(&body).unwrap();
    assert_eq!(ack, WebhookAck {
        success: true,
        order_number: order_number.clone(),
        authorized: true,
        applied: true,
        message: "Payment authorized. Order is CONFIRMED".to_string(),
    });
    let paid = store.order(&order_number).await;
    assert_eq!(paid.order.status, OrderStatusType::Confirmed);
    assert_eq!(paid.order.payment_status, PaymentStatusType::Paid);
    assert!(paid.order.paid_at.is_some());
    // Paid orders keep their stock
    assert_eq!(store.stock(variant_id).await, 8);

    // Redsys retries notifications it thinks were lost
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ack: WebhookAck = serde_json::from_str(&body).unwrap();
    assert!(!ack.applied);
    assert_eq!(ack.message, "Notification already processed");
    let paid = store.order(&order_number).await;
    assert_eq!(paid.order.status, OrderStatusType::Confirmed);
    let settled = paid.payments.iter().filter(|p| p.status == PaymentRecordStatus::Completed).count();
    assert_eq!(settled, 1);
    let expected_id = format!("{}:123456", order_number.as_str().replace('-', ""));
    assert_eq!(paid.payments[0].transaction_id.as_deref(), Some(expected_id.as_str()));
    store.tear_down().await;
}

#[actix_web::test]
async fn denied_payment_cancels_the_order() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let order_number = details.order.order_number.clone();
    assert_eq!(store.stock(variant_id).await, 8);

    let params = signed_callback(&order_number, Money::from_cents(2915), "0190", None);
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_json(&params)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ack: WebhookAck = serde_json::from_str(&body).unwrap();
    assert!(ack.success);
    assert!(!ack.authorized);
    assert!(ack.applied);
    assert_eq!(ack.message, "Payment denied. Order is CANCELLED");

    let cancelled = store.order(&order_number).await;
    assert_eq!(cancelled.order.status, OrderStatusType::Cancelled);
    assert_eq!(cancelled.order.payment_status, PaymentStatusType::Failed);
    assert_eq!(cancelled.payments[0].status, PaymentRecordStatus::Failed);
    assert_eq!(store.stock(variant_id).await, 10);
    store.tear_down().await;
}

#[actix_web::test]
async fn denied_payment_cancels_a_confirmed_order() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 3).await;
    let order_number = details.order.order_number.clone();
    let uri = format!("/api/orders/{order_number}/status");
    let req = TestRequest::patch().uri(&uri).set_json(serde_json::json!({ "status": "CONFIRMED" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(store.stock(variant_id).await, 7);

    let params = signed_callback(&order_number, details.order.total_amount, "0190", None);
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ack: WebhookAck = serde_json::from_str(&body).unwrap();
    assert!(ack.applied);
    assert_eq!(ack.message, "Payment denied. Order is CANCELLED");

    let cancelled = store.order(&order_number).await;
    assert_eq!(cancelled.order.status, OrderStatusType::Cancelled);
    assert_eq!(cancelled.order.payment_status, PaymentStatusType::Failed);
    assert_eq!(store.stock(variant_id).await, 10);
    store.tear_down().await;
}

#[actix_web::test]
async fn refund_notifications_leave_the_order_alone() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let order_number = details.order.order_number.clone();

    for (response, transaction_type) in [("0900", "3"), ("0400", "9")] {
        let amount = Money::from_cents(2915);
        let params = signed_notification(&order_number, amount, response, Some("654321"), transaction_type);
        let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let ack: WebhookAck = serde_json::from_str(&body).unwrap();
        assert!(!ack.authorized);
        assert!(!ack.applied);
        assert_eq!(ack.message, "Not a payment notification. Nothing to do");
    }
    let untouched = store.order(&order_number).await;
    assert_eq!(untouched.order.status, OrderStatusType::Pending);
    assert_eq!(untouched.order.payment_status, PaymentStatusType::Pending);
    assert_eq!(untouched.payments[0].status, PaymentRecordStatus::Pending);
    assert_eq!(store.stock(variant_id).await, 8);

    // The real payment still goes through afterwards
    let params = signed_callback(&order_number, Money::from_cents(2915), "0000", Some("123456"));
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(store.order(&order_number).await.order.status, OrderStatusType::Confirmed);
    store.tear_down().await;
}

#[actix_web::test]
async fn tampered_notifications_are_rejected() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let order_number = details.order.order_number.clone();

    let mut params = signed_callback(&order_number, Money::from_cents(2915), "0000", Some("123456"));
    let first = if params.signature.starts_with('A') { "B" } else { "A" };
    params.signature.replace_range(0..1, first);
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("The gateway signature could not be verified"), "{body}");

    let untouched = store.order(&order_number).await;
    assert_eq!(untouched.order.status, OrderStatusType::Pending);
    assert_eq!(untouched.order.payment_status, PaymentStatusType::Pending);
    assert_eq!(untouched.payments[0].status, PaymentRecordStatus::Pending);
    assert_eq!(store.stock(variant_id).await, 8);
    store.tear_down().await;
}

#[actix_web::test]
async fn bad_notifications() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let unknown = OrderNumber::from("LV000101-999".to_string());
    let params = signed_callback(&unknown, Money::from_cents(1000), "0000", Some("123456"));
    let (status, body) = store.call(TestRequest::post().uri(WEBHOOK).set_form(&params)).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let req = TestRequest::post().uri(WEBHOOK).set_form([("Ds_Signature", "abc")]);
    let (status, _) = store.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    store.tear_down().await;
}

#[actix_web::test]
async fn whitelisted_peers_only() {
    let _ = env_logger::try_init();
    let whitelist = vec!["10.1.1.1".parse::<IpAddr>().unwrap()];
    let store = TestStore::new().await.with_whitelist(whitelist);
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let order_number = details.order.order_number.clone();
    let params = signed_callback(&order_number, Money::from_cents(2915), "0000", Some("123456"));

    let req = TestRequest::post().uri(WEBHOOK).peer_addr("127.0.0.1:1234".parse().unwrap()).set_form(&params);
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Access denied for 127.0.0.1"}"#);
    assert_eq!(store.order(&order_number).await.order.status, OrderStatusType::Pending);

    let req = TestRequest::post().uri(WEBHOOK).peer_addr("10.1.1.1:443".parse().unwrap()).set_form(&params);
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(store.order(&order_number).await.order.status, OrderStatusType::Confirmed);

    // The API itself is not restricted
    let (status, _) = store.call(TestRequest::get().uri("/health").peer_addr("127.0.0.1:1234".parse().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    store.tear_down().await;
}
