use actix_web::{http::StatusCode, test::TestRequest};
use lovi_common::Money;
use lovi_engine::{
    db_types::{AllocationStatus, NewStockEntry, OrderStatusType, PaymentStatusType},
    order_objects::{OrderDetails, StatusUpdateResult},
};
use redsys_tools::{sign_parameters, PaymentForm, REDSYS_TEST_URL, SIGNATURE_VERSION};
use serde_json::{json, Value};

use super::helpers::{TestStore, TEST_SECRET};

fn order_body(variant_id: i64, quantity: i64) -> Value {
    json!({
        "customer_id": "bob",
        "shipping_method": "standard",
        "shipping_address": "Calle Mayor 1, Madrid",
        "lines": [{ "product_id": 1, "variant_id": variant_id, "quantity": quantity, "unit_price": 1000 }]
    })
}

fn error_message(body: &str) -> String {
    let v: Value = serde_json::from_str(body).expect("Error body is not JSON");
    v["error"].as_str().expect("No error message").to_string()
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let preferred = NewStockEntry::new(variant_id, "Artisan", Money::from_euros(4), 5).preferred();
    store.inventory().receive_stock(preferred).await.unwrap();

    let req = TestRequest::post().uri("/api/orders").set_json(order_body(variant_id, 7));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let details: OrderDetails = serde_json::from_str(&body).unwrap();
    let order = &details.order;
    assert!(order.order_number.as_str().starts_with("LV"));
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::Pending);
    assert_eq!(order.subtotal, Money::from_cents(7000));
    assert_eq!(order.tax_amount, Money::from_cents(1470));
    assert_eq!(order.shipping_cost, Money::from_cents(495));
    assert_eq!(order.total_amount, Money::from_cents(8965));
    assert_eq!(details.lines.len(), 1);
    assert_eq!(details.payments.len(), 1);
    // The preferred brand is drawn down first
    let mut drawn = details.allocations.iter().map(|a| a.quantity).collect::<Vec<_>>();
    drawn.sort();
    assert_eq!(drawn, vec![2, 5]);
    assert!(details.allocations.iter().all(|a| a.status == AllocationStatus::Allocated));
    assert_eq!(store.stock(variant_id).await, 8);

    let uri = format!("/api/orders/{}", order.order_number);
    let (status, body) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: OrderDetails = serde_json::from_str(&body).unwrap();
    assert_eq!(fetched.order, details.order);
    store.tear_down().await;
}

#[actix_web::test]
async fn create_order_without_enough_stock() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-S", 3).await;
    let req = TestRequest::post().uri("/api/orders").set_json(order_body(variant_id, 5));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        error_message(&body),
        format!("Insufficient stock for variant {variant_id}. Requested 5, but only 3 available")
    );
    assert_eq!(store.stock(variant_id).await, 3);
    store.tear_down().await;
}

#[actix_web::test]
async fn create_invalid_orders() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-L", 3).await;
    let mut body = order_body(variant_id, 1);
    body["shipping_method"] = json!("teleport");
    let (status, res) = store.call(TestRequest::post().uri("/api/orders").set_json(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&res), "Invalid order. Unknown shipping method: teleport");

    let (status, _) = store.call(TestRequest::post().uri("/api/orders").set_json(order_body(variant_id, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({ "customer_id": "bob" });
    let (status, res) = store.call(TestRequest::post().uri("/api/orders").set_json(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&res).starts_with("Could not read request body"));

    let (status, _) = store.call(TestRequest::post().uri("/api/orders").set_json(order_body(4242, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    store.tear_down().await;
}

#[actix_web::test]
async fn fetch_unknown_order() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let (status, body) = store.call(TestRequest::get().uri("/api/orders/LV000101-999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. The requested order LV000101-999 does not exist");
    store.tear_down().await;
}

#[actix_web::test]
async fn order_status_transitions() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 4).await;
    let uri = format!("/api/orders/{}/status", details.order.order_number);

    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "CONFIRMED", "notes": "Paid by transfer" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: StatusUpdateResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.order.status, OrderStatusType::Confirmed);
    assert!(result.transition.is_some());

    // Skipping production is not allowed
    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "SHIPPED" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Cannot move order from CONFIRMED to SHIPPED");
    assert_eq!(store.order(&details.order.order_number).await.order.status, OrderStatusType::Confirmed);

    // Asking for the current status is a no-op
    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "CONFIRMED" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK);
    let result: StatusUpdateResult = serde_json::from_str(&body).unwrap();
    assert!(result.transition.is_none());
    assert!(!result.customer_notified);

    for next in ["IN_PRODUCTION", "SHIPPED"] {
        let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": next }));
        let (status, body) = store.call(req).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let shipped = store.order(&details.order.order_number).await;
    assert_eq!(shipped.order.status, OrderStatusType::Shipped);
    let tracking = shipped.order.tracking_number.expect("No tracking number assigned");
    assert!(tracking.starts_with("TRK-"));
    assert!(shipped.allocations.iter().all(|a| a.status == AllocationStatus::Fulfilled));

    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "LOST_IN_SPACE" }));
    let (status, _) = store.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    store.tear_down().await;
}

#[actix_web::test]
async fn cancelling_an_order_returns_its_stock() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 6).await;
    assert_eq!(store.stock(variant_id).await, 4);
    let uri = format!("/api/orders/{}/status", details.order.order_number);
    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "CANCELLED", "actor": "support" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(store.stock(variant_id).await, 10);
    let cancelled = store.order(&details.order.order_number).await;
    assert!(cancelled.allocations.iter().all(|a| a.status == AllocationStatus::Cancelled));

    let req = TestRequest::patch().uri(&uri).set_json(json!({ "status": "CONFIRMED" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Cannot move order from CANCELLED to CONFIRMED");
    store.tear_down().await;
}

#[actix_web::test]
async fn payment_form() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let details = store.place_order(variant_id, 2).await;
    let uri = format!("/api/orders/{}/payment", details.order.order_number);

    let req = TestRequest::post().uri(&uri).set_json(json!({ "language": "002" }));
    let (status, body) = store.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let form: PaymentForm = serde_json::from_str(&body).unwrap();
    assert_eq!(form.redirect_url, REDSYS_TEST_URL);
    assert_eq!(form.parameters.signature_version, SIGNATURE_VERSION);
    let expected = sign_parameters(&form.parameters.merchant_parameters, TEST_SECRET).unwrap();
    assert_eq!(form.parameters.signature, expected);
    let decoded = base64::decode(&form.parameters.merchant_parameters).unwrap();
    let params: Value = serde_json::from_slice(&decoded).unwrap();
    // 2 x 10.00 + 21% tax + 4.95 shipping
    assert_eq!(params["DS_MERCHANT_AMOUNT"], "2915");
    assert_eq!(params["DS_MERCHANT_ORDER"], details.order.order_number.as_str().replace('-', ""));
    assert_eq!(params["DS_MERCHANT_CONSUMERLANGUAGE"], "002");

    // No body is fine too
    let (status, _) = store.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    // Once the order has moved on, it can no longer be paid for
    let status_uri = format!("/api/orders/{}/status", details.order.order_number);
    let req = TestRequest::patch().uri(&status_uri).set_json(json!({ "status": "CANCELLED" }));
    let (status, _) = store.call(req).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = store.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("cannot be paid for"));
    store.tear_down().await;
}
