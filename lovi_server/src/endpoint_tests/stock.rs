use actix_web::{http::StatusCode, test::TestRequest};
use lovi_common::Money;
use lovi_engine::{
    db_types::{MovementType, StockMovement, Variant},
    helpers::AllocationPlan,
    inventory_objects::StockOverview,
    traits::{AdjustmentResult, ReceivedStock, RemovedStockEntry},
};
use serde_json::json;

use super::helpers::TestStore;

async fn receive(store: &TestStore, variant_id: i64, brand: &str, quantity: i64, preferred: bool) -> ReceivedStock {
    let body = json!({
        "variant_id": variant_id,
        "brand": brand,
        "cost_price": 350,
        "quantity": quantity,
        "is_preferred": preferred,
        "actor": "warehouse"
    });
    let (status, body) = store.call(TestRequest::post().uri("/api/stock").set_json(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_str(&body).unwrap()
}

#[actix_web::test]
async fn create_variants() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let body = json!({ "product_id": 7, "sku": "BOX-XL", "name": "LoviBox XL", "min_stock": 2 });
    let (status, res) = store.call(TestRequest::post().uri("/api/variants").set_json(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{res}");
    let variant: Variant = serde_json::from_str(&res).unwrap();
    assert_eq!(variant.sku, "BOX-XL");
    assert_eq!(variant.stock, 0);
    assert_eq!(variant.min_stock, 2);

    let (status, res) = store.call(TestRequest::post().uri("/api/variants").set_json(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(res.contains("A variant with SKU BOX-XL already exists"), "{res}");

    let body = json!({ "product_id": 7, "sku": " ", "name": "Nameless" });
    let (status, _) = store.call(TestRequest::post().uri("/api/variants").set_json(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    store.tear_down().await;
}

#[actix_web::test]
async fn receive_stock_and_view_it() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 4).await;
    let received = receive(&store, variant_id, "Artisan", 6, true).await;
    assert_eq!(received.entry.quantity, 6);
    assert!(received.entry.is_preferred);
    assert_eq!(received.entry.cost_price, Money::from_cents(350));
    assert_eq!(received.movement.movement_type, MovementType::Purchase);
    assert_eq!(received.movement.actor.as_deref(), Some("warehouse"));
    assert_eq!(received.variant.stock, 10);

    let uri = format!("/api/variants/{variant_id}/stock");
    let (status, body) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let overview: StockOverview = serde_json::from_str(&body).unwrap();
    assert_eq!(overview.variant.stock, 10);
    assert_eq!(overview.available, 10);
    assert_eq!(overview.entries.len(), 2);

    let body = json!({ "variant_id": variant_id, "brand": "Artisan", "cost_price": 350, "quantity": 0 });
    let (status, _) = store.call(TestRequest::post().uri("/api/stock").set_json(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({ "variant_id": 999, "brand": "Artisan", "cost_price": 350, "quantity": 3 });
    let (status, _) = store.call(TestRequest::post().uri("/api/stock").set_json(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = store.call(TestRequest::get().uri("/api/variants/999/stock")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = store.call(TestRequest::get().uri("/api/variants/BOX-M/stock")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    store.tear_down().await;
}

#[actix_web::test]
async fn allocation_preview() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 10).await;
    let preferred = receive(&store, variant_id, "Artisan", 5, true).await;

    let uri = format!("/api/variants/{variant_id}/allocation?quantity=7");
    let (status, body) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let plan: AllocationPlan = serde_json::from_str(&body).unwrap();
    assert_eq!(plan.requested, 7);
    assert_eq!(plan.allocations.len(), 2);
    assert_eq!(plan.allocations[0].stock_entry_id, preferred.entry.id);
    assert_eq!(plan.allocations[0].quantity, 5);
    assert_eq!(plan.allocations[1].brand, "Lovi");
    assert_eq!(plan.allocations[1].quantity, 2);
    // 5 x 3.50 + 2 x 3.00
    assert_eq!(plan.total_cost, Money::from_cents(2350));
    // A preview reserves nothing
    assert_eq!(store.stock(variant_id).await, 15);

    let uri = format!("/api/variants/{variant_id}/allocation?quantity=16");
    let (status, body) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Requested 16, but only 15 available"), "{body}");

    let uri = format!("/api/variants/{variant_id}/allocation?quantity=0");
    let (status, _) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/variants/{variant_id}/allocation");
    let (status, body) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"), "{body}");
    store.tear_down().await;
}

#[actix_web::test]
async fn adjust_stock() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 1).await;
    let entry = receive(&store, variant_id, "Artisan", 8, false).await.entry;

    let uri = format!("/api/stock/{}/adjust", entry.id);
    let body = json!({ "delta": -3, "reason": "Damaged in transit", "actor": "carol" });
    let (status, res) = store.call(TestRequest::post().uri(&uri).set_json(body)).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    let result: AdjustmentResult = serde_json::from_str(&res).unwrap();
    assert_eq!(result.entry.quantity, 5);
    assert_eq!(result.movement.movement_type, MovementType::Adjustment);
    assert_eq!(result.movement.previous_quantity, 8);
    assert_eq!(result.movement.new_quantity, 5);
    assert_eq!(result.variant.stock, 6);

    let body = json!({ "delta": -100 });
    let (status, res) = store.call(TestRequest::post().uri(&uri).set_json(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("negative stock"), "{res}");
    assert_eq!(store.stock(variant_id).await, 6);

    let uri = format!("/api/stock/{}/movements", entry.id);
    let (status, res) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let movements: Vec<StockMovement> = serde_json::from_str(&res).unwrap();
    let types = movements.iter().map(|m| m.movement_type).collect::<Vec<_>>();
    assert_eq!(types, vec![MovementType::Purchase, MovementType::Adjustment]);
    assert_eq!(movements[1].reason.as_deref(), Some("Damaged in transit"));

    let (status, _) = store.call(TestRequest::get().uri("/api/stock/999/movements")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json!({ "delta": 1 });
    let (status, _) = store.call(TestRequest::post().uri("/api/stock/999/adjust").set_json(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    store.tear_down().await;
}

#[actix_web::test]
async fn remove_stock_entries() {
    let _ = env_logger::try_init();
    let store = TestStore::new().await;
    let variant_id = store.stocked_variant("BOX-M", 2).await;
    let untouched = receive(&store, variant_id, "Artisan", 4, false).await.entry;
    let used = receive(&store, variant_id, "Bloom", 4, false).await.entry;
    let uri = format!("/api/stock/{}/adjust", used.id);
    let (status, _) = store.call(TestRequest::post().uri(&uri).set_json(json!({ "delta": -1 }))).await;
    assert_eq!(status, StatusCode::OK);

    // Even an untouched entry keeps its purchase record, so it is only deactivated
    let uri = format!("/api/stock/{}", untouched.id);
    let (status, body) = store.call(TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let removed: RemovedStockEntry = serde_json::from_str(&body).unwrap();
    assert!(!removed.deleted);
    assert!(!removed.entry.is_active);
    assert_eq!(removed.variant.stock, 5);
    let uri = format!("/api/stock/{}/movements", untouched.id);
    let (status, res) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    let movements: Vec<StockMovement> = serde_json::from_str(&res).unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Purchase);
    assert_eq!(movements[0].quantity, 4);

    let uri = format!("/api/stock/{}", used.id);
    let (status, body) = store.call(TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let removed: RemovedStockEntry = serde_json::from_str(&body).unwrap();
    assert!(!removed.deleted);
    assert!(!removed.entry.is_active);
    assert_eq!(removed.variant.stock, 2);
    let uri = format!("/api/stock/{}/movements", used.id);
    let (status, res) = store.call(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK, "{res}");
    let movements: Vec<StockMovement> = serde_json::from_str(&res).unwrap();
    let types = movements.iter().map(|m| m.movement_type).collect::<Vec<_>>();
    assert_eq!(types, vec![MovementType::Purchase, MovementType::Adjustment]);

    let (status, _) = store.call(TestRequest::delete().uri("/api/stock/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    store.tear_down().await;
}
