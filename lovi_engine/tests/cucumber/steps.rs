use std::str::FromStr;

use chrono::Utc;
use cucumber::{given, then, when};
use lovi_common::Money;
use lovi_engine::{
    db_types::{GatewayResponse, MovementType, NewOrder, NewOrderLine, NewStockEntry, NewVariant, OrderStatusType},
    order_objects::StatusUpdate,
    traits::PaymentOutcome,
    InventoryError,
    OrderFlowError,
};

use crate::cucumber::StoreWorld;

//--------------------------------------        Setup        ---------------------------------------------------------

#[given(expr = "a store with variant {word}")]
async fn store_with_variant(world: &mut StoreWorld, sku: String) {
    create_variant(world, sku, 0).await;
}

#[given(expr = "a store with variant {word} and a minimum stock of {int}")]
async fn store_with_variant_and_minimum(world: &mut StoreWorld, sku: String, min_stock: i64) {
    create_variant(world, sku, min_stock).await;
}

async fn create_variant(world: &mut StoreWorld, sku: String, min_stock: i64) {
    let sys = world.system().await;
    let variant = NewVariant { product_id: 1, sku: sku.clone(), name: format!("LoviBox {sku}"), min_stock };
    let variant = sys.store.inventory.create_variant(variant).await.expect("Error creating variant");
    sys.variants.insert(sku, variant.id);
}

#[given(expr = "brand {string} supplies {int} units of {word} at {word} each")]
async fn brand_supplies(world: &mut StoreWorld, brand: String, quantity: i64, sku: String, cost: String) {
    receive(world, brand, quantity, sku, cost, false).await;
}

#[given(expr = "preferred brand {string} supplies {int} units of {word} at {word} each")]
async fn preferred_brand_supplies(world: &mut StoreWorld, brand: String, quantity: i64, sku: String, cost: String) {
    receive(world, brand, quantity, sku, cost, true).await;
}

async fn receive(world: &mut StoreWorld, brand: String, quantity: i64, sku: String, cost: String, preferred: bool) {
    let variant_id = world.variant_id(&sku);
    let cost = Money::from_str(&cost).expect("Invalid cost price");
    let mut entry = NewStockEntry::new(variant_id, brand.clone(), cost, quantity);
    if preferred {
        entry = entry.preferred();
    }
    let received = world.inventory().receive_stock(entry).await.expect("Error receiving stock");
    world.system().await.entries.insert(format!("{sku}/{brand}"), received.entry.id);
}

#[given(expr = "an order for {int} units of {word} was placed")]
async fn order_was_placed(world: &mut StoreWorld, quantity: i64, sku: String) {
    place_order(world, &[(quantity, sku)]).await;
    if let Some(e) = &world.sys().last_error {
        panic!("Order could not be placed: {e}");
    }
}

#[given(expr = "the order has been moved to {word}")]
async fn order_has_been_moved(world: &mut StoreWorld, status: String) {
    let target = OrderStatusType::from_str(&status).expect("Unknown status");
    let path: &[OrderStatusType] = match target {
        OrderStatusType::Pending => &[],
        OrderStatusType::Confirmed => &[OrderStatusType::Confirmed],
        OrderStatusType::InProduction => &[OrderStatusType::Confirmed, OrderStatusType::InProduction],
        OrderStatusType::ReadyForPickup => {
            &[OrderStatusType::Confirmed, OrderStatusType::InProduction, OrderStatusType::ReadyForPickup]
        },
        OrderStatusType::Shipped => {
            &[OrderStatusType::Confirmed, OrderStatusType::InProduction, OrderStatusType::Shipped]
        },
        OrderStatusType::Delivered => &[
            OrderStatusType::Confirmed,
            OrderStatusType::InProduction,
            OrderStatusType::Shipped,
            OrderStatusType::Delivered,
        ],
        OrderStatusType::Refunded => &[
            OrderStatusType::Confirmed,
            OrderStatusType::InProduction,
            OrderStatusType::Shipped,
            OrderStatusType::Delivered,
            OrderStatusType::Refunded,
        ],
        OrderStatusType::Cancelled => &[OrderStatusType::Cancelled],
    };
    let number = world.last_order();
    for status in path {
        world.orders().update_status(&number, StatusUpdate::new(*status)).await.expect("Error moving order along");
    }
}

//--------------------------------------       Actions       ---------------------------------------------------------

#[when(expr = "I plan an allocation of {int} units of {word}")]
async fn plan_allocation(world: &mut StoreWorld, quantity: i64, sku: String) {
    let variant_id = world.variant_id(&sku);
    let plan = world.inventory().plan_allocation(variant_id, quantity).await;
    world.system().await.last_plan = Some(plan);
}

#[when(expr = "a customer orders {int} units of {word}")]
async fn customer_orders(world: &mut StoreWorld, quantity: i64, sku: String) {
    place_order(world, &[(quantity, sku)]).await;
}

#[when(expr = "a customer orders {int} and then {int} units of {word} on separate lines")]
async fn customer_orders_two_lines(world: &mut StoreWorld, first: i64, second: i64, sku: String) {
    place_order(world, &[(first, sku.clone()), (second, sku)]).await;
}

async fn place_order(world: &mut StoreWorld, lines: &[(i64, String)]) {
    let mut order = NewOrder::new("alice", "standard");
    for (quantity, sku) in lines {
        let variant_id = world.variant_id(sku);
        order = order.with_line(NewOrderLine::new(1, Some(variant_id), *quantity, Money::from_euros(10)));
    }
    let result = world.orders().create_order(order).await;
    let sys = world.system().await;
    match result {
        Ok(details) => {
            sys.last_order = Some(details.order.order_number);
            sys.last_error = None;
        },
        Err(e) => sys.last_error = Some(e),
    }
}

#[when(expr = "the order is moved to {word}")]
async fn order_is_moved(world: &mut StoreWorld, status: String) {
    let target = OrderStatusType::from_str(&status).expect("Unknown status");
    let number = world.last_order();
    let result = world.orders().update_status(&number, StatusUpdate::new(target)).await;
    world.system().await.last_error = result.err();
}

#[when(expr = "the gateway authorizes payment for the order as transaction {word}")]
async fn gateway_authorizes(world: &mut StoreWorld, txid: String) {
    gateway_verdict(world, txid, "0000", true).await;
}

#[when(expr = "the gateway declines payment for the order as transaction {word} with code {word}")]
async fn gateway_declines(world: &mut StoreWorld, txid: String, code: String) {
    gateway_verdict(world, txid, &code, false).await;
}

async fn gateway_verdict(world: &mut StoreWorld, txid: String, code: &str, authorized: bool) {
    let number = world.last_order();
    let order = world.orders().order_by_number(&number).await.expect("Error fetching order").order;
    let response = GatewayResponse {
        gateway: "redsys".to_string(),
        response_code: code.to_string(),
        message: if authorized { "Transaction authorised".into() } else { "Transaction denied".into() },
        authorized,
        amount: order.total_amount,
        currency: Some("978".into()),
        authorisation_code: authorized.then(|| "123456".to_string()),
        card_brand: None,
        card_country: None,
        secure_payment: None,
        gateway_timestamp: None,
    };
    let outcome = PaymentOutcome { transaction_id: txid, authorized, response, received_at: Utc::now() };
    let reference = number.as_str().replace('-', "");
    let result = world.orders().reconcile_payment(&reference, outcome).await;
    world.system().await.last_error = result.err();
}

//--------------------------------------     Assertions      ---------------------------------------------------------

#[then(expr = "the plan takes {int} units from {string}")]
async fn plan_takes(world: &mut StoreWorld, quantity: i64, brand: String) {
    let plan = last_plan(world);
    let taken: i64 = plan.allocations.iter().filter(|a| a.brand == brand).map(|a| a.quantity).sum();
    assert_eq!(taken, quantity, "Plan took {taken} from {brand}, not {quantity}. Plan: {plan:?}");
}

#[then(expr = "the plan draws on {int} ledger entries")]
async fn plan_entry_count(world: &mut StoreWorld, count: usize) {
    assert_eq!(last_plan(world).allocations.len(), count);
}

#[then(expr = "the plan costs {word} in total")]
async fn plan_total_cost(world: &mut StoreWorld, cost: String) {
    let expected = Money::from_str(&cost).expect("Invalid cost");
    assert_eq!(last_plan(world).total_cost, expected);
}

#[then(expr = "planning fails with {int} available and {int} requested")]
async fn planning_fails(world: &mut StoreWorld, available: i64, requested: i64) {
    match world.sys().last_plan.as_ref().expect("No plan was made") {
        Err(InventoryError::InsufficientStock { available: a, requested: r, .. }) => {
            assert_eq!(*a, available);
            assert_eq!(*r, requested);
        },
        other => panic!("Expected an insufficient stock failure, got {other:?}"),
    }
}

fn last_plan(world: &StoreWorld) -> lovi_engine::helpers::AllocationPlan {
    match world.sys().last_plan.as_ref().expect("No plan was made") {
        Ok(plan) => plan.clone(),
        Err(e) => panic!("Planning failed: {e}"),
    }
}

#[then(expr = "{word} has {int} units in stock")]
async fn variant_stock(world: &mut StoreWorld, sku: String, quantity: i64) {
    let variant_id = world.variant_id(&sku);
    let overview = world.inventory().stock_overview(variant_id).await.expect("Error fetching stock");
    assert_eq!(overview.variant.stock, quantity, "Cached aggregate stock is wrong");
    assert_eq!(overview.available, quantity, "Sum of active entries is wrong");
}

#[then(expr = "the {string} entry of {word} holds {int} units")]
async fn entry_holds(world: &mut StoreWorld, brand: String, sku: String, quantity: i64) {
    let id = world.entry_id(&sku, &brand);
    let entry = world.inventory().stock_entry(id).await.expect("Error fetching stock entry");
    assert_eq!(entry.quantity, quantity);
}

#[then(expr = "the {string} entry of {word} has a {word} movement of {int}")]
async fn entry_has_movement(world: &mut StoreWorld, brand: String, sku: String, kind: String, quantity: i64) {
    let kind = parse_movement_type(&kind);
    let id = world.entry_id(&sku, &brand);
    let movements = world.inventory().movements_for_entry(id).await.expect("Error fetching movements");
    assert!(
        movements.iter().any(|m| m.movement_type == kind && m.quantity == quantity),
        "No {kind} movement of {quantity} in {movements:?}"
    );
}

fn parse_movement_type(s: &str) -> MovementType {
    match s {
        "PURCHASE" => MovementType::Purchase,
        "SALE" => MovementType::Sale,
        "ADJUSTMENT" => MovementType::Adjustment,
        "RETURN" => MovementType::Return,
        _ => panic!("Unknown movement type {s}"),
    }
}

#[then(expr = "the order is {word}")]
async fn order_status_is(world: &mut StoreWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Unknown status");
    let number = world.last_order();
    let order = world.orders().order_by_number(&number).await.expect("Error fetching order").order;
    assert_eq!(order.status, expected);
}

#[then(expr = "the payment status of the order is {word}")]
async fn payment_status_is(world: &mut StoreWorld, status: String) {
    let number = world.last_order();
    let order = world.orders().order_by_number(&number).await.expect("Error fetching order").order;
    assert_eq!(order.payment_status.to_string(), status);
    assert_eq!(order.paid_at.is_some(), status == "PAID");
}

#[then(expr = "the latest payment record is {word} with transaction {word}")]
async fn latest_payment_is(world: &mut StoreWorld, status: String, txid: String) {
    let number = world.last_order();
    let details = world.orders().order_by_number(&number).await.expect("Error fetching order");
    let payment = details.payments.iter().max_by_key(|p| p.id).expect("Order has no payment records");
    assert_eq!(payment.status.to_string(), status);
    assert_eq!(payment.transaction_id.as_deref(), Some(txid.as_str()));
    assert!(payment.gateway_response.is_some(), "Gateway response was not stored");
}

#[then(expr = "the order has {int} settled payment records")]
async fn settled_payment_count(world: &mut StoreWorld, count: usize) {
    let number = world.last_order();
    let details = world.orders().order_by_number(&number).await.expect("Error fetching order");
    let settled = details.payments.iter().filter(|p| p.transaction_id.is_some()).count();
    assert_eq!(settled, count);
}

#[then(expr = "the order has a tracking number starting with {string}")]
async fn tracking_number(world: &mut StoreWorld, prefix: String) {
    let number = world.last_order();
    let order = world.orders().order_by_number(&number).await.expect("Error fetching order").order;
    let tracking = order.tracking_number.expect("Order has no tracking number");
    assert!(tracking.starts_with(&prefix), "Tracking number {tracking} does not start with {prefix}");
}

#[then(expr = "every allocation of the order is {word}")]
async fn allocations_are(world: &mut StoreWorld, status: String) {
    let number = world.last_order();
    let details = world.orders().order_by_number(&number).await.expect("Error fetching order");
    assert!(!details.allocations.is_empty(), "Order has no allocations");
    for allocation in &details.allocations {
        assert_eq!(format!("{:?}", allocation.status).to_uppercase(), status);
    }
}

#[then(expr = "the order has {int} allocations")]
async fn allocation_count(world: &mut StoreWorld, count: usize) {
    let number = world.last_order();
    let details = world.orders().order_by_number(&number).await.expect("Error fetching order");
    assert_eq!(details.allocations.len(), count);
}

#[then(expr = "the request is rejected as an invalid transition to {word}")]
async fn rejected_transition(world: &mut StoreWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Unknown status");
    match &world.sys().last_error {
        Some(OrderFlowError::InvalidTransition { to, .. }) => assert_eq!(*to, expected),
        other => panic!("Expected an invalid transition error, got {other:?}"),
    }
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut StoreWorld) {
    if let Some(e) = &world.sys().last_error {
        panic!("Expected success, but got {e}");
    }
}

#[then(expr = "the order is refused for insufficient stock of {int} units")]
async fn refused_for_stock(world: &mut StoreWorld, available: i64) {
    match &world.sys().last_error {
        Some(OrderFlowError::InventoryError(InventoryError::InsufficientStock { available: a, .. })) => {
            assert_eq!(*a, available)
        },
        other => panic!("Expected an insufficient stock error, got {other:?}"),
    }
}
