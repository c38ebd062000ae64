//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use lovi_engine::{
    db_types::{NewOrder, NewStockEntry, NewVariant, OrderNumber},
    order_objects::StatusUpdate,
    traits::{InventoryManagement, OrderManagement, StockAdjustment},
    InventoryApi,
    OrderFlowApi,
};
use redsys_tools::{RedsysConfig, SignedParameters};

use crate::{
    data_objects::{AdjustStockParams, AllocationQuery, PaymentFormParams, StatusUpdateParams},
    errors::ServerError,
    integrations::redsys::{payment_form_for, process_notification},
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

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderManagement);
/// Route handler for placing a new order
///
/// The body is a [`NewOrder`]. Stock is allocated for every line that names a variant, and the response carries the
/// stored order with its lines, allocations and pending payment record.
///
/// Orders that cannot be covered from stock are rejected with a 409.
pub async fn create_order<B: OrderManagement>(
    body: web::Json<NewOrder>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ POST new order for customer {} ({} lines)", order.customer_id, order.lines.len());
    let details = api.create_order(order).await?;
    Ok(HttpResponse::Created().json(details))
}

route!(order_by_number => Get "/orders/{order_number}" impl OrderManagement);
pub async fn order_by_number<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET order {order_number}");
    let details = api.order_by_number(&order_number).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(update_order_status => Patch "/orders/{order_number}/status" impl OrderManagement);
/// Route handler for moving an order to a new status.
///
/// Transitions that are not allowed from the order's current status are answered with a 400 naming the rejected
/// status. Requesting the status the order already has is accepted and changes nothing.
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let update = StatusUpdate::from(body.into_inner());
    debug!("💻️ PATCH order {order_number} status to {}", update.status);
    let result = api.update_status(&order_number, update).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(order_payment_form => Post "/orders/{order_number}/payment" impl OrderManagement);
/// Route handler for the Redsys payment form of an unpaid order.
///
/// The storefront posts the returned parameters to `redirect_url` from the customer's browser.
pub async fn order_payment_form<B: OrderManagement>(
    path: web::Path<String>,
    body: Option<web::Json<PaymentFormParams>>,
    api: web::Data<OrderFlowApi<B>>,
    redsys: web::Data<RedsysConfig>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ POST payment form for order {order_number}");
    let params = body.map(|b| b.into_inner()).unwrap_or_default();
    let data = api.payment_request_for(&order_number).await?;
    let form = payment_form_for(&redsys, &data, params.language)?;
    Ok(HttpResponse::Ok().json(form))
}

//----------------------------------------------   Variants  ----------------------------------------------------
route!(create_variant => Post "/variants" impl InventoryManagement);
pub async fn create_variant<B: InventoryManagement>(
    body: web::Json<NewVariant>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant = body.into_inner();
    debug!("💻️ POST new variant {}", variant.sku);
    let variant = api.create_variant(variant).await?;
    Ok(HttpResponse::Created().json(variant))
}

route!(variant_stock => Get "/variants/{id}/stock" impl InventoryManagement);
pub async fn variant_stock<B: InventoryManagement>(
    path: web::Path<i64>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant_id = path.into_inner();
    debug!("💻️ GET stock for variant {variant_id}");
    let overview = api.stock_overview(variant_id).await?;
    Ok(HttpResponse::Ok().json(overview))
}

route!(allocation_preview => Get "/variants/{id}/allocation" impl InventoryManagement);
/// Route handler for previewing how `quantity` units of a variant would be drawn from the ledger.
///
/// Nothing is reserved. The stock may well have moved by the time an order is placed.
pub async fn allocation_preview<B: InventoryManagement>(
    path: web::Path<i64>,
    query: web::Query<AllocationQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant_id = path.into_inner();
    let quantity = query.into_inner().quantity;
    debug!("💻️ GET allocation preview of {quantity} units for variant {variant_id}");
    let plan = api.plan_allocation(variant_id, quantity).await?;
    Ok(HttpResponse::Ok().json(plan))
}

//----------------------------------------------   Stock ledger  ----------------------------------------------------
route!(receive_stock => Post "/stock" impl InventoryManagement);
pub async fn receive_stock<B: InventoryManagement>(
    body: web::Json<NewStockEntry>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let entry = body.into_inner();
    debug!("💻️ POST {} units of variant {} from {}", entry.quantity, entry.variant_id, entry.brand);
    let received = api.receive_stock(entry).await?;
    Ok(HttpResponse::Created().json(received))
}

route!(adjust_stock => Post "/stock/{id}/adjust" impl InventoryManagement);
pub async fn adjust_stock<B: InventoryManagement>(
    path: web::Path<i64>,
    body: web::Json<AdjustStockParams>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stock_entry_id = path.into_inner();
    let AdjustStockParams { delta, reason, actor } = body.into_inner();
    debug!("💻️ POST adjustment of {delta} to stock entry {stock_entry_id}");
    let result = api.adjust_stock(StockAdjustment { stock_entry_id, delta, reason, actor }).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(remove_stock_entry => Delete "/stock/{id}" impl InventoryManagement);
pub async fn remove_stock_entry<B: InventoryManagement>(
    path: web::Path<i64>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stock_entry_id = path.into_inner();
    debug!("💻️ DELETE stock entry {stock_entry_id}");
    let removed = api.remove_stock_entry(stock_entry_id).await?;
    Ok(HttpResponse::Ok().json(removed))
}

route!(stock_movements => Get "/stock/{id}/movements" impl InventoryManagement);
pub async fn stock_movements<B: InventoryManagement>(
    path: web::Path<i64>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stock_entry_id = path.into_inner();
    debug!("💻️ GET movements for stock entry {stock_entry_id}");
    let movements = api.movements_for_entry(stock_entry_id).await?;
    Ok(HttpResponse::Ok().json(movements))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(redsys_webhook => Post "/redsys" impl OrderManagement);
/// Route handler for Redsys payment notifications.
///
/// Redsys posts the notification as a form. JSON bodies with the same three fields are accepted too. Any notification
/// that was verified and applied (or found to have been applied already) is acknowledged with a 200, whether the
/// payment was authorized or not.
pub async fn redsys_webhook<B: OrderManagement>(
    req: HttpRequest,
    body: web::Either<web::Form<SignedParameters>, web::Json<SignedParameters>>,
    api: web::Data<OrderFlowApi<B>>,
    redsys: web::Data<RedsysConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received Redsys notification: {}", req.uri());
    let parameters = match body {
        web::Either::Left(form) => form.into_inner(),
        web::Either::Right(json) => json.into_inner(),
    };
    let ack = process_notification(&api, &redsys, &parameters).await?;
    Ok(HttpResponse::Ok().json(ack))
}
