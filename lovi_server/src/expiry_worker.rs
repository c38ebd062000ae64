use chrono::Duration;
use log::*;
use lovi_engine::{db_types::Order, events::EventProducers, OrderFlowApi, OrderPolicy, SqliteDatabase};
use tokio::task::JoinHandle;

const EXPIRY_INTERVAL_SECS: u64 = 60;

/// Starts the pending order expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Orders that are still waiting for payment `pending_timeout` after they were placed are cancelled, which releases
/// their stock back to the ledger entries it came from.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    policy: OrderPolicy,
    pending_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(EXPIRY_INTERVAL_SECS));
        let api = OrderFlowApi::new(db, producers, policy);
        info!("🕰️ Pending order expiry worker started. Orders expire after {} hrs.", pending_timeout.num_hours());
        loop {
            timer.tick().await;
            trace!("🕰️ Running pending order expiry job");
            match api.expire_pending_orders(pending_timeout).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No orders expired"),
                Ok(expired) => {
                    info!("🕰️ {} orders expired", expired.len());
                    debug!("🕰️ Expired orders: {}", order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running pending order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_number: {} cust_id: {}", o.id, o.order_number, o.customer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
