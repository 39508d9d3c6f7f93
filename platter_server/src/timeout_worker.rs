use chrono::Duration;
use log::*;
use platter_engine::{db_types::Order, events::EventProducers, OrderFlowApi, OrderFlowSettings, SqliteDatabase};
use rand::{thread_rng, Rng};
use tokio::task::JoinHandle;

/// A name for this server instance when it competes for the sweeper lease.
pub fn sweeper_holder_id() -> String {
    format!("platter-{:08x}", thread_rng().gen::<u32>())
}

/// Starts the order timeout worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, the worker tries to take (or renew) the sweeper lease. Only the instance holding the lease runs
/// the sweep, so several servers can share a database without escalating the same order twice.
pub fn start_timeout_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    settings: OrderFlowSettings,
    interval: std::time::Duration,
    holder: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = OrderFlowApi::new(db, producers).with_settings(settings);
        let lease_ttl = Duration::from_std(interval * 3).unwrap_or_else(|_| Duration::minutes(3));
        info!("🕰️ Order timeout worker started as {holder}");
        loop {
            timer.tick().await;
            match api.acquire_sweeper_lease(&holder, lease_ttl).await {
                Ok(true) => {},
                Ok(false) => {
                    trace!("🕰️ Another instance holds the sweeper lease. Skipping this round.");
                    continue;
                },
                Err(e) => {
                    error!("🕰️ Could not acquire the sweeper lease: {e}");
                    continue;
                },
            }
            debug!("🕰️ Running order timeout job");
            match api.expire_unconfirmed_orders().await {
                Ok(result) if result.is_empty() => trace!("🕰️ No orders timed out"),
                Ok(result) => {
                    info!("🕰️ {} orders timed out", result.count());
                    debug!("🕰️ Escalated orders: {}", order_list(&result.escalated));
                    if !result.skipped.is_empty() {
                        debug!("🕰️ {} orders were confirmed before they could be escalated", result.skipped.len());
                    }
                    for failure in &result.failed {
                        warn!("🕰️ Could not escalate order #{}: {}", failure.order_id, failure.reason);
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running order timeout job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] restaurant: {} kind: {}", o.id, o.restaurant_id, o.line_kind))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn holder_ids_are_distinct() {
        let a = sweeper_holder_id();
        let b = sweeper_holder_id();
        assert!(a.starts_with("platter-"));
        assert_eq!(a.len(), "platter-".len() + 8);
        assert_ne!(a, b);
    }
}
