use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use futures_util::FutureExt;
use log::*;
use platter_engine::{
    db_types::LineKind,
    events::{EventHandlers, EventHooks, OrderCreatedEvent},
    test_utils::fixtures::*,
};
use tokio::sync::Mutex;

mod common;

use common::{setup_with, tear_down};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn order_events_are_published() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let created = Arc::new(Mutex::new(Vec::<OrderCreatedEvent>::new()));
    let notifications = HookCalled::default();

    let mut hooks = EventHooks::default();
    let sink = created.clone();
    hooks.on_order_created(move |ev| {
        let sink = sink.clone();
        async move {
            info!("🪝️ {ev:?}");
            sink.lock().await.push(ev);
        }
        .boxed()
    });
    let counter = notifications.clone();
    hooks.on_order_notification(move |ev| {
        trace!("🪝️ {}", ev.content);
        counter.called();
        async {}.boxed()
    });
    let handlers = EventHandlers::new(16, hooks);
    let api = setup_with(handlers.producers()).await;
    handlers.start_handlers().await;

    let db = api.db().clone();
    let pho = insert_catalog_item(&db, LineKind::Food, &CatalogFixture::new(RESTAURANT, "Pho bo", 55_000)).await;
    let me = guest("hooked");
    let id = api.place_order(order_for(LineKind::Food, me.clone(), pho, 1)).await.unwrap().order.id;
    api.customer_confirm(id, RESTAURANT, me).await.unwrap();
    // Restaurant actions do not notify the restaurant
    api.restaurant_confirm(id, RESTAURANT).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let created = created.lock().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].order_id, id);
    assert_eq!(created[0].recipient.email, "minh.anh@example.com");
    let expected = format!("https://platter.example.com/orders/confirm?order_id={id}&restaurant_id={RESTAURANT}");
    assert_eq!(created[0].confirmation_link, expected);
    assert_eq!(notifications.count(), 2);
    tear_down(api).await;
}
