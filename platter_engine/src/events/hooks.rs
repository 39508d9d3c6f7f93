use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::*;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    IdentityMergeEvent,
    OrderCreatedEvent,
    OrderNotificationEvent,
};

/// The sending half of every registered hook. Cloned into each API that publishes events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_notification_producer: Vec<EventProducer<OrderNotificationEvent>>,
    pub identity_merge_producer: Vec<EventProducer<IdentityMergeEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_notification(&self, event: OrderNotificationEvent) {
        for producer in &self.order_notification_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    /// Every identity merge consumer gets its own copy of the event.
    pub async fn publish_identity_merge(&self, event: IdentityMergeEvent) {
        for producer in &self.identity_merge_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_notification: Option<EventHandler<OrderNotificationEvent>>,
    pub on_identity_merge: Vec<EventHandler<IdentityMergeEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new("order created", buffer_size, f));
        let on_order_notification =
            hooks.on_order_notification.map(|f| EventHandler::new("order notification", buffer_size, f));
        let on_identity_merge = hooks
            .on_identity_merge
            .into_iter()
            .map(|(name, f)| EventHandler::new(name, buffer_size, f))
            .collect();
        Self { on_order_created, on_order_notification, on_identity_merge }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_notification {
            result.order_notification_producer.push(handler.subscribe());
        }
        for handler in &self.on_identity_merge {
            result.identity_merge_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_notification {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        for handler in self.on_identity_merge {
            info!("📬️ Starting identity merge consumer: {}", handler.name());
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_notification: Option<Handler<OrderNotificationEvent>>,
    pub on_identity_merge: Vec<(&'static str, Handler<IdentityMergeEvent>)>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> BoxFuture<'static, ()>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_notification<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderNotificationEvent) -> BoxFuture<'static, ()>) + Send + Sync + 'static {
        self.on_order_notification = Some(Arc::new(f));
        self
    }

    /// Adds an independent identity merge consumer. Unlike the other hooks, any number of these can be registered.
    pub fn add_identity_merge_hook(&mut self, name: &'static str, f: Handler<IdentityMergeEvent>) -> &mut Self {
        self.on_identity_merge.push((name, f));
        self
    }
}
