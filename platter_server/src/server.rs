use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, PathError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use futures::FutureExt;
use log::*;
use platter_engine::{
    cache::MemoryCache,
    cart_merge_hook,
    db_types::LineKind,
    events::{EventHandlers, EventHooks, EventProducers, OrderCreatedEvent, OrderNotificationEvent},
    helpers::MergeTokenIssuer,
    order_merge_hook,
    GuestCache,
    GuestCartApi,
    IdentityMergeApi,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    routes::{
        health,
        AddToCartRoute,
        ClearCartRoute,
        GuestCancelRoute,
        GuestComplaintRoute,
        GuestFeedbackRoute,
        GuestOrderRoute,
        GuestStepRoute,
        MergeIdentityRoute,
        MergeTokenRoute,
        MyCartRoute,
        PlaceOrderRoute,
        RestaurantCancelRoute,
        RestaurantFeedbackReplyRoute,
        RestaurantOrderRoute,
        RestaurantStepRoute,
    },
    timeout_worker::{start_timeout_worker, sweeper_holder_id},
};

const EVENT_BUFFER_SIZE: usize = 128;
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🗃️ Database migrations are up to date");
    }
    let cache = build_cache(&config).await?;
    let hooks = create_event_hooks(db.clone(), GuestCartApi::new(Arc::clone(&cache)));
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // The worker runs for the lifetime of the process
    let _worker = start_timeout_worker(
        db.clone(),
        producers.clone(),
        config.order_flow_settings(),
        config.sweep_interval,
        sweeper_holder_id(),
    );
    let srv = create_server_instance(config, db, cache, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    cache: Arc<dyn GuestCache>,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let settings = config.order_flow_settings();
    let options = ServerOptions::from_config(&config);
    let auth = config.auth.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_settings(settings);
        let merge_issuer = MergeTokenIssuer::new(auth.jwt_secret.reveal().as_bytes());
        let merge_api = IdentityMergeApi::new(Arc::clone(&cache), merge_issuer, producers.clone());
        let cart_api = GuestCartApi::new(Arc::clone(&cache));
        let jwt_signer = TokenIssuer::new(&auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("platter::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(merge_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(options.clone()))
            .configure(configure_routes)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route along with the extractor configuration. Routes with a fixed last segment must be registered
/// ahead of the `{step}` routes that share their prefix.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(health)
        .service(PlaceOrderRoute::<SqliteDatabase>::new())
        .service(GuestOrderRoute::<SqliteDatabase>::new())
        .service(GuestCancelRoute::<SqliteDatabase>::new())
        .service(GuestComplaintRoute::<SqliteDatabase>::new())
        .service(GuestFeedbackRoute::<SqliteDatabase>::new())
        .service(GuestStepRoute::<SqliteDatabase>::new())
        .service(RestaurantOrderRoute::<SqliteDatabase>::new())
        .service(RestaurantCancelRoute::<SqliteDatabase>::new())
        .service(RestaurantFeedbackReplyRoute::<SqliteDatabase>::new())
        .service(RestaurantStepRoute::<SqliteDatabase>::new())
        .service(MergeTokenRoute::new())
        .service(MergeIdentityRoute::new())
        .service(MyCartRoute::new())
        .service(AddToCartRoute::new())
        .service(ClearCartRoute::new());
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestBody(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ServerError::InvalidRequestPath(err.to_string()).into()
}

/// Wires up the event consumers. Identity merges fan out to three independent consumers; order creation and
/// notifications are logged, since delivering them to customers and restaurants is handled elsewhere.
pub fn create_event_hooks(db: SqliteDatabase, cart_api: GuestCartApi) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev: OrderCreatedEvent| {
            async move {
                info!(
                    "📬️ Order #{} ({}) placed at restaurant #{}. Confirmation link for {}: {}",
                    ev.order_id, ev.line_kind, ev.restaurant_id, ev.recipient.email, ev.confirmation_link
                );
            }
            .boxed()
        })
        .on_order_notification(|ev: OrderNotificationEvent| {
            async move {
                info!("📬️ Restaurant #{}: {}", ev.restaurant_id, ev.content);
            }
            .boxed()
        })
        .add_identity_merge_hook("food order merge", order_merge_hook(db.clone(), LineKind::Food))
        .add_identity_merge_hook("combo order merge", order_merge_hook(db, LineKind::Combo))
        .add_identity_merge_hook("cart merge", cart_merge_hook(cart_api));
    hooks
}

async fn build_cache(config: &ServerConfig) -> Result<Arc<dyn GuestCache>, ServerError> {
    if let Some(cache) = redis_cache(config).await? {
        return Ok(cache);
    }
    let cache = Arc::new(MemoryCache::new());
    let purged = Arc::clone(&cache);
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            timer.tick().await;
            purged.purge_expired();
        }
    });
    Ok(cache)
}

#[cfg(feature = "redis")]
async fn redis_cache(config: &ServerConfig) -> Result<Option<Arc<dyn GuestCache>>, ServerError> {
    match &config.redis_url {
        Some(url) => {
            let cache = platter_engine::cache::RedisCache::new(url, None)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            Ok(Some(Arc::new(cache)))
        },
        None => Ok(None),
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_cache(config: &ServerConfig) -> Result<Option<Arc<dyn GuestCache>>, ServerError> {
    if config.redis_url.is_some() {
        warn!("🪛️ PLATTER_REDIS_URL is set, but this server was built without the redis feature. Using memory cache.");
    }
    Ok(None)
}
