//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and cache call is therefore async.
//!
//! Guest routes identify the caller with the `x-guest-client-id` header ([`GuestId`]). Restaurant routes require a
//! bearer token, and take the tenant from its claims ([`RestaurantClaims`]).
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use platter_engine::{
    db_types::LineKind,
    traits::{NewFeedback, OrderLifecycleDatabase},
    CartEntry,
    GuestCartApi,
    IdentityMergeApi,
    OrderFlowApi,
};
use serde::Deserialize;

use crate::{
    auth::{GuestId, RestaurantClaims},
    config::ServerOptions,
    data_objects::{
        CancelRequest,
        CartEntryRequest,
        ComplaintRequest,
        FeedbackReplyRequest,
        FeedbackRequest,
        JsonResponse,
        MergeRequest,
        MergeResponse,
        MergeTokenResponse,
        NewOrderRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

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

//----------------------------------------------   Guest orders  ----------------------------------------------------

route!(place_order => Post "/restaurants/{restaurant_id}/orders/{kind}" impl OrderLifecycleDatabase);
/// Places a food or combo order on behalf of the guest in the `x-guest-client-id` header.
///
/// The order starts in `waiting_confirm_customer`. A confirmation link is published to the order created hook and the
/// guest has a limited time to follow it before the order times out.
pub async fn place_order<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, LineKind)>,
    guest: GuestId,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, kind) = path.into_inner();
    debug!("💻️ POST {kind} order for restaurant #{restaurant_id} from guest {}", guest.as_str());
    let order =
        body.into_inner().into_new_order(restaurant_id, kind, guest.identity(), options.confirmation_base_url.clone())?;
    let details = api.place_order(order).await?;
    Ok(HttpResponse::Created().json(details))
}

route!(guest_order => Get "/restaurants/{restaurant_id}/orders/{order_id}" impl OrderLifecycleDatabase);
/// Fetches one of the guest's own orders, with its items and history.
pub async fn guest_order<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, i64)>,
    guest: GuestId,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, order_id) = path.into_inner();
    debug!("💻️ GET order #{order_id} for guest {}", guest.as_str());
    let details = api.order_for_customer(order_id, restaurant_id, guest.identity()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Guest actions that carry no request body
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuestStep {
    Confirm,
    Receive,
    ComplaintDone,
}

route!(guest_step => Post "/restaurants/{restaurant_id}/orders/{order_id}/{step}" impl OrderLifecycleDatabase);
/// `confirm`, `receive` and `complaint-done`
pub async fn guest_step<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, i64, GuestStep)>,
    guest: GuestId,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, order_id, step) = path.into_inner();
    debug!("💻️ POST {step:?} on order #{order_id} from guest {}", guest.as_str());
    let customer = guest.identity();
    let order = match step {
        GuestStep::Confirm => api.customer_confirm(order_id, restaurant_id, customer).await?,
        GuestStep::Receive => api.customer_receive(order_id, restaurant_id, customer).await?,
        GuestStep::ComplaintDone => api.customer_complaint_done(order_id, restaurant_id, customer).await?,
    };
    Ok(HttpResponse::Ok().json(order))
}

route!(guest_cancel => Post "/restaurants/{restaurant_id}/orders/{order_id}/cancel" impl OrderLifecycleDatabase);
pub async fn guest_cancel<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, i64)>,
    guest: GuestId,
    body: web::Json<CancelRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, order_id) = path.into_inner();
    debug!("💻️ POST cancel on order #{order_id} from guest {}", guest.as_str());
    let order = api.customer_cancel(order_id, restaurant_id, guest.identity(), &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(guest_complaint => Post "/restaurants/{restaurant_id}/orders/{order_id}/complaint" impl OrderLifecycleDatabase);
pub async fn guest_complaint<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, i64)>,
    guest: GuestId,
    body: web::Json<ComplaintRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, order_id) = path.into_inner();
    debug!("💻️ POST complaint on order #{order_id} from guest {}", guest.as_str());
    let order = api.customer_complaint(order_id, restaurant_id, guest.identity(), &body.content).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(guest_feedback => Post "/restaurants/{restaurant_id}/orders/{order_id}/feedback" impl OrderLifecycleDatabase);
pub async fn guest_feedback<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, i64)>,
    guest: GuestId,
    body: web::Json<FeedbackRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (restaurant_id, order_id) = path.into_inner();
    debug!("💻️ POST feedback on order #{order_id} from guest {}", guest.as_str());
    let feedback = NewFeedback::try_from(body.into_inner())?;
    let order = api.customer_feedback(order_id, restaurant_id, guest.identity(), feedback).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Restaurant orders  ----------------------------------------------------

route!(restaurant_order => Get "/restaurant/orders/{order_id}" impl OrderLifecycleDatabase);
pub async fn restaurant_order<B: OrderLifecycleDatabase>(
    path: web::Path<i64>,
    claims: RestaurantClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id} for restaurant #{}", claims.restaurant_id);
    let details = api.order_for_restaurant(order_id, claims.restaurant_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Restaurant actions that carry no request body
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestaurantStep {
    Confirm,
    ConfirmShipping,
    Delivered,
    CustomerUnreachable,
    FeedbackVisibility,
}

route!(restaurant_step => Post "/restaurant/orders/{order_id}/{step}" impl OrderLifecycleDatabase);
/// `confirm`, `confirm-shipping`, `delivered`, `customer-unreachable` and `feedback-visibility`
pub async fn restaurant_step<B: OrderLifecycleDatabase>(
    path: web::Path<(i64, RestaurantStep)>,
    claims: RestaurantClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (order_id, step) = path.into_inner();
    let restaurant_id = claims.restaurant_id;
    debug!("💻️ POST {step:?} on order #{order_id} from restaurant #{restaurant_id}");
    let order = match step {
        RestaurantStep::Confirm => api.restaurant_confirm(order_id, restaurant_id).await?,
        RestaurantStep::ConfirmShipping => api.restaurant_confirm_shipping(order_id, restaurant_id).await?,
        RestaurantStep::Delivered => api.restaurant_delivered(order_id, restaurant_id).await?,
        RestaurantStep::CustomerUnreachable => api.restaurant_customer_unreachable(order_id, restaurant_id).await?,
        RestaurantStep::FeedbackVisibility => {
            api.restaurant_toggle_feedback_visibility(order_id, restaurant_id).await?
        },
    };
    Ok(HttpResponse::Ok().json(order))
}

route!(restaurant_cancel => Post "/restaurant/orders/{order_id}/cancel" impl OrderLifecycleDatabase);
pub async fn restaurant_cancel<B: OrderLifecycleDatabase>(
    path: web::Path<i64>,
    claims: RestaurantClaims,
    body: web::Json<CancelRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST cancel on order #{order_id} from restaurant #{}", claims.restaurant_id);
    let order = api.restaurant_cancel(order_id, claims.restaurant_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(restaurant_feedback_reply => Post "/restaurant/orders/{order_id}/feedback-reply" impl OrderLifecycleDatabase);
pub async fn restaurant_feedback_reply<B: OrderLifecycleDatabase>(
    path: web::Path<i64>,
    claims: RestaurantClaims,
    body: web::Json<FeedbackReplyRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST feedback reply on order #{order_id} from restaurant #{}", claims.restaurant_id);
    let order = api.restaurant_reply_feedback(order_id, claims.restaurant_id, &body.reply).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Identity merge  ----------------------------------------------------

route!(merge_token => Post "/identity/merge-token");
/// Issues a single-use merge token for the guest id in the header. The token is valid for ten minutes.
pub async fn merge_token(guest: GuestId, api: web::Data<IdentityMergeApi>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST merge token for guest {}", guest.as_str());
    let token = api.issue_merge_token(guest.as_str()).await?;
    Ok(HttpResponse::Ok().json(MergeTokenResponse { token }))
}

route!(merge_identity => Post "/identity/merge");
/// Redeems a merge token on behalf of the (new) guest id in the header. The guest's orders and cart are moved in the
/// background.
pub async fn merge_identity(
    guest: GuestId,
    body: web::Json<MergeRequest>,
    api: web::Data<IdentityMergeApi>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST identity merge for guest {}", guest.as_str());
    let guest_id = api.verify_merge_token(&body.token, guest.as_str()).await?;
    Ok(HttpResponse::Ok().json(MergeResponse { guest_id }))
}

//----------------------------------------------   Cart  ----------------------------------------------------

route!(my_cart => Get "/cart");
pub async fn my_cart(guest: GuestId, api: web::Data<GuestCartApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for guest {}", guest.as_str());
    let entries = api.entries(guest.as_str()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(add_to_cart => Post "/cart");
/// Adds a product to the cart, or replaces its quantity if it is already there. A zero quantity removes it.
pub async fn add_to_cart(
    guest: GuestId,
    body: web::Json<CartEntryRequest>,
    api: web::Data<GuestCartApi>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST cart entry for guest {}", guest.as_str());
    let entry = CartEntry::try_from(body.into_inner())?;
    let entries = api.add_entry(guest.as_str(), entry).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(clear_cart => Delete "/cart");
pub async fn clear_cart(guest: GuestId, api: web::Data<GuestCartApi>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for guest {}", guest.as_str());
    api.clear(guest.as_str()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared")))
}
