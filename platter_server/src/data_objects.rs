use std::fmt::Display;

use platter_common::Price;
use platter_engine::{
    db_types::{CustomerIdentity, LineKind, NewOrder, NewOrderLine, Recipient, ShippingMethod},
    helpers::quantity_from_f64,
    traits::NewFeedback,
    CartEntry,
    OrderFlowError,
};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// A requested order line. Quantities arrive as JSON numbers and must be whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub recipient: Recipient,
    pub shipping_method: ShippingMethod,
    #[serde(default)]
    pub shipping_price: i64,
    pub items: Vec<OrderLineRequest>,
}

impl NewOrderRequest {
    pub fn into_new_order(
        self,
        restaurant_id: i64,
        line_kind: LineKind,
        requester: CustomerIdentity,
        confirmation_url: Url,
    ) -> Result<NewOrder, OrderFlowError> {
        let mut order = NewOrder::new(restaurant_id, line_kind, requester, self.recipient, confirmation_url)
            .with_shipping(self.shipping_method, Price::from(self.shipping_price));
        for line in self.items {
            let quantity = quantity_from_f64(line.quantity)?;
            order = order.with_line(NewOrderLine::new(line.item_id, quantity).with_options(line.option_ids));
        }
        Ok(order)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub star: i64,
    #[serde(default)]
    pub content: String,
}

impl TryFrom<FeedbackRequest> for NewFeedback {
    type Error = OrderFlowError;

    fn try_from(value: FeedbackRequest) -> Result<Self, Self::Error> {
        NewFeedback::new(value.star, value.content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackReplyRequest {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResponse {
    pub guest_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntryRequest {
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    pub item_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

impl TryFrom<CartEntryRequest> for CartEntry {
    type Error = OrderFlowError;

    fn try_from(value: CartEntryRequest) -> Result<Self, Self::Error> {
        Ok(CartEntry {
            restaurant_id: value.restaurant_id,
            line_kind: value.line_kind,
            item_id: value.item_id,
            quantity: quantity_from_f64(value.quantity)?,
            option_ids: value.option_ids,
        })
    }
}
