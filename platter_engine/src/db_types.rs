//! Data types shared between the engine API and the database backends.
//!
//! Catalog records ([`CatalogItem`], [`CatalogOption`]) are owned by the catalog subsystem and are only ever read here.
//! Everything else is written by the order lifecycle engine.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use platter_common::Price;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------       LineKind        ---------------------------------------------------------
/// The two kinds of orderable catalog lines. Plain food items and combos share one order engine, but are backed by
/// different catalog tables and have slightly different guard rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Food,
    Combo,
}

impl LineKind {
    pub const ALL: [LineKind; 2] = [LineKind::Food, LineKind::Combo];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Food => "food",
            LineKind::Combo => "combo",
        }
    }
}

impl Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(Self::Food),
            "combo" => Ok(Self::Combo),
            s => Err(ConversionError("line kind", s.to_string())),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed and the customer must confirm it via the emailed link.
    WaitingConfirmCustomer,
    /// The customer never confirmed the order within the confirmation window.
    OverTimeCustomer,
    /// The customer has confirmed; the restaurant has not yet accepted the order.
    WaitingConfirmRestaurant,
    /// The customer cancelled before confirming.
    CancelCustomer,
    /// The restaurant accepted the order and is preparing it.
    WaitingShipping,
    /// The restaurant cancelled the order.
    CancelRestaurant,
    /// The order is with the carrier.
    Shipping,
    /// The restaurant reports the order as delivered.
    DeliveredCustomer,
    /// The carrier could not reach the customer.
    CustomerUnreachable,
    /// The customer confirmed receipt.
    ReceivedCustomer,
    /// The customer raised a complaint about a received order.
    Complaint,
    /// The customer marked their complaint as resolved.
    ComplaintDone,
}

impl OrderStatusType {
    pub fn as_str(&self) -> &'static str {
        use OrderStatusType::*;
        match self {
            WaitingConfirmCustomer => "waiting_confirm_customer",
            OverTimeCustomer => "over_time_customer",
            WaitingConfirmRestaurant => "waiting_confirm_restaurant",
            CancelCustomer => "cancel_customer",
            WaitingShipping => "waiting_shipping",
            CancelRestaurant => "cancel_restaurant",
            Shipping => "shipping",
            DeliveredCustomer => "delivered_customer",
            CustomerUnreachable => "customer_unreachable",
            ReceivedCustomer => "received_customer",
            Complaint => "complaint",
            ComplaintDone => "complaint_done",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use OrderStatusType::*;
        match s {
            "waiting_confirm_customer" => Ok(WaitingConfirmCustomer),
            "over_time_customer" => Ok(OverTimeCustomer),
            "waiting_confirm_restaurant" => Ok(WaitingConfirmRestaurant),
            "cancel_customer" => Ok(CancelCustomer),
            "waiting_shipping" => Ok(WaitingShipping),
            "cancel_restaurant" => Ok(CancelRestaurant),
            "shipping" => Ok(Shipping),
            "delivered_customer" => Ok(DeliveredCustomer),
            "customer_unreachable" => Ok(CustomerUnreachable),
            "received_customer" => Ok(ReceivedCustomer),
            "complaint" => Ok(Complaint),
            "complaint_done" => Ok(ComplaintDone),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------    ShippingMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Grab,
    Ahamove,
}

impl Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingMethod::Grab => write!(f, "grab"),
            ShippingMethod::Ahamove => write!(f, "ahamove"),
        }
    }
}

//--------------------------------------     StockStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    AlmostOut,
    SoldOut,
}

//--------------------------------------   CustomerIdentity    ---------------------------------------------------------
/// Who placed an order. Exactly one identity is active per order: either an authenticated user, or an anonymous,
/// device-local guest client id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CustomerIdentity {
    User(String),
    Guest(String),
}

impl CustomerIdentity {
    pub fn id(&self) -> &str {
        match self {
            CustomerIdentity::User(id) | CustomerIdentity::Guest(id) => id.as_str(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            CustomerIdentity::User(id) => Some(id.as_str()),
            CustomerIdentity::Guest(_) => None,
        }
    }

    pub fn guest_id(&self) -> Option<&str> {
        match self {
            CustomerIdentity::Guest(id) => Some(id.as_str()),
            CustomerIdentity::User(_) => None,
        }
    }
}

impl Display for CustomerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerIdentity::User(id) => write!(f, "user:{id}"),
            CustomerIdentity::Guest(id) => write!(f, "guest:{id}"),
        }
    }
}

//--------------------------------------      CatalogItem      ---------------------------------------------------------
/// A food item or combo, as currently listed in the restaurant's catalog.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub image: Option<String>,
    pub note: Option<String>,
    /// Start of the serving window, as `HH:MM` in the restaurant's business timezone
    pub open_time: String,
    /// End of the serving window, as `HH:MM` in the restaurant's business timezone
    pub close_time: String,
    pub stock_status: StockStatus,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogOption {
    pub id: i64,
    pub restaurant_id: i64,
    /// The catalog item this option belongs to
    pub item_id: i64,
    pub name: String,
    pub price: Price,
    pub enabled: bool,
}

//--------------------------------------     ItemSnapshot      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOption {
    pub id: i64,
    pub name: String,
    pub price: Price,
}

impl From<&CatalogOption> for SnapshotOption {
    fn from(option: &CatalogOption) -> Self {
        Self { id: option.id, name: option.name.clone(), price: option.price }
    }
}

/// A frozen copy of a catalog item (and the sub-options the customer picked) taken when the order was placed.
/// Snapshots are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: i64,
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    /// The catalog item this snapshot was copied from. For reference only; there is no live link.
    pub source_item_id: i64,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub image: Option<String>,
    pub note: Option<String>,
    pub options: Json<Vec<SnapshotOption>>,
    pub created_at: DateTime<Utc>,
}

impl ItemSnapshot {
    /// The unit price of this line: the item price plus every selected option.
    pub fn unit_price(&self) -> Price {
        self.price + self.options.0.iter().map(|o| o.price).sum()
    }
}

/// An item snapshot that has not been written to the database yet.
#[derive(Debug, Clone)]
pub struct NewItemSnapshot {
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    pub source_item_id: i64,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub image: Option<String>,
    pub note: Option<String>,
    pub options: Vec<SnapshotOption>,
}

impl NewItemSnapshot {
    pub fn copy_of(kind: LineKind, item: &CatalogItem, options: Vec<SnapshotOption>) -> Self {
        Self {
            restaurant_id: item.restaurant_id,
            line_kind: kind,
            source_item_id: item.id,
            name: item.name.clone(),
            price: item.price,
            description: item.description.clone(),
            image: item.image.clone(),
            note: item.note.clone(),
            options,
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    pub user_id: Option<String>,
    pub guest_id: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_email: String,
    pub recipient_address: String,
    pub recipient_note: Option<String>,
    pub shipping_method: ShippingMethod,
    pub shipping_price: Price,
    pub status: OrderStatusType,
    pub cancel_reason: Option<String>,
    pub complaint: Option<String>,
    pub feedback_star: Option<i64>,
    pub feedback_content: Option<String>,
    pub feedback_reply: Option<String>,
    pub feedback_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn customer(&self) -> Option<CustomerIdentity> {
        match (&self.user_id, &self.guest_id) {
            (Some(user), _) => Some(CustomerIdentity::User(user.clone())),
            (None, Some(guest)) => Some(CustomerIdentity::Guest(guest.clone())),
            (None, None) => None,
        }
    }

    pub fn feedback(&self) -> Option<Feedback> {
        let star = self.feedback_star?;
        Some(Feedback {
            star,
            content: self.feedback_content.clone().unwrap_or_default(),
            reply: self.feedback_reply.clone(),
            visible: self.feedback_visible,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub star: i64,
    pub content: String,
    pub reply: Option<String>,
    pub visible: bool,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub snapshot_id: i64,
    pub quantity: i64,
}

/// An order item, together with the snapshot it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub snapshot: ItemSnapshot,
}

impl OrderLine {
    pub fn line_total(&self) -> Price {
        self.snapshot.unit_price() * self.item.quantity
    }
}

//--------------------------------------    OrderAttribute     ---------------------------------------------------------
/// The kind of entry in an order's attribute log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    CustomerPlaced,
    CustomerConfirmed,
    CustomerCancelled,
    OverTime,
    RestaurantConfirmed,
    RestaurantCancelled,
    Shipping,
    Delivered,
    CustomerUnreachable,
    CustomerReceived,
    Complaint,
    ComplaintDone,
    Feedback,
    FeedbackReply,
    FeedbackVisibility,
}

/// One entry in the append-only history of an order. Entries are ordered by `seq`, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderAttribute {
    pub order_id: i64,
    pub seq: i64,
    pub attr_type: AttributeType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     OrderDetails      ---------------------------------------------------------
/// An order header with its lines and full attribute history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub history: Vec<OrderAttribute>,
}

impl OrderDetails {
    pub fn items_total(&self) -> Price {
        self.lines.iter().map(OrderLine::line_total).sum()
    }

    pub fn total_price(&self) -> Price {
        self.items_total() + self.order.shipping_price
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: Option<String>,
}

/// One requested line in a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub item_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub option_ids: Vec<i64>,
}

impl NewOrderLine {
    pub fn new(item_id: i64, quantity: u32) -> Self {
        Self { item_id, quantity, option_ids: Vec::new() }
    }

    pub fn with_options(mut self, option_ids: Vec<i64>) -> Self {
        self.option_ids = option_ids;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub restaurant_id: i64,
    pub line_kind: LineKind,
    pub requester: CustomerIdentity,
    pub recipient: Recipient,
    pub shipping_method: ShippingMethod,
    pub shipping_price: Price,
    /// The link embedded in the confirmation email. The order and restaurant ids are appended as query parameters.
    pub confirmation_url: Url,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new(
        restaurant_id: i64,
        line_kind: LineKind,
        requester: CustomerIdentity,
        recipient: Recipient,
        confirmation_url: Url,
    ) -> Self {
        Self {
            restaurant_id,
            line_kind,
            requester,
            recipient,
            shipping_method: ShippingMethod::Grab,
            shipping_price: Price::default(),
            confirmation_url,
            lines: Vec::new(),
        }
    }

    pub fn with_shipping(mut self, method: ShippingMethod, price: Price) -> Self {
        self.shipping_method = method;
        self.shipping_price = price;
        self
    }

    pub fn with_line(mut self, line: NewOrderLine) -> Self {
        self.lines.push(line);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        use OrderStatusType::*;
        let all = [
            WaitingConfirmCustomer,
            OverTimeCustomer,
            WaitingConfirmRestaurant,
            CancelCustomer,
            WaitingShipping,
            CancelRestaurant,
            Shipping,
            DeliveredCustomer,
            CustomerUnreachable,
            ReceivedCustomer,
            Complaint,
            ComplaintDone,
        ];
        for status in all {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        assert!("pending".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn snapshot_unit_price_includes_options() {
        let snapshot = ItemSnapshot {
            id: 1,
            restaurant_id: 1,
            line_kind: LineKind::Food,
            source_item_id: 10,
            name: "Pho bo".into(),
            price: Price::from(45_000),
            description: None,
            image: None,
            note: None,
            options: Json(vec![
                SnapshotOption { id: 1, name: "Extra beef".into(), price: Price::from(15_000) },
                SnapshotOption { id: 2, name: "Quail eggs".into(), price: Price::from(5_000) },
            ]),
            created_at: Utc::now(),
        };
        assert_eq!(snapshot.unit_price(), Price::from(65_000));
        let line = OrderLine {
            item: OrderItem { id: 1, order_id: 1, snapshot_id: 1, quantity: 3 },
            snapshot,
        };
        assert_eq!(line.line_total(), Price::from(195_000));
    }

    #[test]
    fn customer_identity_accessors() {
        let guest = CustomerIdentity::Guest("g-1".into());
        assert_eq!(guest.guest_id(), Some("g-1"));
        assert_eq!(guest.user_id(), None);
        assert_eq!(guest.to_string(), "guest:g-1");
        let json = serde_json::to_string(&CustomerIdentity::User("u-9".into())).unwrap();
        assert_eq!(json, r#"{"type":"user","id":"u-9"}"#);
    }
}
