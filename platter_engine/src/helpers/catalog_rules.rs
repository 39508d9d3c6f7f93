//! # Catalog availability rules
//!
//! Pure checks applied to catalog rows before they are snapshotted into an order.
//!
//! Serving windows are same-day, inclusive intervals `[open, close]` expressed as `HH:MM` in the restaurant's
//! business timezone. A window whose close time is earlier than its open time never matches.
use chrono::NaiveTime;

use crate::{
    db_types::{CatalogItem, CatalogOption, LineKind, SnapshotOption, StockStatus},
    traits::OrderFlowError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl ServingWindow {
    pub fn parse(open: &str, close: &str) -> Option<Self> {
        let open = parse_hhmm(open)?;
        let close = parse_hhmm(close)?;
        Some(Self { open, close })
    }

    /// Minutes are the finest granularity, so a close time of `21:00` still admits `21:00:59`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let time = truncate_to_minute(time);
        self.open <= time && time <= self.close
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time)
}

/// Checks that a catalog row exists in orderable state and is currently being served.
///
/// Disabled and sold-out items are reported as missing. Being disabled is a hard gate, whatever the stock state.
pub fn check_item_available(
    kind: LineKind,
    item_id: i64,
    item: Option<CatalogItem>,
    local_time: NaiveTime,
) -> Result<CatalogItem, OrderFlowError> {
    let item = match item {
        Some(item) if item.enabled && item.stock_status != StockStatus::SoldOut => item,
        _ => return Err(OrderFlowError::CatalogItemNotFound { kind, item_id }),
    };
    let in_window = ServingWindow::parse(&item.open_time, &item.close_time).is_some_and(|w| w.contains(local_time));
    if !in_window {
        return Err(OrderFlowError::OutOfServiceWindow {
            name: item.name.clone(),
            open: item.open_time.clone(),
            close: item.close_time.clone(),
        });
    }
    Ok(item)
}

/// Resolves the requested option ids against the rows fetched for them. Every requested option must exist, be
/// enabled and belong to the same restaurant and parent item. The result preserves the requested order.
pub fn resolve_options(
    item: &CatalogItem,
    requested: &[i64],
    found: &[CatalogOption],
) -> Result<Vec<SnapshotOption>, OrderFlowError> {
    requested
        .iter()
        .map(|option_id| {
            found
                .iter()
                .find(|o| {
                    o.id == *option_id && o.enabled && o.restaurant_id == item.restaurant_id && o.item_id == item.id
                })
                .map(SnapshotOption::from)
                .ok_or(OrderFlowError::CatalogOptionNotFound { item_id: item.id, option_id: *option_id })
        })
        .collect()
}

/// Converts a client-supplied quantity into a whole number of units. The value must be finite, non-negative and whole.
pub fn quantity_from_f64(value: f64) -> Result<u32, OrderFlowError> {
    if !value.is_finite() {
        return Err(OrderFlowError::InvalidQuantity(format!("{value} is not a finite number")));
    }
    if value < 0.0 {
        return Err(OrderFlowError::InvalidQuantity(format!("{value} is negative")));
    }
    if value.fract() != 0.0 {
        return Err(OrderFlowError::InvalidQuantity(format!("{value} is not a whole number")));
    }
    if value > f64::from(u32::MAX) {
        return Err(OrderFlowError::InvalidQuantity(format!("{value} is too large")));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(value as u32)
}
