//! Order submission payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// Body of `POST /order-placed` and `POST /schedule-order-placed`.
///
/// `price` is a string on the wire. `schedule_date` is serialized as an
/// RFC 3339 UTC timestamp and omitted for immediate orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub restaurant_id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub price: String,
    pub take_away: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_date: Option<DateTime<Utc>>,
}

impl OrderRequest {
    pub fn is_scheduled(&self) -> bool {
        self.schedule_date.is_some()
    }
}
