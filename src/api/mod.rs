//! Typed helpers over [`ApiClient::request`].
//!
//! These cover the backend surface the feature layer uses. Domain models
//! live with the callers; helpers are generic over the payload type and
//! only fix the path, method and decoding.

pub mod decode;
pub mod endpoints;
pub mod order;

pub use decode::{DecodeStrategy, decode, is_object_id};
pub use order::{OrderItem, OrderRequest};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{ApiClient, ApiRequest, CourierError, Result};

/// Field carrying the identifier in order placement responses.
const ORDER_ID_FIELD: &str = "orderId";

impl ApiClient {
    /// GET `path` and decode a list, optionally found under `key`.
    pub async fn fetch_list<T: DeserializeOwned>(&self, path: &str, key: Option<&str>) -> Result<Vec<T>> {
        let body = self.request(&ApiRequest::get(path)).await?;
        decode(&body, key)
    }

    /// GET `path` and decode a single value, optionally found under `key`.
    pub async fn fetch_item<T: DeserializeOwned>(&self, path: &str, key: Option<&str>) -> Result<T> {
        let body = self.request(&ApiRequest::get(path)).await?;
        decode(&body, key)
    }

    /// POST `payload` as JSON to `path` and decode the response.
    pub async fn post_json<B, T>(&self, path: &str, payload: &B, key: Option<&str>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.request(&ApiRequest::post(path).json(payload)?).await?;
        decode(&body, key)
    }

    /// Submit an order and return its identifier.
    ///
    /// The identifier must be a 24-character lowercase-hex object id;
    /// anything else is [`CourierError::DecodingFailed`].
    ///
    /// Orders with a `schedule_date` go to `/schedule-order-placed`,
    /// immediate ones to `/order-placed`.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<String> {
        let path = if order.is_scheduled() {
            endpoints::SCHEDULE_ORDER_PLACED
        } else {
            endpoints::ORDER_PLACED
        };
        let id: String = self.post_json(path, order, Some(ORDER_ID_FIELD)).await?;
        if id.trim().is_empty() {
            return Err(CourierError::NoData);
        }
        if !is_object_id(&id) {
            // any JSON string decodes as `String`, including backend error text
            return Err(CourierError::DecodingFailed(format!(
                "order id is not a 24-character hex identifier: {id:?}"
            )));
        }
        info!(order_id = %id, path, "order placed");
        Ok(id)
    }

    /// Verify an order before payment; the response shape is caller-defined.
    pub async fn verify_order<B, T>(&self, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json(endpoints::VERIFY_ORDER, payload, None).await
    }

    /// Current status of an order.
    pub async fn order_status<T: DeserializeOwned>(&self, order_id: &str) -> Result<T> {
        self.fetch_item(&endpoints::order_status(order_id), Some("status"))
            .await
    }

    /// Every order placed by a user.
    pub async fn user_orders<T: DeserializeOwned>(&self, user_id: &str) -> Result<Vec<T>> {
        self.fetch_list(&endpoints::user_orders(user_id), Some("orders"))
            .await
    }

    /// Every restaurant.
    pub async fn restaurants<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.fetch_list(endpoints::ALL_RESTAURANTS, Some("restaurants"))
            .await
    }

    /// One restaurant.
    pub async fn restaurant<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        self.fetch_item(&endpoints::restaurant(id), Some("restaurant"))
            .await
    }

    /// Products of a restaurant.
    pub async fn products<T: DeserializeOwned>(&self, restaurant_id: &str) -> Result<Vec<T>> {
        self.fetch_list(&endpoints::restaurant_products(restaurant_id), Some("products"))
            .await
    }

    /// Curated picks.
    pub async fn top_picks<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.fetch_list(endpoints::TOP_PICKS, Some("topPicks"))
            .await
    }

    /// Health check. Forced, so neither cached nor rate limited.
    pub async fn ping(&self) -> Result<()> {
        self.request(&ApiRequest::get(endpoints::PING).force())
            .await
            .map(|_| ())
    }
}
