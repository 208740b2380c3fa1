//! Endpoint paths of the backend REST surface.
//!
//! Paths are used verbatim as rate-limit, cache and gate keys, so build
//! them here rather than by hand to keep keys consistent.

pub const ALL_RESTAURANTS: &str = "/get_All_Restaurant";
pub const TOP_PICKS: &str = "/top-picks";
pub const ORDER_PLACED: &str = "/order-placed";
pub const SCHEDULE_ORDER_PLACED: &str = "/schedule-order-placed";
pub const VERIFY_ORDER: &str = "/verify-order";
pub const PING: &str = "/ping";

pub fn restaurant(id: &str) -> String {
    format!("/get_Restaurant/{id}")
}

pub fn restaurant_photo(id: &str) -> String {
    format!("/get_restaurant_photo/{id}")
}

pub fn restaurant_products(restaurant_id: &str) -> String {
    format!("/get_all_product/{restaurant_id}")
}

pub fn product_photo(id: &str) -> String {
    format!("/get_product_photo/{id}")
}

pub fn order_status(order_id: &str) -> String {
    format!("/order-status/{order_id}")
}

pub fn user_orders(user_id: &str) -> String {
    format!("/get-UserOrder/{user_id}")
}
