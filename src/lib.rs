//! Courier - Resilient access layer for a food-ordering REST backend
//!
//! Every backend call goes through one [`ApiClient`], which applies a fixed
//! pipeline: response cache, per-endpoint rate limiting, a per-endpoint
//! concurrency cap, retry of transient transport failures, and failover
//! from the primary to the secondary origin when the primary answers 503.
//!
//! Images are served by a separate [`ImageLoader`] with a memory tier, a
//! disk tier, a list of fallback origins and a placeholder of last resort.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier::{Courier, OrderItem, OrderRequest};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Restaurant {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> courier::Result<()> {
//!     let client = Courier::builder()
//!         .primary("https://api.example.com")
//!         .secondary("https://backup.example.com")
//!         .build()?;
//!
//!     let restaurants: Vec<Restaurant> = client.api().restaurants().await?;
//!     for r in &restaurants {
//!         println!("{} {}", r.id, r.name);
//!     }
//!
//!     let order_id = client
//!         .api()
//!         .place_order(&OrderRequest {
//!             restaurant_id: restaurants[0].id.clone(),
//!             user_id: "u1".into(),
//!             items: vec![OrderItem {
//!                 product_id: "p1".into(),
//!                 name: "Pav Bhaji".into(),
//!                 quantity: 1,
//!                 price: 80.0,
//!             }],
//!             price: "80".into(),
//!             take_away: true,
//!             schedule_date: None,
//!         })
//!         .await?;
//!     println!("placed {order_id}");
//!
//!     let logo = client
//!         .images()
//!         .load_image("https://api.example.com/get_restaurant_photo/abc")
//!         .await;
//!     println!("{}x{}", logo.width(), logo.height());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod images;
pub mod policy;
pub mod resilience;
pub mod telemetry;
pub mod transport;

// Re-export main types at crate root
pub use api::{OrderItem, OrderRequest};
pub use cache::{CacheConfig, ResponseCache};
pub use client::{ApiClient, ApiRequest, Courier, CourierBuilder, CourierClient, Origins};
pub use config::ClientConfig;
pub use error::{CourierError, NetworkErrorKind, Result};
pub use images::{CleanupReport, ImageLoader, LoadedImage};
pub use policy::{EndpointPolicies, EndpointRule};
pub use resilience::{Origin, RetryConfig};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
