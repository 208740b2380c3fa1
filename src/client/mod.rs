//! API client: request description, dispatch pipeline and builder.
//!
//! [`ApiClient`] is the single entry point for backend calls. Build one with
//! [`Courier::builder`] or [`Courier::from_config`].

mod builder;
mod dispatcher;
mod request;

pub use builder::{Courier, CourierBuilder, CourierClient};
pub use dispatcher::{ApiClient, Origins};
pub use request::ApiRequest;
