//! HTTP client module for the my.adp.com employee portal.
//!
//! The portal publishes no API contract; `PortalClient` mirrors the request
//! sequence the portal's own browser front-end was observed to issue, with
//! the session carried entirely in cookies the way SiteMinder expects.

pub mod client;
pub mod error;

pub use client::PortalClient;
pub use error::ApiError;
