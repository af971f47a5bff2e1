//! Library crate for adp-fetch.
//!
//! The binary in `main.rs` is a thin CLI over these modules; keeping them in
//! a library target lets the integration tests drive the full fetch sequence
//! against a stub portal.

pub mod api;
pub mod auth;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod store;
