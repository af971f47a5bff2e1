//! Authentication module for credentials and per-run session data.
//!
//! This module provides:
//! - `Credentials`: username/password resolved from the environment, a
//!   credentials file, or the OS keychain
//! - `CredentialStore`: secure OS-level credential storage via keyring
//! - `SessionData`: the authenticated portal context for a single run
//!
//! Sessions are never persisted; every invocation logs in from scratch.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use session::SessionData;
