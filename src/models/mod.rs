//! Domain models for portal data.

pub mod statement;

pub use statement::PayStatement;
