//! Core types and trait definitions for FieldSight site reporting.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod carry_over;
pub mod entry;
pub mod error;
pub mod live;
pub mod manpower;
pub mod profile;
pub mod record;
pub mod store;
pub mod table;
pub mod task;

pub use error::{Error, Result};
