//! Command-line client for a FieldSight server.
//!
//! [`client::ApiClient`] speaks the JSON API, [`context::AppContext`] holds
//! the signed-in session and [`commands`] implements each subcommand on top
//! of both.

pub mod client;
pub mod commands;
pub mod config;
pub mod context;

#[cfg(test)]
mod tests;
