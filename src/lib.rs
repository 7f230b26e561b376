//! Request-authorization guard for the coffee shop API.
//!
//! Verifies provider-issued bearer tokens against the provider's published
//! signing keys and enforces the permission each protected operation needs.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
