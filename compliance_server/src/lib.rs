//! # Seller compliance server
//! This crate hosts the HTTP surface over the compliance engine. It is responsible for:
//! * Verifying the gateway-signed identity on every `/api` request and enforcing role ACLs.
//! * Translating HTTP requests into engine API calls and engine errors into status codes.
//! * Exposing the cron endpoints that drive the scheduled sweeps.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
