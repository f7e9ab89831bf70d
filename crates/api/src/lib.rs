//! HTTP API: job console server, routing, and request/response mapping.

pub mod app;
pub mod config;
