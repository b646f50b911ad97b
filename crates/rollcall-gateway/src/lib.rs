//! # Rollcall Gateway
//! HTTP ingress: the Telegram webhook plus liveness endpoints.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
