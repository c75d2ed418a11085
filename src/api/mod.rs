//! HTTP API for playing crash rounds
//!
//! JSON endpoints over per-player sessions identified by the `x-session-id`
//! header.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{create_app, ApiServer};
