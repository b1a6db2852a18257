//! Aurelia Storefront library.
//!
//! The JSON API behind the jewelry storefront: catalog, multilingual search,
//! carts, idempotent checkout, simulated payments, PDF receipts and the admin
//! dashboard. Exposed as a library so the binary, the CLI and the integration
//! tests share one router and one storage layer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;

pub use config::StorefrontConfig;
pub use routes::build_router;
pub use state::AppState;
