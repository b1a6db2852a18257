//! Aurelia Core - Shared domain types.
//!
//! This crate provides common types used across all Aurelia components:
//! - `storefront` - JSON API for the catalog, cart, checkout and admin dashboard
//! - `cli` - Command-line tools for migrations, seeding and admin users
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`pricing`] - Order total calculation and shipping policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{OrderTotals, PricedLine, ShippingPolicy};
pub use types::*;
