//! Business logic services for the storefront.
//!
//! Services borrow a store (anything implementing the relevant `db` traits)
//! and hold the validation and rules that sit between HTTP handlers and
//! storage.
//!
//! # Services
//!
//! - `auth` - Registration, login and password hashing
//! - `cart` - Per-user cart with stock checks
//! - `orders` - Checkout, cancellation and status changes
//! - `payment` - Simulated card processor
//! - `receipt` - PDF receipts
//! - `reports` - Admin dashboard figures

pub mod auth;
pub mod cart;
pub mod orders;
pub mod payment;
pub mod receipt;
pub mod reports;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use orders::{CheckoutRequest, OrderError, OrderService};
pub use payment::{CardDetails, PaymentError, PaymentSimulator};
pub use reports::{ReportError, ReportService};
