//! Domain models for the storefront.

pub mod cart;
pub mod order;
pub mod product;
pub mod report;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartView};
pub use order::{
    NewOrder, Order, OrderFilter, OrderItem, OrderLineRequest, OrderOutcome, PaymentUpdate,
    ReservedLine, ShippingDetails,
};
pub use product::{NewProduct, Page, Pagination, Product, ProductFilter, ProductSort, ProductUpdate};
pub use report::{DailySales, DashboardSummary, LowStockProduct, OrderSummary, SalesReport, TopProduct};
pub use session::CurrentUser;
pub use user::{NewUser, User, UserCredentials};
