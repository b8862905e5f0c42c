//! Data-transfer records mirrored from the REST backend.
//!
//! Each record is flat and owned by the server; the storefront only reads
//! them, caches them and patches cached copies after a successful mutation.

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod review;
pub mod user;
pub mod wishlist;

pub use analytics::{AnalyticsSnapshot, DailyRevenue, StatusCount, TopProduct};
pub use cart::{Cart, CartLine, FREE_SHIPPING_THRESHOLD_CENTS, FLAT_SHIPPING_CENTS};
pub use catalog::{Category, Product, Vendor};
pub use notification::Notification;
pub use order::{Address, Order, OrderItem};
pub use review::Review;
pub use user::{AuthSession, User};
pub use wishlist::Wishlist;
