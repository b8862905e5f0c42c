//! Emporium Core - shared data model for the storefront and console.
//!
//! The storefront crate renders every view from these types:
//! - customer pages (catalog, cart, wishlists, checkout, orders)
//! - vendor pages (own products, own orders, sales dashboard)
//! - admin pages (users, orders, review moderation, analytics)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no sessions. The REST backend is the source of truth; everything
//! here mirrors its JSON shapes or computes view state from them.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, money, emails and status enums
//! - [`models`] - DTOs mirrored from REST responses
//! - [`pagination`] - Page number to offset/limit math
//! - [`validation`] - Inline form validation
//! - [`catalog`] - Client-side product post-filters and sorting
//! - [`bulk`] - Outcome accounting for sequential bulk actions
//! - [`selection`] - Row selection for bulk actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bulk;
pub mod catalog;
pub mod models;
pub mod pagination;
pub mod selection;
pub mod types;
pub mod validation;

pub use types::*;
