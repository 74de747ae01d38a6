//! Fluffy Bites Core - Shared types library.
//!
//! This crate provides common types used across all Fluffy Bites components:
//! - `server` - Public ordering API (catalog, checkout, webhooks)
//! - `cli` - Command-line tools for inspecting orders and the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and conversions - no I/O, no HTTP
//! clients, no payment-provider calls. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Carts, money conversion, orders, and catalog products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
