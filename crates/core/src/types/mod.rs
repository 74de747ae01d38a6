//! Core types for Fluffy Bites.
//!
//! This module provides the domain vocabulary shared by the server and CLI:
//! carts as submitted by the site, money conversion between display prices
//! and payment-provider minor units, persisted orders, and catalog products.

mod cart;
mod money;
mod order;
mod product;

pub use cart::{CART_METADATA_KEY, Cart, CartError, CartItem, CartSnapshot};
pub use money::{CurrencyCode, CurrencyParseError, from_minor_units, to_minor_units};
pub use order::{Order, OrderStatus, ShippingAddress};
pub use product::{Catalog, CatalogMetadata, Product};
