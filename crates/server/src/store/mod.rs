//! Order persistence.
//!
//! One JSON document per order under `<data_dir>/orders/`, keyed by checkout
//! session id. No database: the cafe's order volume is a handful a day, and
//! a directory of files is trivially inspectable and backed up.

mod orders;

pub use orders::{OrderStore, StoreError};
