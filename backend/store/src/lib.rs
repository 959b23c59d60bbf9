//! Order records: one JSON document per order, pages of numbered lines,
//! each line holding the letter values of one catalog shape.

pub mod keys;
pub mod record;
pub mod store;

pub use keys::{LineKey, PageKey};
pub use record::{OrderLine, OrderRecord};
pub use store::{validate_order_id, OrderStore};
