//! Read-side views over the record store.
//!
//! Views hold an in-memory collection fetched through the store and keep it
//! current through shallow merges of successful card writes, so a save never
//! forces a refetch of the whole collection.

pub mod detail;
pub mod list;

pub use detail::EnginDetail;
pub use list::{ListQuery, ListView};
