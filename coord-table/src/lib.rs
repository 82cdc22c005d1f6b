//! Coordinate tables of previously identified glyph outlines.
//!
//! A coordinate table is a list of facts of the form "a glyph drawn with
//! this raw point sequence depicts this character". Tables are learned over
//! time, so this crate also provides the reconciliation between a bundled
//! baseline and a locally grown table ([`merge_table`], [`deduplicate`]) and
//! an append-only [`FactStore`] for persisting them.

#![forbid(unsafe_code)]

mod error;
mod outline;
mod store;
mod table;

pub use error::TableError;
pub use outline::{Outline, Point, DEFAULT_FUZZ};
pub use store::{
    append_facts, read_table, reconcile, write_table, FactStore, JsonFileStore, MemoryStore,
};
pub use table::{deduplicate, merge_table, CoordFact, CoordTable, PLACEHOLDER};
