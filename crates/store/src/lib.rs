//! # Librarian Store
//!
//! Narrow vector-store interface plus a JSON-backed reference
//! implementation.
//!
//! The indexing pipeline only depends on the [`VectorStore`] trait: upsert
//! all records for one file (delete-then-insert), rank records by vector
//! distance with a documented architecture-node boost, update cold-path
//! summaries, and answer bookkeeping queries. Approximate-nearest-neighbor
//! indexing is a backend concern; the bundled [`JsonVectorStore`] does an
//! exact linear scan over a schema-versioned JSON snapshot.

mod error;
mod json_store;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use json_store::JsonVectorStore;
pub use store::{VectorStore, ARCH_BOOST_FACTOR, SEARCH_OVERFETCH};
pub use types::{SearchHit, VectorRecord};
