/// State management module
///
/// This module handles all item state, including:
/// - Incoming item bundles and identities (data.rs)
/// - Sparse attribute edits (edit.rs)
/// - Per-item render records and their transitions (record.rs)
/// - The ordered collection of records (collection.rs)

pub mod collection;
pub mod data;
pub mod edit;
pub mod record;
