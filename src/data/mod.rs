//! Labelled composition tables.

pub mod table;

pub use table::CompositionTable;
