//! The live content buffer and the undo/redo history over its snapshots.

pub mod document;
pub mod history;

pub use document::{Cmd, Document, MarkerSpan, Patch};
pub use history::History;
