//! The virtual disjoint matrix.
//!
//! The disjoint matrix has one row per cross-class observation pair and
//! one column per attribute; a bit is set where the pair's observations
//! differ in that attribute. The matrix is never materialized: any line
//! or column is regenerated on demand by XOR-ing the two dataset rows
//! named by the pair enumerator.

mod column;
mod pairs;

pub use column::{generate_column, generate_line};
pub use pairs::{ClassPairs, PairCursor, PairRowIter};
