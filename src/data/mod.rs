//! Dataset storage and preparation.
//!
//! A dataset is a flat array of bit-packed observation rows. Preparation
//! sorts the rows, removes duplicates, indexes observations by class and
//! appends JNSQ disambiguation bits so that no two observations share
//! every attribute while carrying different classes.

mod dataset;
pub mod jnsq;
pub mod reader;

pub use dataset::{ClassIndex, Dataset, DatasetError};
pub use reader::{read_container, write_container, ReadError};
