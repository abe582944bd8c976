//! laid: distributed attribute selection over bit-packed observation
//! matrices.
//!
//! Given a dataset of boolean observations partitioned into classes, the
//! engine selects a small attribute subset that distinguishes every pair
//! of observations drawn from different classes. Selection is a greedy
//! set cover over a virtual "disjoint matrix" whose rows are the XORs of
//! all cross-class observation pairs; the matrix is regenerated on
//! demand rather than stored, and the cover loop runs bulk-synchronously
//! across a group of ranks sharing one in-node dataset copy.

pub mod bits;
pub mod cover;
pub mod data;
pub mod dist;
pub mod logger;
pub mod matrix;
pub mod run;
pub mod testing;

pub use cover::{run_cover, Solution};
pub use data::{ClassIndex, Dataset, DatasetError, ReadError};
pub use dist::{Communicator, SingleProcess};
pub use logger::{RunLogger, Verbosity};
pub use run::{execute, prepare_dataset, RunConfig, RunConfigBuilder, RunError, RunOutcome};
