//! Run orchestration: wiring the reader, preparation, partitioning and
//! the cover loop across a group of ranks.
//!
//! The node root reads and prepares the dataset while its peers wait at
//! the sharing barrier; from there every rank owns a slice of the
//! virtual matrix and the run proceeds in bulk-synchronous rounds. With
//! `ranks == 1` no threads are spawned at all.

use std::path::PathBuf;

use derive_builder::Builder;

use crate::cover::{run_cover, Solution};
use crate::data::{jnsq, reader, ClassIndex, Dataset, DatasetError, ReadError};
use crate::dist::thread::{ThreadComm, ThreadCommCore};
use crate::dist::{partition, Communicator, SingleProcess};
use crate::logger::{RunLogger, Verbosity};
use crate::matrix::ClassPairs;

/// Errors surfaced by a full run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to read dataset: {0}")]
    Read(#[from] ReadError),

    #[error("dataset preparation failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("rank count must be at least 1")]
    NoRanks,
}

/// Configuration of one run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RunConfig {
    /// Container file holding the dataset.
    pub filename: PathBuf,

    /// Dataset name within the container.
    #[builder(default = "String::from(\"dataset\")")]
    pub dataset: String,

    /// Number of ranks to run.
    #[builder(default = "1")]
    pub ranks: usize,

    /// Progress verbosity (root rank only).
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Preparation statistics reported by the node root.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepStats {
    /// Rows dropped as exact duplicates.
    pub duplicates_removed: usize,

    /// Highest inconsistency counter encountered.
    pub max_inconsistency: u64,

    /// Attribute bits added by JNSQ promotion.
    pub jnsq_bits: u32,
}

/// The immutable dataset shared by all ranks of a node after setup.
#[derive(Debug)]
pub struct PreparedDataset {
    pub dataset: Dataset,
    pub index: ClassIndex,
    pub stats: PrepStats,
}

/// Result of a run, produced on the root rank.
#[derive(Debug)]
pub struct RunOutcome {
    /// The selected attributes.
    pub solution: Solution,

    /// Preparation statistics.
    pub stats: PrepStats,

    /// Attribute count after JNSQ promotion.
    pub n_attributes: u64,

    /// Matrix line count.
    pub n_matrix_lines: u64,
}

/// Sort, deduplicate, index and JNSQ-disambiguate a raw dataset.
pub fn prepare_dataset(
    mut dataset: Dataset,
    logger: &RunLogger,
) -> Result<PreparedDataset, DatasetError> {
    logger.phase(&format!(
        "Dataset: {} observations, {} attributes, {} classes",
        dataset.n_observations(),
        dataset.n_attributes(),
        dataset.n_classes()
    ));

    dataset.sort_rows();
    let duplicates_removed = dataset.remove_duplicates();
    logger.phase(&format!("Removed {duplicates_removed} duplicate observation(s)"));

    let index = ClassIndex::build(&dataset)?;
    for (class, &count) in index.counts().iter().enumerate() {
        logger.detail(&format!("  class {class}: {count} observation(s)"));
    }

    let max_inconsistency = jnsq::add_jnsqs(&mut dataset);
    dataset.apply_jnsq_width(max_inconsistency);
    logger.phase(&format!(
        "Max JNSQ: {max_inconsistency} [{} bit(s)]",
        dataset.n_bits_for_jnsq()
    ));

    let stats = PrepStats {
        duplicates_removed,
        max_inconsistency,
        jnsq_bits: dataset.n_bits_for_jnsq(),
    };
    Ok(PreparedDataset {
        dataset,
        index,
        stats,
    })
}

/// Load, prepare and cover the configured dataset.
///
/// Returns the root rank's outcome; rank worker panics (invariant
/// breaches) propagate.
pub fn execute(config: &RunConfig) -> Result<RunOutcome, RunError> {
    match config.ranks {
        0 => Err(RunError::NoRanks),
        1 => {
            let outcome = worker(&SingleProcess, config)?;
            Ok(outcome.expect("single rank is the root"))
        }
        ranks => {
            let core = ThreadCommCore::new(ranks);
            let results = crossbeam::thread::scope(|s| {
                let handles: Vec<_> = (0..ranks)
                    .map(|rank| {
                        let comm = ThreadComm::new(core.clone(), rank);
                        s.spawn(move |_| worker(&comm, config))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(result) => result,
                        Err(payload) => std::panic::resume_unwind(payload),
                    })
                    .collect::<Vec<_>>()
            })
            .expect("rank threads panicked");

            let mut outcome = None;
            for result in results {
                match result {
                    Ok(Some(o)) => outcome = Some(o),
                    Ok(None) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(outcome.expect("root rank produced no outcome"))
        }
    }
}

/// One rank's share of a run.
fn worker<C: Communicator>(comm: &C, config: &RunConfig) -> Result<Option<RunOutcome>, RunError> {
    let logger = RunLogger::new(config.verbosity, comm.is_root());

    let prepared = if comm.is_node_root() {
        let loaded = reader::read_container(&config.filename, &config.dataset)
            .map_err(RunError::from)
            .and_then(|raw| prepare_dataset(raw, &logger).map_err(RunError::from));
        match loaded {
            Ok(prepared) => comm.share_dataset(Some(prepared)),
            Err(e) => {
                // Release peers waiting at the sharing barrier.
                comm.share_dataset(None);
                return Err(e);
            }
        }
    } else {
        comm.share_dataset(None)
    };
    let Some(prepared) = prepared else {
        // The node root aborted; nothing to do on this rank.
        return Ok(None);
    };

    let n_matrix_lines = ClassPairs::new(&prepared.index).total_lines();
    let slice = partition::block(comm.rank(), comm.size(), n_matrix_lines);

    if comm.is_root() {
        logger.phase(&format!("Disjoint matrix: {n_matrix_lines} lines"));
        for rank in 0..comm.size() {
            let b = partition::block(rank, comm.size(), n_matrix_lines);
            if b.size > 0 {
                logger.detail(&format!(
                    "  rank {rank} generates {} lines [{} -> {}]",
                    b.size,
                    b.low,
                    b.low + b.size - 1
                ));
            } else {
                logger.detail(&format!("  rank {rank} generates 0 lines"));
            }
        }
    }

    let solution = run_cover(comm, &prepared.dataset, &prepared.index, slice, &logger);

    Ok(solution.map(|solution| RunOutcome {
        solution,
        stats: prepared.stats,
        n_attributes: prepared.dataset.n_attributes(),
        n_matrix_lines,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_defaults() {
        let config = RunConfigBuilder::default()
            .filename("data.ldc")
            .build()
            .unwrap();
        assert_eq!(config.dataset, "dataset");
        assert_eq!(config.ranks, 1);
        assert_eq!(config.verbosity, Verbosity::Summary);
    }

    #[test]
    fn config_builder_requires_filename() {
        assert!(RunConfigBuilder::default().build().is_err());
    }

    #[test]
    fn zero_ranks_is_rejected() {
        let config = RunConfigBuilder::default()
            .filename("data.ldc")
            .ranks(0usize)
            .build()
            .unwrap();
        assert!(matches!(execute(&config), Err(RunError::NoRanks)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let config = RunConfigBuilder::default()
            .filename("/nonexistent/data.ldc")
            .build()
            .unwrap();
        assert!(matches!(execute(&config), Err(RunError::Read(_))));
    }
}
