//! The per-round cover state machine.
//!
//! Every round: reduce local attribute totals to the root, pick the
//! attribute covering the most uncovered lines, broadcast it, and let
//! each rank fold the newly covered lines out of its slice. Two update
//! strategies keep the fold proportional to the smaller side: rescan the
//! surviving uncovered lines (add) or retract the just-covered ones
//! (subtract).
//!
//! Ranks holding an empty slice never leave the loop early; the
//! reduction needs their zero vectors every round.

use crate::bits::{self, WORD_BITS};
use crate::cover::solution::Solution;
use crate::cover::totals::{
    add_uncovered_totals, calculate_initial_totals, get_best_attribute, subtract_covered_totals,
};
use crate::data::{ClassIndex, Dataset};
use crate::dist::partition::Block;
use crate::dist::Communicator;
use crate::logger::RunLogger;
use crate::matrix::{generate_column, ClassPairs};

/// Root-only reduction state.
struct RootState {
    global_totals: Vec<u64>,
    solution: Solution,
    uncovered: u64,
}

#[inline]
fn or_into(dst: &mut [u64], src: &[u64]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d |= s;
    }
}

#[inline]
fn andnot_into(dst: &mut [u64], mask: &[u64]) {
    for (d, &m) in dst.iter_mut().zip(mask) {
        *d &= !m;
    }
}

/// Run the greedy cover over this rank's slice of the matrix.
///
/// All ranks of `comm` must call this with the same dataset and their
/// own [`Block`]. Returns the solution on the root, `None` elsewhere.
pub fn run_cover<C: Communicator>(
    comm: &C,
    dataset: &Dataset,
    index: &ClassIndex,
    slice: Block,
    logger: &RunLogger,
) -> Option<Solution> {
    let pairs = ClassPairs::new(index);
    let n_lines = pairs.total_lines();
    assert!(
        slice.low + slice.size <= n_lines,
        "slice [{}, {}) exceeds the {} matrix lines",
        slice.low,
        slice.low + slice.size,
        n_lines
    );

    let n_attributes = dataset.n_attributes() as usize;
    let column_words = bits::words_for(slice.size);

    let mut totals = vec![0u64; dataset.n_words() * WORD_BITS];
    let mut covered = vec![0u64; column_words];
    let mut best_column = vec![0u64; column_words];
    let mut local_uncovered = slice.size;

    let start = (slice.size > 0).then(|| pairs.cursor_at(slice.low));

    let mut root = comm.is_root().then(|| RootState {
        global_totals: vec![0u64; n_attributes],
        solution: Solution::new(dataset.n_attributes()),
        uncovered: n_lines,
    });

    if let Some(start) = start {
        calculate_initial_totals(dataset, &pairs, start, slice.size, &mut totals);
    }

    let mut round = 0usize;
    loop {
        round += 1;

        comm.reduce_sum(
            &totals[..n_attributes],
            root.as_mut().map(|r| r.global_totals.as_mut_slice()),
        );

        let proposed = match &root {
            Some(r) if r.uncovered == 0 => -1,
            Some(r) => get_best_attribute(&r.global_totals),
            None => 0,
        };
        let best = comm.broadcast_best(proposed);
        if best < 0 {
            break;
        }

        if let Some(r) = root.as_mut() {
            let covers = r.global_totals[best as usize];
            r.solution.mark(best as u64);
            r.uncovered = r
                .uncovered
                .checked_sub(covers)
                .expect("covered more lines than remained uncovered");
            logger.round(round, best, covers);
        }

        let Some(start) = start else {
            continue;
        };

        let newly = totals[best as usize];
        local_uncovered -= newly;
        if local_uncovered == 0 {
            // Slice exhausted; stay in the loop feeding zero vectors.
            totals.fill(0);
            continue;
        }

        generate_column(dataset, &pairs, start, slice.size, best as u64, &mut best_column);

        if local_uncovered < newly {
            or_into(&mut covered, &best_column);
            add_uncovered_totals(dataset, &pairs, start, slice.size, &covered, &mut totals);
        } else {
            andnot_into(&mut best_column, &covered);
            subtract_covered_totals(dataset, &pairs, start, slice.size, &best_column, &mut totals);
            or_into(&mut covered, &best_column);
        }
    }

    root.map(|r| r.solution)
}
