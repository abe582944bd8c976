//! Bit-parallel attribute discrimination totals.
//!
//! `totals[j]` counts the uncovered matrix lines whose pair differs in
//! attribute `j`. The three entry points share one hot loop: XOR the two
//! observation rows word by word and bucket every set bit by position.
//! Words are processed in groups of [`N_WORDS_PER_CYCLE`] with the pair
//! walk as the inner loop, so each group of row words stays cache-hot
//! across the whole slice.
//!
//! Totals arrays are sized `n_words * 64`, letting the bit loop run the
//! full word without a tail check. Positions past the attribute count
//! may accumulate counts from the class tail sharing the last word;
//! the argmax never scans them.

use crate::bits::{self, WORD_BITS};
use crate::data::Dataset;
use crate::matrix::{ClassPairs, PairCursor};

/// Word-group width of the totals loops.
pub const N_WORDS_PER_CYCLE: usize = 8;

#[inline]
fn line_is_set(mask: &[u64], position: u64) -> bool {
    bits::bit_is_set(mask[(position / WORD_BITS as u64) as usize], 63 - (position % WORD_BITS as u64) as u32)
}

/// Compute totals over every line of the slice.
///
/// Resets `totals` first; equivalent to [`add_uncovered_totals`] with an
/// empty covered mask.
pub fn calculate_initial_totals(
    dataset: &Dataset,
    pairs: &ClassPairs<'_>,
    start: PairCursor,
    s_size: u64,
    totals: &mut [u64],
) {
    totals.fill(0);
    accumulate(dataset, pairs, start, s_size, totals, |_| true, false);
}

/// Recompute totals over the uncovered lines of the slice.
///
/// Resets `totals`, then walks every pair whose `covered` bit is clear.
pub fn add_uncovered_totals(
    dataset: &Dataset,
    pairs: &ClassPairs<'_>,
    start: PairCursor,
    s_size: u64,
    covered: &[u64],
    totals: &mut [u64],
) {
    totals.fill(0);
    accumulate(
        dataset,
        pairs,
        start,
        s_size,
        totals,
        |p| !line_is_set(covered, p),
        false,
    );
}

/// Subtract the contributions of newly covered lines from `totals`.
///
/// Walks only the pairs whose `newly_covered` bit is set, decrementing
/// their attribute buckets. The mask must not include lines that were
/// already subtracted before, or the totals would go negative.
pub fn subtract_covered_totals(
    dataset: &Dataset,
    pairs: &ClassPairs<'_>,
    start: PairCursor,
    s_size: u64,
    newly_covered: &[u64],
    totals: &mut [u64],
) {
    accumulate(
        dataset,
        pairs,
        start,
        s_size,
        totals,
        |p| line_is_set(newly_covered, p),
        true,
    );
}

/// Shared tiled accumulation loop.
fn accumulate<F: Fn(u64) -> bool>(
    dataset: &Dataset,
    pairs: &ClassPairs<'_>,
    start: PairCursor,
    s_size: u64,
    totals: &mut [u64],
    include: F,
    subtract: bool,
) {
    let n_words = dataset.n_words();
    debug_assert!(totals.len() >= n_words * WORD_BITS);

    let mut group_start = 0;
    while group_start < n_words {
        let group_end = (group_start + N_WORDS_PER_CYCLE).min(n_words);

        for (p, (a, b)) in pairs.iter_from(start, s_size).enumerate() {
            if !include(p as u64) {
                continue;
            }
            let ra = dataset.row(a as usize);
            let rb = dataset.row(b as usize);

            for w in group_start..group_end {
                let lxor = ra[w] ^ rb[w];
                let base = w * WORD_BITS;
                if subtract {
                    for bit in 0..WORD_BITS {
                        totals[base + bit] -= (lxor >> (WORD_BITS - 1 - bit)) & 1;
                    }
                } else {
                    for bit in 0..WORD_BITS {
                        totals[base + bit] += (lxor >> (WORD_BITS - 1 - bit)) & 1;
                    }
                }
            }
        }

        group_start = group_end;
    }
}

/// Index of the highest total, scanning ascending so ties resolve to the
/// lowest attribute. Returns -1 when no attribute covers anything.
pub fn get_best_attribute(totals: &[u64]) -> i64 {
    let mut max_total = 0u64;
    let mut best = -1i64;
    for (i, &t) in totals.iter().enumerate() {
        if t > max_total {
            max_total = t;
            best = i as i64;
        }
    }
    best
}
