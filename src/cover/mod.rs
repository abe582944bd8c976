//! Greedy set cover over the virtual disjoint matrix.

mod driver;
mod solution;
mod totals;

pub use driver::run_cover;
pub use solution::Solution;
pub use totals::{
    add_uncovered_totals, calculate_initial_totals, get_best_attribute, subtract_covered_totals,
    N_WORDS_PER_CYCLE,
};
