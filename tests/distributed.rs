//! Multi-rank runs must behave exactly like a single rank.

use laid::cover::run_cover;
use laid::dist::partition;
use laid::dist::thread::{ThreadComm, ThreadCommCore};
use laid::dist::Communicator;
use laid::matrix::ClassPairs;
use laid::run::prepare_dataset;
use laid::testing::{dataset_from_rows, random_dataset};
use laid::{Dataset, RunLogger, Solution};

/// Cover a prepared dataset with `ranks` thread-backed ranks.
fn cover_with_ranks(dataset: &Dataset, ranks: usize) -> Solution {
    let prepared = prepare_dataset(dataset.clone(), &RunLogger::disabled()).unwrap();
    let n_lines = ClassPairs::new(&prepared.index).total_lines();

    let core = ThreadCommCore::new(ranks);
    let prepared = &prepared;
    crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..ranks)
            .map(|rank| {
                let comm = ThreadComm::new(core.clone(), rank);
                s.spawn(move |_| {
                    let slice = partition::block(comm.rank(), comm.size(), n_lines);
                    run_cover(
                        &comm,
                        &prepared.dataset,
                        &prepared.index,
                        slice,
                        &RunLogger::disabled(),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .next()
            .expect("root rank produced no solution")
    })
    .unwrap()
}

#[test]
fn rank_counts_agree_on_the_solution() {
    let ds = random_dataset(30, 24, 3, 1234);
    let single = cover_with_ranks(&ds, 1);
    for ranks in [2, 3, 5] {
        let multi = cover_with_ranks(&ds, ranks);
        assert_eq!(multi, single, "{ranks} ranks diverged from single rank");
    }
}

#[test]
fn empty_slices_complete_the_cover() {
    // Five observations of class 0 against a singleton class 1 make a
    // 5-line matrix; over 8 ranks three of the slices are empty.
    let ds = dataset_from_rows(
        &[
            &[1, 0, 0],
            &[0, 1, 0],
            &[0, 0, 1],
            &[1, 1, 0],
            &[1, 0, 1],
            &[1, 1, 1],
        ],
        &[0, 0, 0, 0, 0, 1],
        2,
    );
    let single = cover_with_ranks(&ds, 1);
    let wide = cover_with_ranks(&ds, 8);
    assert_eq!(wide, single);
}

#[test]
fn more_ranks_than_two_class_lines() {
    // N=2, K=2: exactly one matrix line; ranks 1..7 are all empty.
    let ds = dataset_from_rows(&[&[1, 0], &[0, 1]], &[0, 1], 2);
    let solution = cover_with_ranks(&ds, 8);
    assert!(solution.len() >= 1);
}

#[test]
fn skewed_class_sizes_agree_across_ranks() {
    // One big class against several small ones produces a lopsided pair
    // distribution over the rank slices.
    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut classes = Vec::new();
    for i in 0..12u8 {
        rows.push((0..6).map(|b| (i >> b) & 1).collect());
        classes.push(0);
    }
    for i in 0..4u8 {
        rows.push((0..6).map(|b| ((i + 40) >> b) & 1).collect());
        classes.push(1 + (i as u64 % 3));
    }
    let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
    let ds = dataset_from_rows(&refs, &classes, 4);

    let single = cover_with_ranks(&ds, 1);
    let multi = cover_with_ranks(&ds, 6);
    assert_eq!(multi, single);
}
