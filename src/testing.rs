//! Dataset builders shared by unit and integration tests.

use rand::prelude::*;

use crate::bits;
use crate::data::Dataset;

/// Pack explicit attribute rows and classes into a dataset.
///
/// Each row is a slice of 0/1 attribute values; classes index into
/// `0..n_classes`. Rows are packed MSB-first with the class value in the
/// low bits of the final word, exactly the container layout.
pub fn dataset_from_rows(attr_rows: &[&[u8]], classes: &[u64], n_classes: u64) -> Dataset {
    assert_eq!(attr_rows.len(), classes.len());
    let n_attributes = attr_rows[0].len() as u64;
    let class_bits = bits::bits_for_value(n_classes - 1).max(1);
    let stride = bits::words_for(n_attributes + class_bits as u64);

    let mut data = Vec::with_capacity(attr_rows.len() * stride);
    for (row, &class) in attr_rows.iter().zip(classes) {
        assert_eq!(row.len() as u64, n_attributes);
        assert!(class < n_classes);
        let mut words = vec![0u64; stride];
        for (j, &v) in row.iter().enumerate() {
            assert!(v <= 1);
            if v == 1 {
                bits::set_bit(&mut words[bits::word_of(j as u64)], bits::bit_of(j as u64));
            }
        }
        words[stride - 1] |= class;
        data.extend_from_slice(&words);
    }

    Dataset::from_parts(data, attr_rows.len() as u64, n_attributes, n_classes).unwrap()
}

/// Random dataset with uniform attribute bits and classes.
pub fn random_dataset(n_obs: usize, n_attributes: u64, n_classes: u64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<u8>> = (0..n_obs)
        .map(|_| (0..n_attributes).map(|_| rng.gen_range(0..=1u8)).collect())
        .collect();
    // Every class gets at least one observation so pair counts are
    // never degenerate.
    let classes: Vec<u64> = (0..n_obs)
        .map(|i| {
            if (i as u64) < n_classes {
                i as u64
            } else {
                rng.gen_range(0..n_classes)
            }
        })
        .collect();

    let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
    dataset_from_rows(&refs, &classes, n_classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_matches_layout() {
        let ds = dataset_from_rows(&[&[1, 0, 1], &[0, 0, 0]], &[1, 0], 2);
        assert_eq!(ds.row(0)[0] >> 61, 0b101);
        assert_eq!(ds.class_of(0), 1);
        assert_eq!(ds.class_of(1), 0);
    }

    #[test]
    fn random_dataset_populates_every_class() {
        let ds = random_dataset(16, 6, 4, 99);
        let mut seen = [false; 4];
        for i in 0..ds.n_observations() {
            seen[ds.class_of(i) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
