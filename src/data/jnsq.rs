//! JNSQ disambiguation bits.
//!
//! Observations with equal attributes but different classes make the
//! class a non-function of the attributes. The JNSQ pass walks the
//! sorted, deduplicated dataset and writes a per-row inconsistency
//! counter into a fixed-width field right after the attribute bits,
//! turning each such run into distinguishable rows.
//!
//! The field is written with the class-bit width as a conservative upper
//! bound; the driver later promotes only `ceil(log2(max + 1))` bits into
//! real attributes. The bit placement (split across the word boundary,
//! value bit-reversed per sub-field) reproduces the established on-disk
//! encoding and must not change.

use crate::bits::{self, WORD_BITS};
use crate::data::Dataset;

/// Write `inconsistency` into the JNSQ field of one row.
///
/// The field starts immediately after the attribute bits and spans
/// `n_bits` bits. When it straddles a word boundary the low end of the
/// attribute-tail word takes the first sub-field and the high end of the
/// next word the rest; each sub-field wider than one bit is bit-reversed
/// before writing.
fn set_jnsq_bits(row: &mut [u64], inconsistency: u64, n_attributes: u64, n_bits: u32) {
    let attributes_last_word = (n_attributes % WORD_BITS as u64) as u32;

    let (mut word, mut free) = if attributes_last_word == 0 {
        ((n_attributes / WORD_BITS as u64) as usize, WORD_BITS as u32)
    } else {
        (
            bits::words_for(n_attributes) - 1,
            WORD_BITS as u32 - attributes_last_word,
        )
    };

    let mut value = inconsistency;
    let mut width = n_bits;

    if width > free {
        // Field splits across the word boundary.
        let field = if free > 1 {
            bits::invert_n_bits(value, free)
        } else {
            value & 1
        };
        row[word] = bits::set_bits(row[word], field, 0, free);

        value >>= free;
        width -= free;
        word += 1;
        free = WORD_BITS as u32;
    }

    let start = free - width;
    let field = if width > 1 {
        bits::invert_n_bits(value, width)
    } else {
        value & bits::mask_low(width)
    };
    row[word] = bits::set_bits(row[word], field, start, width);
}

/// Walk the sorted dataset and assign JNSQ values.
///
/// Each run of rows sharing all attribute bits gets consecutive
/// inconsistency values starting at zero. Returns the maximum value
/// written; the caller derives the promoted field width from it via
/// [`Dataset::apply_jnsq_width`].
pub fn add_jnsqs(dataset: &mut Dataset) -> u64 {
    let n_attributes = dataset.n_attributes();
    let n_bits = dataset.n_bits_for_class();
    let n_obs = dataset.n_observations();

    let mut inconsistency = 0u64;
    let mut max_inconsistency = 0u64;

    set_jnsq_bits(dataset.storage_row_mut(0), 0, n_attributes, n_bits);

    for i in 1..n_obs {
        if dataset.same_attributes(i, i - 1) {
            inconsistency += 1;
            max_inconsistency = max_inconsistency.max(inconsistency);
        } else {
            inconsistency = 0;
        }
        set_jnsq_bits(dataset.storage_row_mut(i), inconsistency, n_attributes, n_bits);
    }

    max_inconsistency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dataset_from_rows;

    fn attr_bit(ds: &Dataset, row: usize, pos: u64) -> u64 {
        let word = ds.storage_row(row)[bits::word_of(pos)];
        (word >> bits::bit_of(pos)) & 1
    }

    #[test]
    fn clean_dataset_gets_zero_jnsqs() {
        let mut ds = dataset_from_rows(&[&[1, 0], &[0, 1], &[1, 1]], &[0, 1, 1], 2);
        ds.sort_rows();
        let max = add_jnsqs(&mut ds);
        assert_eq!(max, 0);
        ds.apply_jnsq_width(max);
        assert_eq!(ds.n_bits_for_jnsq(), 0);
        assert_eq!(ds.n_attributes(), 2);
    }

    #[test]
    fn inconsistent_pair_gets_one_bit() {
        let mut ds = dataset_from_rows(&[&[1, 0], &[1, 0], &[0, 1]], &[0, 1, 1], 2);
        ds.sort_rows();
        let max = add_jnsqs(&mut ds);
        assert_eq!(max, 1);
        ds.apply_jnsq_width(max);
        assert_eq!(ds.n_bits_for_jnsq(), 1);
        assert_eq!(ds.n_attributes(), 3);

        // The second row of the equal-attribute run carries JNSQ = 1 at
        // the first position after the original attributes.
        let mut marked = 0;
        for i in 0..ds.n_observations() {
            marked += attr_bit(&ds, i, 2);
        }
        assert_eq!(marked, 1);
    }

    #[test]
    fn run_of_three_counts_up() {
        // Three rows with equal attributes across three classes.
        let mut ds = dataset_from_rows(
            &[&[1, 0], &[1, 0], &[1, 0], &[0, 1]],
            &[0, 1, 2, 2],
            3,
        );
        ds.sort_rows();
        let max = add_jnsqs(&mut ds);
        assert_eq!(max, 2);
        ds.apply_jnsq_width(max);
        assert_eq!(ds.n_bits_for_jnsq(), 2);

        // Rows of the run hold values 0, 1, 2; the value's bit i sits at
        // attribute position A + i, so 1 -> bits (1,0) and 2 -> (0,1).
        let mut seen: Vec<(u64, u64)> = (0..3)
            .map(|i| (attr_bit(&ds, i, 2), attr_bit(&ds, i, 3)))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn field_splits_across_word_boundary() {
        // 63 attributes, 4 classes (2 class bits): one free bit in the
        // first word, so a JNSQ value of 2 or 3 must spill into word 1.
        let mut a = vec![0u8; 63];
        a[5] = 1;
        let rows: Vec<&[u8]> = vec![&a, &a, &a, &a];
        let mut ds = dataset_from_rows(&rows, &[0, 1, 2, 3], 4);
        assert_eq!(ds.stride(), 2);
        ds.sort_rows();
        let max = add_jnsqs(&mut ds);
        assert_eq!(max, 3);
        ds.apply_jnsq_width(max);
        assert_eq!(ds.n_bits_for_jnsq(), 2);
        assert_eq!(ds.n_attributes(), 65);

        // Value bit 0 lands at position 63 (word 0, bit 0), value bit 1
        // at position 64 (word 1, bit 63). Rows carry 0..=3 in order of
        // class, so positions decode back to the counter values.
        let decoded: Vec<u64> = (0..4)
            .map(|i| attr_bit(&ds, i, 63) | (attr_bit(&ds, i, 64) << 1))
            .collect();
        assert_eq!(decoded, vec![0, 1, 2, 3]);
    }

    #[test]
    fn jnsq_makes_attribute_projection_injective() {
        let mut ds = dataset_from_rows(
            &[&[1, 0], &[1, 0], &[0, 1], &[0, 1]],
            &[0, 1, 0, 1],
            2,
        );
        ds.sort_rows();
        assert_eq!(ds.remove_duplicates(), 0);
        let max = add_jnsqs(&mut ds);
        ds.apply_jnsq_width(max);

        // No two rows may now agree on all promoted attribute bits.
        for i in 0..ds.n_observations() {
            for j in 0..i {
                assert!(!ds.same_attributes(i, j), "rows {i} and {j} collide");
            }
        }
    }
}
