//! On-demand generation of matrix lines and columns.

use crate::bits::{self, transpose64, WORD_BITS};
use crate::data::Dataset;
use crate::matrix::{ClassPairs, PairCursor};

/// XOR one matrix line into `out`.
///
/// `out` must hold the dataset's active word count; bit `j` of the line
/// is set iff the two observations differ in attribute `j`.
pub fn generate_line(dataset: &Dataset, row_a: u32, row_b: u32, out: &mut [u64]) {
    let a = dataset.row(row_a as usize);
    let b = dataset.row(row_b as usize);
    for (o, (&wa, &wb)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = wa ^ wb;
    }
}

/// Materialize one column of the matrix for a slice of lines.
///
/// Bit `p` of `out` (MSB-first within each word) is set iff the pair at
/// slice position `p` differs in `attribute`. Lines are consumed in
/// batches of 64: each batch XORs the attribute's word for its pairs,
/// transposes the 64x64 block and keeps the transposed row matching the
/// attribute's bit position.
pub fn generate_column(
    dataset: &Dataset,
    pairs: &ClassPairs<'_>,
    start: PairCursor,
    s_size: u64,
    attribute: u64,
    out: &mut [u64],
) {
    let n_out_words = bits::words_for(s_size);
    debug_assert!(out.len() >= n_out_words);
    debug_assert!(attribute < dataset.n_attributes());

    let word = bits::word_of(attribute);
    let pos = (attribute % WORD_BITS as u64) as usize;

    let mut iter = pairs.iter_from(start, s_size);
    let mut block = [0u64; WORD_BITS];

    for out_word in out[..n_out_words].iter_mut() {
        let mut filled = 0;
        for slot in block.iter_mut() {
            match iter.next() {
                Some((a, b)) => {
                    *slot = dataset.row(a as usize)[word] ^ dataset.row(b as usize)[word];
                    filled += 1;
                }
                None => *slot = 0,
            }
        }
        debug_assert!(filled > 0);
        transpose64(&mut block);
        *out_word = block[pos];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ClassIndex;
    use crate::testing::random_dataset;

    #[test]
    fn column_bits_match_line_bits() {
        let mut ds = random_dataset(20, 70, 3, 21);
        ds.sort_rows();
        ds.remove_duplicates();
        let index = ClassIndex::build(&ds).unwrap();
        let pairs = ClassPairs::new(&index);
        let total = pairs.total_lines();

        let mut line = vec![0u64; ds.n_words()];
        for attribute in [0u64, 1, 63, 64, 69] {
            let mut column = vec![0u64; bits::words_for(total)];
            generate_column(&ds, &pairs, pairs.cursor_at(0), total, attribute, &mut column);

            for (p, (a, b)) in pairs.iter_from(pairs.cursor_at(0), total).enumerate() {
                generate_line(&ds, a, b, &mut line);
                let line_bit =
                    bits::bit_is_set(line[bits::word_of(attribute)], bits::bit_of(attribute));
                let col_bit =
                    bits::bit_is_set(column[p / 64], 63 - (p % 64) as u32);
                assert_eq!(line_bit, col_bit, "attribute {attribute}, line {p}");
            }
        }
    }

    #[test]
    fn column_respects_slice_offsets() {
        let mut ds = random_dataset(12, 9, 2, 3);
        ds.sort_rows();
        ds.remove_duplicates();
        let index = ClassIndex::build(&ds).unwrap();
        let pairs = ClassPairs::new(&index);
        let total = pairs.total_lines();

        let mut full = vec![0u64; bits::words_for(total)];
        generate_column(&ds, &pairs, pairs.cursor_at(0), total, 4, &mut full);

        let offset = total / 2;
        let size = total - offset;
        let mut part = vec![0u64; bits::words_for(size)];
        generate_column(&ds, &pairs, pairs.cursor_at(offset), size, 4, &mut part);

        for p in 0..size {
            let full_bit =
                bits::bit_is_set(full[((offset + p) / 64) as usize], 63 - ((offset + p) % 64) as u32);
            let part_bit = bits::bit_is_set(part[(p / 64) as usize], 63 - (p % 64) as u32);
            assert_eq!(full_bit, part_bit, "slice position {p}");
        }
    }
}
