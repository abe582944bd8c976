//! Bit-packed dataset store.
//!
//! Each observation is a row of `stride` 64-bit words: `n_attributes`
//! bits packed MSB-first, followed by zero padding, with the class value
//! in the low `n_bits_for_class` bits of the final word. After JNSQ
//! promotion the attribute count grows and the *active* word count may
//! shrink below the storage stride; the stride itself never changes.

use rayon::slice::ParallelSliceMut;

use crate::bits::{self, WORD_BITS};

/// Dataset shape and content errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset needs at least 2 classes, got {0}")]
    TooFewClasses(u64),

    #[error("dataset needs at least 2 observations, got {0}")]
    TooFewObservations(u64),

    #[error("dataset needs at least 1 attribute")]
    NoAttributes,

    #[error("data length mismatch: expected {expected} words, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("observation {observation} has class {class}, dataset has {n_classes} classes")]
    ClassOutOfRange {
        observation: usize,
        class: u64,
        n_classes: u64,
    },
}

/// A bit-packed observation matrix.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Row data, `n_observations * stride` words.
    data: Vec<u64>,

    /// Number of attributes (grows when JNSQ bits are promoted).
    n_attributes: u64,

    /// Number of observations (shrinks when duplicates are removed).
    n_observations: usize,

    /// Number of classes.
    n_classes: u64,

    /// Bits used to store the class in the row tail.
    n_bits_for_class: u32,

    /// Bits used by promoted JNSQ values (0 until promotion).
    n_bits_for_jnsq: u32,

    /// Words per row that carry attribute data (may shrink after JNSQ).
    n_words: usize,

    /// Words per row in storage (fixed at construction).
    stride: usize,
}

impl Dataset {
    /// Build a dataset from raw packed words.
    ///
    /// `data` must hold `n_observations` rows of
    /// `ceil((n_attributes + class_bits) / 64)` words each, with the
    /// class value in the low bits of each row's final word.
    pub fn from_parts(
        data: Vec<u64>,
        n_observations: u64,
        n_attributes: u64,
        n_classes: u64,
    ) -> Result<Self, DatasetError> {
        if n_classes < 2 {
            return Err(DatasetError::TooFewClasses(n_classes));
        }
        if n_observations < 2 {
            return Err(DatasetError::TooFewObservations(n_observations));
        }
        if n_attributes == 0 {
            return Err(DatasetError::NoAttributes);
        }

        let n_bits_for_class = bits::bits_for_value(n_classes - 1).max(1);
        let stride = bits::words_for(n_attributes + n_bits_for_class as u64);
        let expected = n_observations as usize * stride;
        if data.len() != expected {
            return Err(DatasetError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            data,
            n_attributes,
            n_observations: n_observations as usize,
            n_classes,
            n_bits_for_class,
            n_bits_for_jnsq: 0,
            n_words: stride,
            stride,
        })
    }

    /// Number of attributes, including promoted JNSQ bits.
    #[inline]
    pub fn n_attributes(&self) -> u64 {
        self.n_attributes
    }

    /// Number of observations.
    #[inline]
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Number of classes.
    #[inline]
    pub fn n_classes(&self) -> u64 {
        self.n_classes
    }

    /// Bits used for the class field.
    #[inline]
    pub fn n_bits_for_class(&self) -> u32 {
        self.n_bits_for_class
    }

    /// Bits used for promoted JNSQ values.
    #[inline]
    pub fn n_bits_for_jnsq(&self) -> u32 {
        self.n_bits_for_jnsq
    }

    /// Words per row that participate in attribute computations.
    #[inline]
    pub fn n_words(&self) -> usize {
        self.n_words
    }

    /// Words per row in storage.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Active words of observation `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[u64] {
        let start = i * self.stride;
        &self.data[start..start + self.n_words]
    }

    /// Full storage words of observation `i`.
    #[inline]
    pub fn storage_row(&self, i: usize) -> &[u64] {
        let start = i * self.stride;
        &self.data[start..start + self.stride]
    }

    /// Mutable storage words of observation `i`.
    #[inline]
    pub fn storage_row_mut(&mut self, i: usize) -> &mut [u64] {
        let start = i * self.stride;
        &mut self.data[start..start + self.stride]
    }

    /// Class value of observation `i`, from the low bits of the final
    /// storage word.
    #[inline]
    pub fn class_of(&self, i: usize) -> u64 {
        let last = self.data[i * self.stride + self.stride - 1];
        last & bits::mask_low(self.n_bits_for_class)
    }

    /// Sort rows lexicographically by packed words, first word first.
    ///
    /// Rows with equal attributes end up adjacent, ordered by class,
    /// which is what duplicate removal and the JNSQ pass rely on.
    pub fn sort_rows(&mut self) {
        let stride = self.stride;
        let data = &self.data;

        let mut order: Vec<u32> = (0..self.n_observations as u32).collect();
        order.par_sort_unstable_by(|&a, &b| {
            let ra = &data[a as usize * stride..a as usize * stride + stride];
            let rb = &data[b as usize * stride..b as usize * stride + stride];
            ra.cmp(rb)
        });

        let mut sorted = Vec::with_capacity(self.data.len());
        for &i in &order {
            sorted.extend_from_slice(&data[i as usize * stride..(i as usize + 1) * stride]);
        }
        self.data = sorted;
    }

    /// Drop rows identical to their predecessor on every bit, class
    /// included. Returns the number of rows removed.
    ///
    /// Rows equal on attributes but different in class are kept; they
    /// are the inconsistencies the JNSQ pass resolves.
    pub fn remove_duplicates(&mut self) -> usize {
        let stride = self.stride;
        let n_obs = self.n_observations;
        let mut n_uniques = 1;

        for i in 1..n_obs {
            let cur = i * stride;
            let last = (n_uniques - 1) * stride;
            if self.data[cur..cur + stride] != self.data[last..last + stride] {
                let dst = n_uniques * stride;
                if dst != cur {
                    self.data.copy_within(cur..cur + stride, dst);
                }
                n_uniques += 1;
            }
        }

        self.data.truncate(n_uniques * stride);
        self.n_observations = n_uniques;
        n_obs - n_uniques
    }

    /// Compare two observations on attribute bits only.
    ///
    /// Whole attribute words are compared directly; a trailing partial
    /// word is masked so class and JNSQ bits never participate.
    pub fn same_attributes(&self, a: usize, b: usize) -> bool {
        let ra = self.storage_row(a);
        let rb = self.storage_row(b);

        let full_words = (self.n_attributes / WORD_BITS as u64) as usize;
        if ra[..full_words] != rb[..full_words] {
            return false;
        }

        let remaining = (self.n_attributes % WORD_BITS as u64) as u32;
        if remaining == 0 {
            return true;
        }
        (ra[full_words] ^ rb[full_words]) & bits::mask_high(remaining) == 0
    }

    /// Promote JNSQ bits written by the JNSQ pass into attributes.
    ///
    /// Computes the field width from the maximum inconsistency, extends
    /// the attribute count and recomputes the active word count, which
    /// may shrink when the class bits no longer spill into an extra word.
    pub fn apply_jnsq_width(&mut self, max_inconsistency: u64) {
        let jnsq_bits = bits::bits_for_value(max_inconsistency);
        self.n_bits_for_jnsq = jnsq_bits;
        self.n_attributes += jnsq_bits as u64;
        self.n_words = bits::words_for(self.n_attributes);
        debug_assert!(self.n_words <= self.stride);
    }
}

/// Observation lists per class, built over a prepared dataset.
///
/// The lexicographic sort orders rows by attributes first, so a class's
/// observations are generally not contiguous; the index stores explicit
/// row indices, flat with per-class offsets.
#[derive(Debug, Clone)]
pub struct ClassIndex {
    /// Observation count per class.
    counts: Vec<u64>,

    /// Start of each class's slice in `rows`.
    offsets: Vec<usize>,

    /// Row indices grouped by class.
    rows: Vec<u32>,
}

impl ClassIndex {
    /// Index the dataset's observations by class.
    ///
    /// Fails with [`DatasetError::ClassOutOfRange`] if any row's class
    /// field does not name a valid class.
    pub fn build(dataset: &Dataset) -> Result<Self, DatasetError> {
        let n_classes = dataset.n_classes();
        let n_obs = dataset.n_observations();

        let mut counts = vec![0u64; n_classes as usize];
        for i in 0..n_obs {
            let class = dataset.class_of(i);
            if class >= n_classes {
                return Err(DatasetError::ClassOutOfRange {
                    observation: i,
                    class,
                    n_classes,
                });
            }
            counts[class as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(counts.len());
        let mut offset = 0usize;
        for &c in &counts {
            offsets.push(offset);
            offset += c as usize;
        }

        let mut cursor = offsets.clone();
        let mut rows = vec![0u32; n_obs];
        for i in 0..n_obs {
            let class = dataset.class_of(i) as usize;
            rows[cursor[class]] = i as u32;
            cursor[class] += 1;
        }

        Ok(Self {
            counts,
            offsets,
            rows,
        })
    }

    /// Number of classes.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Observation count of `class`.
    #[inline]
    pub fn count(&self, class: usize) -> u64 {
        self.counts[class]
    }

    /// Observation counts for all classes.
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Row index of observation `idx` within `class`.
    #[inline]
    pub fn observation(&self, class: usize, idx: u64) -> u32 {
        self.rows[self.offsets[class] + idx as usize]
    }
}
