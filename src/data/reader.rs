//! Container file format for bit-packed datasets.
//!
//! A container holds one or more named datasets. The layout is a small
//! fixed header followed by one entry per dataset:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (8 bytes)                              │
//! │   0  4  Magic ("LAID")                        │
//! │   4  1  Version major                         │
//! │   5  1  Version minor                         │
//! │   6  2  Dataset count (LE)                    │
//! ├──────────────────────────────────────────────┤
//! │ Entry (per dataset)                           │
//! │   0   2   Name length (LE)                    │
//! │   2   n   Name (UTF-8)                        │
//! │   ..  8   Observations (LE)                   │
//! │   ..  8   Attributes (LE)                     │
//! │   ..  4   Classes (LE)                        │
//! │   ..  4   CRC32 of the word block             │
//! │   ..  8w  Words (LE u64 each)                 │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Rows are packed as described in [`Dataset`]: attribute bits MSB-first,
//! class value in the low bits of each row's last word.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::bits;
use crate::data::{Dataset, DatasetError};

/// Magic bytes identifying a dataset container.
pub const MAGIC: &[u8; 4] = b"LAID";

/// Current container format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current container format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Errors that can occur while reading a container.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a dataset container file")]
    NotAContainer,

    #[error("container requires format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("dataset {0:?} not found in container")]
    DatasetNotFound(String),

    #[error("container entry has a malformed name")]
    MalformedName,

    #[error("checksum mismatch for dataset {name:?}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("dataset {name:?} is malformed: {source}")]
    Malformed {
        name: String,
        #[source]
        source: DatasetError,
    },
}

/// Open `path` and read the dataset named `name`.
pub fn read_container(path: impl AsRef<Path>, name: &str) -> Result<Dataset, ReadError> {
    let file = File::open(path)?;
    read_from(BufReader::new(file), name)
}

/// Read the dataset named `name` from an open container stream.
pub fn read_from<R: Read>(mut reader: R, name: &str) -> Result<Dataset, ReadError> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    if &header[0..4] != MAGIC {
        return Err(ReadError::NotAContainer);
    }
    let major = header[4];
    let minor = header[5];
    if major > CURRENT_VERSION_MAJOR {
        return Err(ReadError::UnsupportedVersion { major, minor });
    }
    let count = u16::from_le_bytes([header[6], header[7]]);

    for _ in 0..count {
        let entry_name = read_name(&mut reader)?;
        let n_observations = read_u64(&mut reader)?;
        let n_attributes = read_u64(&mut reader)?;
        let n_classes = u64::from(read_u32(&mut reader)?);
        let checksum = read_u32(&mut reader)?;

        let n_words = entry_words(n_observations, n_attributes, n_classes);

        if entry_name != name {
            skip_words(&mut reader, n_words)?;
            continue;
        }

        let mut data = vec![0u64; n_words];
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = [0u8; 8];
        for word in data.iter_mut() {
            reader.read_exact(&mut buf)?;
            hasher.update(&buf);
            *word = u64::from_le_bytes(buf);
        }
        let actual = hasher.finalize();
        if actual != checksum {
            return Err(ReadError::ChecksumMismatch {
                name: entry_name,
                expected: checksum,
                actual,
            });
        }

        return Dataset::from_parts(data, n_observations, n_attributes, n_classes).map_err(
            |source| ReadError::Malformed {
                name: entry_name,
                source,
            },
        );
    }

    Err(ReadError::DatasetNotFound(name.to_string()))
}

/// Write a container holding the given named datasets.
///
/// Datasets must be raw (unprepared): the writer stores the declared
/// attribute count and the full storage rows verbatim.
pub fn write_container(
    path: impl AsRef<Path>,
    entries: &[(&str, &Dataset)],
) -> Result<(), ReadError> {
    let file = File::create(path)?;
    write_to(BufWriter::new(file), entries)
}

/// Write a container to an open stream.
pub fn write_to<W: Write>(mut writer: W, entries: &[(&str, &Dataset)]) -> Result<(), ReadError> {
    let mut header = [0u8; 8];
    header[0..4].copy_from_slice(MAGIC);
    header[4] = CURRENT_VERSION_MAJOR;
    header[5] = CURRENT_VERSION_MINOR;
    header[6..8].copy_from_slice(&(entries.len() as u16).to_le_bytes());
    writer.write_all(&header)?;

    for (name, dataset) in entries {
        let name_bytes = name.as_bytes();
        writer.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        writer.write_all(name_bytes)?;
        writer.write_all(&(dataset.n_observations() as u64).to_le_bytes())?;
        writer.write_all(&dataset.n_attributes().to_le_bytes())?;
        writer.write_all(&(dataset.n_classes() as u32).to_le_bytes())?;

        let mut hasher = crc32fast::Hasher::new();
        for i in 0..dataset.n_observations() {
            for &word in dataset.storage_row(i) {
                hasher.update(&word.to_le_bytes());
            }
        }
        writer.write_all(&hasher.finalize().to_le_bytes())?;

        for i in 0..dataset.n_observations() {
            for &word in dataset.storage_row(i) {
                writer.write_all(&word.to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn entry_words(n_observations: u64, n_attributes: u64, n_classes: u64) -> usize {
    let class_bits = if n_classes > 1 {
        bits::bits_for_value(n_classes - 1).max(1)
    } else {
        1
    };
    let stride = bits::words_for(n_attributes + class_bits as u64);
    n_observations as usize * stride
}

fn read_name<R: Read>(reader: &mut R) -> Result<String, ReadError> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_le_bytes(len_buf) as usize;
    let mut name = vec![0u8; len];
    reader.read_exact(&mut name)?;
    String::from_utf8(name).map_err(|_| ReadError::MalformedName)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, ReadError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, ReadError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn skip_words<R: Read>(reader: &mut R, n_words: usize) -> Result<(), ReadError> {
    let mut remaining = n_words * 8;
    let mut buf = [0u8; 4096];
    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        reader.read_exact(&mut buf[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}
