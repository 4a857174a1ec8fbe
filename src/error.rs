use thiserror::Error;

use crate::HashAlg;

/// Everything that can go wrong while building, parsing or comparing a hash.
///
/// Input shape is always checked before any statistic is computed, so a returned error
/// never describes a half-built hash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The pixel field has no rows or no columns.
    #[error("pixel field is empty")]
    EmptyInput,

    /// The field shape does not match what the algorithm requires.
    #[error("{alg} hash requires a {expected} field, got {width}x{height}")]
    WrongDimensions {
        /// Algorithm that rejected the field.
        alg: HashAlg,
        /// Human-readable description of the accepted shape.
        expected: String,
        /// Width of the rejected field.
        width: u32,
        /// Height of the rejected field.
        height: u32,
    },

    /// An extended algorithm was asked for a bit length it cannot produce.
    #[error("{alg} hash does not support {bits}-bit fingerprints")]
    UnsupportedSize {
        /// Algorithm that rejected the size.
        alg: HashAlg,
        /// Number of bits the field would have produced.
        bits: usize,
    },

    /// Distance requested between hashes of a different algorithm or length.
    #[error("cannot compare {left} with {right}")]
    NotComparable {
        /// Description of the left-hand hash.
        left: String,
        /// Description of the right-hand hash.
        right: String,
    },

    /// Text passed to a parser was not `<code>:<hex>`.
    #[error("malformed hash {input:?}: {reason}")]
    MalformedEncoding {
        /// The offending text.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Rows passed to [`PixelField::from_rows`](crate::PixelField::from_rows) differ in length.
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        /// Index of the first row whose length differs from row 0.
        row: usize,
        /// Length of row 0.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// Rows passed to [`PixelField::from_rows`](crate::PixelField::from_rows) give a side
    /// longer than `u32::MAX`.
    #[error("pixel field of {width}x{height} is too large")]
    FieldTooLarge {
        /// Number of columns.
        width: usize,
        /// Number of rows.
        height: usize,
    },

    /// Byte slice passed to `from_bytes` was the wrong length.
    #[error("hash bytes have the wrong length: expected {expected}, found {found}")]
    BytesWrongLength {
        /// Number of bytes the hash type expected.
        expected: usize,
        /// Number of bytes found when parsing the hash bytes.
        found: usize,
    },

    /// String passed was not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}
