use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::traits::BitPacker;
use crate::{ExtImageHash, HashError, ImageHash, PixelField};

pub mod stats;

/// Side of the square field consumed by the 64-bit average and perception hashes.
const FIXED_SIDE: u32 = 8;

/// Side of the DCT field the 64-bit perception hash takes its low-frequency block from.
const PERCEPTION_FIELD_SIDE: u32 = 64;

/// Bit lengths the extended average hash can produce.
const EXT_AVERAGE_BITS: [usize; 2] = [64, 256];

/// Hash algorithms implemented by this crate.
///
/// Each variant has a one-character code used in the text form of a hash, e.g. the `a` in
/// `a:1c3cfed8f9f9f970`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlg {
    /// Threshold each intensity against the mean of the field.
    ///
    /// Resilient to brightness and contrast changes. Fixed input: 8x8 pixels.
    ///
    /// Further reading: <http://www.hackerfactor.com/blog/index.php?/archives/432-Looks-Like-It.html>
    Average,
    /// Compare each intensity to its right-hand neighbour.
    ///
    /// Tracks the horizontal gradient, so it survives monotonic shifts in brightness.
    /// Fixed input: 9x8 pixels (width x height), giving 8 comparisons per row.
    ///
    /// Further reading: <http://www.hackerfactor.com/blog/?/archives/529-Kind-of-Like-That.html>
    Difference,
    /// Threshold the low-frequency DCT coefficients against their median.
    ///
    /// Fixed input: a 64x64 DCT-II coefficient field, of which the top-left 8x8 block is used.
    Perception,
}

impl HashAlg {
    /// Every algorithm, in code order.
    pub const ALL: [HashAlg; 3] = [HashAlg::Average, HashAlg::Difference, HashAlg::Perception];

    /// Character identifying this algorithm in the text form of a hash.
    pub fn code(self) -> char {
        match self {
            HashAlg::Average => 'a',
            HashAlg::Difference => 'd',
            HashAlg::Perception => 'p',
        }
    }

    /// Inverse of [`code`](#method.code).
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.code() == code)
    }

    fn name(self) -> &'static str {
        match self {
            HashAlg::Average => "average",
            HashAlg::Difference => "difference",
            HashAlg::Perception => "perception",
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the full lowercase name (`"average"`) or the one-character code (`"a"`).
impl FromStr for HashAlg {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, HashError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s || (s.len() == 1 && s.starts_with(alg.code())))
            .ok_or_else(|| HashError::MalformedEncoding {
                input: s.to_owned(),
                reason: "unknown hash algorithm",
            })
    }
}

/// Compute the 64-bit average hash of an 8x8 intensity field.
///
/// Bit `63 - idx` is set when the value at raster index `idx` is greater than the field's mean.
pub fn average_hash(field: &PixelField) -> Result<ImageHash, HashError> {
    let alg = HashAlg::Average;
    check_exact(alg, field, FIXED_SIDE, FIXED_SIDE)?;

    let packer = threshold_bits(alg, field.as_slice(), stats::mean)?;
    Ok(ImageHash::new(alg, packer.into_word()))
}

/// Compute the 64-bit difference hash of a 9x8 (width x height) intensity field.
///
/// Rows are walked top to bottom; comparison `idx` sets bit `63 - idx` when a pixel is less
/// than its right-hand neighbour.
pub fn difference_hash(field: &PixelField) -> Result<ImageHash, HashError> {
    let alg = HashAlg::Difference;
    check_exact(alg, field, FIXED_SIDE + 1, FIXED_SIDE)?;

    Ok(ImageHash::new(alg, gradient_bits(field).into_word()))
}

/// Compute the 64-bit perception hash of a 64x64 DCT coefficient field.
///
/// Only the top-left 8x8 block of coefficients is used; bit `63 - idx` is set when
/// coefficient `idx` of that block is greater than the block's median.
pub fn perception_hash(coeffs: &PixelField) -> Result<ImageHash, HashError> {
    let alg = HashAlg::Perception;
    check_exact(alg, coeffs, PERCEPTION_FIELD_SIDE, PERCEPTION_FIELD_SIDE)?;

    let block = coeffs.corner(FIXED_SIDE);
    let packer = threshold_bits(alg, &block, stats::median)?;
    Ok(ImageHash::new(alg, packer.into_word()))
}

/// Compute an extended average hash of a square intensity field.
///
/// Supported fields are 8x8 (64 bits) and 16x16 (256 bits). An 8x8 field produces the same
/// bits as [`average_hash`].
pub fn ext_average_hash(field: &PixelField) -> Result<ExtImageHash, HashError> {
    let alg = HashAlg::Average;
    check_not_empty(field)?;

    if field.width() != field.height() {
        return Err(reject(alg, field, "square".into()));
    }

    let bits = field.as_slice().len();
    if !EXT_AVERAGE_BITS.contains(&bits) {
        return Err(unsupported(alg, bits));
    }

    let packer = threshold_bits(alg, field.as_slice(), stats::mean)?;
    ExtImageHash::from_packed(alg, packer)
}

/// Compute an extended difference hash of any field at least two columns wide.
///
/// The hash has one bit per horizontal comparison, `height * (width - 1)` in total, which must
/// be a whole number of hex digits (a multiple of 4). A 9x8 field produces the same bits as
/// [`difference_hash`].
pub fn ext_difference_hash(field: &PixelField) -> Result<ExtImageHash, HashError> {
    let alg = HashAlg::Difference;
    check_not_empty(field)?;

    if field.width() < 2 {
        return Err(reject(alg, field, "at least 2 columns wide".into()));
    }

    let bits = (field.width() as usize - 1) * field.height() as usize;
    if bits % 4 != 0 {
        return Err(unsupported(alg, bits));
    }

    ExtImageHash::from_packed(alg, gradient_bits(field))
}

/// Compute an extended perception hash of a DCT coefficient field.
///
/// The block side is `floor(sqrt(width))` and the hash has `side * side` bits, which must be a
/// power of two no smaller than 4; a 64x64 field yields 64 bits and a 256x256 field 256 bits.
/// The field must have at least `side` rows.
pub fn ext_perception_hash(coeffs: &PixelField) -> Result<ExtImageHash, HashError> {
    let alg = HashAlg::Perception;
    check_not_empty(coeffs)?;

    let side = isqrt(coeffs.width());
    let bits = side as usize * side as usize;
    if bits < 4 || !bits.is_power_of_two() {
        return Err(unsupported(alg, bits));
    }

    if coeffs.height() < side {
        return Err(reject(alg, coeffs, format!("{side}-row or taller")));
    }

    let block = coeffs.corner(side);
    let packer = threshold_bits(alg, &block, stats::median)?;
    ExtImageHash::from_packed(alg, packer)
}

/// Set a bit for every value strictly above the threshold computed by `threshold_of`.
fn threshold_bits(
    alg: HashAlg,
    values: &[f64],
    threshold_of: fn(&[f64]) -> Option<f64>,
) -> Result<BitPacker, HashError> {
    let threshold = threshold_of(values).ok_or(HashError::EmptyInput)?;
    trace!("{alg} threshold over {} values: {threshold}", values.len());

    Ok(BitPacker::new(values.len()).extend(values.iter().map(|&val| val > threshold)))
}

/// Set a bit for every pixel that is less than its right-hand neighbour.
fn gradient_bits(field: &PixelField) -> BitPacker {
    let len = (field.width() as usize).saturating_sub(1) * field.height() as usize;
    BitPacker::new(len).extend(
        field
            .rows()
            .flat_map(|row| row.windows(2).map(|pair| pair[0] < pair[1])),
    )
}

fn check_not_empty(field: &PixelField) -> Result<(), HashError> {
    if field.is_empty() {
        debug!("rejecting empty pixel field");
        return Err(HashError::EmptyInput);
    }
    Ok(())
}

fn check_exact(alg: HashAlg, field: &PixelField, width: u32, height: u32) -> Result<(), HashError> {
    check_not_empty(field)?;

    if field.width() != width || field.height() != height {
        return Err(reject(alg, field, format!("{width}x{height}")));
    }
    Ok(())
}

fn reject(alg: HashAlg, field: &PixelField, expected: String) -> HashError {
    debug!(
        "{alg} hash rejected a {}x{} field, expected {expected}",
        field.width(),
        field.height()
    );
    HashError::WrongDimensions {
        alg,
        expected,
        width: field.width(),
        height: field.height(),
    }
}

fn unsupported(alg: HashAlg, bits: usize) -> HashError {
    debug!("{alg} hash cannot produce {bits} bits");
    HashError::UnsupportedSize { alg, bits }
}

/// Integer square root, rounded down.
fn isqrt(n: u32) -> u32 {
    let mut root = f64::from(n).sqrt() as u32;
    // correct for float rounding near perfect squares
    while u64::from(root) * u64::from(root) > u64::from(n) {
        root -= 1;
    }
    while u64::from(root + 1) * u64::from(root + 1) <= u64::from(n) {
        root += 1;
    }
    root
}
