//! Perceptual fingerprints for images: average, difference and perception hashes, in a fixed
//! 64-bit form and an extended form of arbitrary length.
//!
//! Visually similar images give hashes with a small Hamming distance; unrelated images differ
//! in about half of their bits.
//!
//! The core functions take an already prepared [`PixelField`]:
//!
//! ```rust
//! use imagefp::{difference_hash, PixelField};
//!
//! // every row increases left to right
//! let field = PixelField::from_fn(9, 8, |_, col| f64::from(col));
//! let hash = difference_hash(&field).unwrap();
//!
//! assert_eq!(hash.to_string(), "d:ffffffffffffffff");
//! assert_eq!(hash.dist(&hash), Ok(0));
//! ```
//!
//! To start from a decoded image instead, build a [`Hasher`]:
//!
//! ```rust,no_run
//! use imagefp::{HashAlg, HasherConfig};
//!
//! let image1 = image::open("image1.png").unwrap();
//! let image2 = image::open("image2.png").unwrap();
//!
//! let hasher = HasherConfig::new().hash_alg(HashAlg::Perception).to_hasher();
//!
//! let hash1 = hasher.hash_image(&image1).unwrap();
//! let hash2 = hasher.hash_image(&image2).unwrap();
//!
//! println!("Image1 hash: {hash1}");
//! println!("Image2 hash: {hash2}");
//!
//! println!("Hamming Distance: {}", hash1.dist(&hash2).unwrap());
//! ```
#![deny(missing_docs)]

use std::fmt;
use std::str::FromStr;

pub use alg::stats;
pub use alg::{
    average_hash, difference_hash, ext_average_hash, ext_difference_hash, ext_perception_hash,
    perception_hash, HashAlg,
};
use dct::DctCtxt;
pub use error::HashError;
pub use field::PixelField;
pub use hash::{ExtImageHash, ImageHash, PerceptualHash};
pub use image::imageops::FilterType;
use image::{imageops, DynamicImage, RgbImage};
use log::debug;
use serde::{Deserialize, Serialize};

mod alg;
mod dct;
mod error;
mod field;
mod hash;
mod traits;

const LUMA_FROM_R_COEFF: f64 = 0.299;
const LUMA_FROM_G_COEFF: f64 = 0.587;
const LUMA_FROM_B_COEFF: f64 = 0.114;

/// Largest side accepted by [`HashSize::Extended`], giving at most 1024 bits.
const MAX_EXT_SIDE: u32 = 32;

/// Render a hash in its canonical `<code>:<hex>` text form.
pub fn encode(hash: &PerceptualHash) -> String {
    hash.to_string()
}

/// Parse the canonical text form.
///
/// Exactly 16 hex digits decode to a [`PerceptualHash::Fixed`], any other length to a
/// [`PerceptualHash::Extended`] of `4 * digits` bits.
pub fn decode(text: &str) -> Result<PerceptualHash, HashError> {
    text.parse()
}

/// Hamming distance between two hashes of the same kind, algorithm and length.
pub fn distance(left: &PerceptualHash, right: &PerceptualHash) -> Result<u32, HashError> {
    left.dist(right)
}

/// Which representation a [`Hasher`] produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashSize {
    /// A 64-bit [`ImageHash`] from the algorithm's canonical input shape.
    Fixed,
    /// An [`ExtImageHash`] built from a `side x side` grid of values.
    ///
    /// Sides go up to 32. The average hash supports sides 8 and 16, the perception hash any
    /// power of two from 2, and the difference hash any even side.
    Extended(u32),
}

/// Accepts `"fixed"` or an extended side length such as `"16"`.
impl FromStr for HashSize {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, HashError> {
        if s == "fixed" {
            return Ok(HashSize::Fixed);
        }

        s.parse()
            .map(HashSize::Extended)
            .map_err(|_| HashError::MalformedEncoding {
                input: s.to_owned(),
                reason: "expected \"fixed\" or an extended side length",
            })
    }
}

/// **Start here**. Configuration builder for [`Hasher`].
///
/// The defaults produce a fixed 64-bit difference hash, resizing with a triangle (bilinear)
/// filter:
///
/// ```rust
/// use imagefp::{HashAlg, HashSize, HasherConfig};
///
/// let hasher = HasherConfig::new().to_hasher();
///
/// let extended = HasherConfig::new()
///     .hash_alg(HashAlg::Average)
///     .hash_size(HashSize::Extended(16))
///     .to_hasher();
/// ```
///
/// # Preprocessing
/// The decoded image is resized to the shape the algorithm consumes, converted to luma with
/// `0.299 R + 0.587 G + 0.114 B`, and for the perception hash run through a 2D DCT-II:
///
/// | Algorithm | `Fixed` | `Extended(side)` |
/// |---|---|---|
/// | average | 8x8 | side x side |
/// | difference | 9x8 | (side + 1) x side |
/// | perception | 64x64, DCT | side² x side², DCT |
#[derive(Serialize, Deserialize, Clone)]
pub struct HasherConfig {
    hash_alg: HashAlg,
    hash_size: HashSize,
    #[serde(with = "SerdeFilterType")]
    resize_filter: FilterType,
}

impl HasherConfig {
    /// Construct a new hasher config with sane, reasonably fast defaults.
    pub fn new() -> Self {
        HasherConfig {
            hash_alg: HashAlg::Difference,
            hash_size: HashSize::Fixed,
            resize_filter: FilterType::Triangle,
        }
    }

    /// Set the algorithm used to generate hashes.
    #[must_use]
    pub fn hash_alg(self, hash_alg: HashAlg) -> Self {
        Self { hash_alg, ..self }
    }

    /// Choose between a fixed 64-bit hash and an extended one.
    ///
    /// Sizes the algorithm cannot produce are reported by
    /// [`Hasher::hash_image()`](struct.Hasher.html#method.hash_image) as
    /// `HashError::UnsupportedSize`, without resizing the image or planning a DCT.
    #[must_use]
    pub fn hash_size(self, hash_size: HashSize) -> Self {
        Self { hash_size, ..self }
    }

    /// Set the filter used to resize images during hashing.
    ///
    /// Note when picking a filter that images are almost always reduced in size.
    #[must_use]
    pub fn resize_filter(self, resize_filter: FilterType) -> Self {
        Self {
            resize_filter,
            ..self
        }
    }

    /// Create a [`Hasher`](struct.Hasher.html) from this config which can be used to hash images.
    ///
    /// The DCT plan for the perception hash is computed here, once.
    pub fn to_hasher(&self) -> Hasher {
        let Self {
            hash_alg,
            hash_size,
            resize_filter,
        } = *self;

        let (width, height) = resize_dimensions(hash_alg, hash_size);
        let supported = check_hash_size(hash_alg, hash_size).is_ok();

        let dct_ctxt = if hash_alg == HashAlg::Perception && supported {
            Some(DctCtxt::new(width))
        } else {
            None
        };

        Hasher {
            ctxt: HashCtxt {
                dct_ctxt,
                resize_filter,
                width,
                height,
            },
            hash_alg,
            hash_size,
        }
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}

// cannot be derived because of `FilterType`
impl fmt::Debug for HasherConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HasherConfig")
            .field("hash_alg", &self.hash_alg)
            .field("hash_size", &self.hash_size)
            .field("resize_filter", &debug_filter_type(&self.resize_filter))
            .finish()
    }
}

/// Reject extended sizes that are empty, too large, or that the perception hash's
/// `floor(sqrt(width))` block cannot turn into a power-of-two length.
fn check_hash_size(alg: HashAlg, size: HashSize) -> Result<(), HashError> {
    let HashSize::Extended(side) = size else {
        return Ok(());
    };

    if side == 0 {
        return Err(HashError::EmptyInput);
    }

    if side > MAX_EXT_SIDE || (alg == HashAlg::Perception && !side.is_power_of_two()) {
        debug!("{alg} hash cannot be built from an extended side of {side}");
        return Err(HashError::UnsupportedSize {
            alg,
            bits: (side as usize).saturating_mul(side as usize),
        });
    }
    Ok(())
}

/// Shape of the field an algorithm is fed, as width x height.
fn resize_dimensions(alg: HashAlg, size: HashSize) -> (u32, u32) {
    match (alg, size) {
        (HashAlg::Average, HashSize::Fixed) => (8, 8),
        (HashAlg::Difference, HashSize::Fixed) => (9, 8),
        (HashAlg::Perception, HashSize::Fixed) => (64, 64),
        (HashAlg::Average, HashSize::Extended(side)) => (side, side),
        (HashAlg::Difference, HashSize::Extended(side)) => (side.saturating_add(1), side),
        (HashAlg::Perception, HashSize::Extended(side)) => {
            let dct_side = side.saturating_mul(side);
            (dct_side, dct_side)
        }
    }
}

/// Generates hashes for images.
///
/// Constructed via [`HasherConfig::to_hasher()`](struct.HasherConfig#method.to_hasher).
/// Holds no mutable state, so one instance can be shared between threads.
pub struct Hasher {
    ctxt: HashCtxt,
    hash_alg: HashAlg,
    hash_size: HashSize,
}

impl Hasher {
    /// Calculate a hash for the given image with the configured options.
    ///
    /// ## Errors:
    /// Returns `HashError::EmptyInput` for a zero-sized image or hash size, and
    /// `HashError::UnsupportedSize` if the configured extended size is not supported by the
    /// algorithm.
    pub fn hash_image(&self, img: &DynamicImage) -> Result<PerceptualHash, HashError> {
        let field = self.prepare_field(img)?;

        match (self.hash_alg, self.hash_size) {
            (HashAlg::Average, HashSize::Fixed) => average_hash(&field).map(Into::into),
            (HashAlg::Difference, HashSize::Fixed) => difference_hash(&field).map(Into::into),
            (HashAlg::Perception, HashSize::Fixed) => perception_hash(&field).map(Into::into),
            (HashAlg::Average, HashSize::Extended(_)) => ext_average_hash(&field).map(Into::into),
            (HashAlg::Difference, HashSize::Extended(_)) => {
                ext_difference_hash(&field).map(Into::into)
            }
            (HashAlg::Perception, HashSize::Extended(_)) => {
                ext_perception_hash(&field).map(Into::into)
            }
        }
    }

    /// Resize, convert to luma and, for the perception hash, transform `img` into the field
    /// the configured algorithm consumes.
    ///
    /// ## Errors:
    /// Returns `HashError::EmptyInput` if either the image or the target shape is empty, and
    /// `HashError::UnsupportedSize` for an extended size that cannot be prepared.
    pub fn prepare_field(&self, img: &DynamicImage) -> Result<PixelField, HashError> {
        check_hash_size(self.hash_alg, self.hash_size)?;

        let HashCtxt { width, height, .. } = self.ctxt;
        if img.width() == 0 || img.height() == 0 || width == 0 || height == 0 {
            return Err(HashError::EmptyInput);
        }

        debug!(
            "preparing {}x{} image for {} hash at {width}x{height}",
            img.width(),
            img.height(),
            self.hash_alg
        );

        let resized = resize_image(&img.to_rgb8(), width, height, self.ctxt.resize_filter);
        let field = luma_field(&resized);

        Ok(match self.ctxt.dct_ctxt {
            Some(ref dct_ctxt) => dct_ctxt.dct_2d(field),
            None => field,
        })
    }
}

struct HashCtxt {
    dct_ctxt: Option<DctCtxt>,
    resize_filter: FilterType,
    width: u32,
    height: u32,
}

fn luma_field(img: &RgbImage) -> PixelField {
    PixelField::from_fn(img.width(), img.height(), |row, col| {
        let [r, g, b] = img.get_pixel(col, row).0;
        f64::from(r) * LUMA_FROM_R_COEFF
            + f64::from(g) * LUMA_FROM_G_COEFF
            + f64::from(b) * LUMA_FROM_B_COEFF
    })
}

#[cfg(feature = "fast_resize_unstable")]
fn resize_image(img: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer};

    let Ok(src_image) = fast_image_resize::images::Image::from_vec_u8(
        img.width(),
        img.height(),
        img.to_vec(),
        PixelType::U8x3, // Rgb8 is always U8x3
    ) else {
        return imageops::resize(img, width, height, filter);
    };

    let mut dst_image = fast_image_resize::images::Image::new(width, height, PixelType::U8x3);
    let mut resizer = Resizer::new();
    let resize_alg = match filter {
        FilterType::Nearest => ResizeAlg::Nearest,
        FilterType::Triangle => ResizeAlg::Convolution(fast_image_resize::FilterType::Bilinear),
        FilterType::CatmullRom => ResizeAlg::Convolution(fast_image_resize::FilterType::CatmullRom),
        FilterType::Gaussian => ResizeAlg::Convolution(fast_image_resize::FilterType::Gaussian),
        FilterType::Lanczos3 => ResizeAlg::Convolution(fast_image_resize::FilterType::Lanczos3),
    };

    let resize_options = ResizeOptions::new().resize_alg(resize_alg);
    if resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .is_err()
    {
        return imageops::resize(img, width, height, filter);
    };

    RgbImage::from_raw(width, height, dst_image.buffer().to_vec())
        .unwrap_or_else(|| imageops::resize(img, width, height, filter))
}

#[cfg(not(feature = "fast_resize_unstable"))]
fn resize_image(img: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    imageops::resize(img, width, height, filter)
}

/// Provide Serde a typedef for `image::FilterType`: <https://serde.rs/remote-derive.html>
/// This is automatically checked, if Serde complains then double-check with the original definition
#[derive(Serialize, Deserialize)]
#[serde(remote = "FilterType")]
enum SerdeFilterType {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

fn debug_filter_type(ft: &FilterType) -> &'static str {
    use FilterType::{CatmullRom, Gaussian, Lanczos3, Nearest, Triangle};

    match *ft {
        Triangle => "Triangle",
        Nearest => "Nearest",
        CatmullRom => "CatmullRom",
        Lanczos3 => "Lanczos3",
        Gaussian => "Gaussian",
    }
}
