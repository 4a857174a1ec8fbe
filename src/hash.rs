use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::Engine;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::traits::{words_for, BitPacker, BitSet, WORD_BITS};
use crate::{HashAlg, HashError};

const HEX_DIGITS_PER_WORD: usize = WORD_BITS / 4;

/// A 64-bit perceptual hash.
///
/// Produced by [`average_hash`](crate::average_hash), [`difference_hash`](crate::difference_hash)
/// and [`perception_hash`](crate::perception_hash). The first value the algorithm walks lands
/// in the most significant bit.
///
/// The text form is `<code>:<16 hex digits>`, e.g. `a:1c3cfed8f9f9f970`.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct ImageHash {
    alg: HashAlg,
    hash: u64,
}

impl ImageHash {
    /// Wrap a previously computed 64-bit pattern.
    pub fn new(alg: HashAlg, hash: u64) -> Self {
        ImageHash { alg, hash }
    }

    /// The algorithm that produced this hash.
    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    /// The raw bit pattern.
    pub fn as_u64(&self) -> u64 {
        self.hash
    }

    /// Number of bits in the hash; always 64.
    pub fn bits(&self) -> usize {
        WORD_BITS
    }

    /// Calculate the Hamming distance between this and `other`.
    ///
    /// Equivalent to counting the 1-bits of the XOR of the two hashes. Zero means the
    /// fingerprints are identical, not that the images were.
    ///
    /// ## Errors:
    /// Returns `HashError::NotComparable` if the hashes come from different algorithms.
    pub fn dist(&self, other: &Self) -> Result<u32, HashError> {
        if self.alg != other.alg {
            return Err(not_comparable(self.describe(), other.describe()));
        }
        Ok(self.hash.hamming(&other.hash))
    }

    /// Binary form: the algorithm code byte followed by the big-endian hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 8);
        bytes.push(self.alg.code() as u8);
        bytes.extend_from_slice(&self.hash.to_be_bytes());
        bytes
    }

    /// Inverse of [`to_bytes`](#method.to_bytes).
    ///
    /// ## Errors:
    /// Returns a `HashError::BytesWrongLength` error if the slice is not exactly 9 bytes, or
    /// `HashError::MalformedEncoding` if the first byte is not an algorithm code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let (alg, rest) = split_code_byte(bytes)?;
        let hash: [u8; 8] = rest.try_into().map_err(|_| HashError::BytesWrongLength {
            expected: 1 + 8,
            found: bytes.len(),
        })?;
        Ok(ImageHash::new(alg, u64::from_be_bytes(hash)))
    }

    /// Get a Base64 string of the binary form.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(self.to_bytes())
    }

    /// Create an `ImageHash` instance from the given Base64-encoded string.
    ///
    /// ## Errors:
    /// Returns `HashError::Base64` if the string wasn't valid base64.
    /// Otherwise returns the same errors as `from_bytes`.
    pub fn from_base64(encoded_hash: &str) -> Result<Self, HashError> {
        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded_hash)?;
        Self::from_bytes(&bytes)
    }

    fn describe(&self) -> String {
        format!("fixed {} hash", self.alg)
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.alg.code(), self.hash.to_hex())
    }
}

impl FromStr for ImageHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, HashError> {
        let (alg, hex) = split_code(s)?;
        if hex.len() != HEX_DIGITS_PER_WORD {
            return Err(malformed(s, "a 64-bit hash needs exactly 16 hex digits"));
        }

        let words = parse_hex(s, hex)?;
        Ok(ImageHash::new(alg, words[0]))
    }
}

/// A perceptual hash of arbitrary length.
///
/// Produced by the `ext_*` functions. Bits are stored in 64-bit words, most significant word
/// first and MSB first within each word; bits past [`bits()`](#method.bits) in the last word
/// are always clear.
///
/// The text form is `<code>:<hex>` with one hex digit per 4 bits, so each whole word renders
/// as 16 digits with leading zeros kept.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct ExtImageHash {
    alg: HashAlg,
    words: Box<[u64]>,
    bits: u32,
}

impl ExtImageHash {
    /// Fails with `HashError::UnsupportedSize` if the length does not fit the `u32` header of
    /// the binary form.
    pub(crate) fn from_packed(alg: HashAlg, packer: BitPacker) -> Result<Self, HashError> {
        let len = packer.len();
        let bits = u32::try_from(len).map_err(|_| HashError::UnsupportedSize { alg, bits: len })?;
        Ok(ExtImageHash {
            alg,
            words: packer.into_words(),
            bits,
        })
    }

    /// Wrap previously computed words.
    ///
    /// Returns `None` unless `bits` is a positive multiple of 4 that fits in a `u32`, `words`
    /// holds exactly enough words for `bits`, and every bit past `bits` is clear.
    pub fn from_words(alg: HashAlg, words: Vec<u64>, bits: usize) -> Option<Self> {
        let declared = u32::try_from(bits).ok()?;
        if bits == 0 || bits % 4 != 0 || words.len() != words_for(bits) {
            return None;
        }

        let used = bits - (words.len() - 1) * WORD_BITS;
        let last = *words.last()?;
        if used < WORD_BITS && last << used != 0 {
            return None;
        }

        Some(ExtImageHash {
            alg,
            words: words.into_boxed_slice(),
            bits: declared,
        })
    }

    /// The algorithm that produced this hash.
    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    /// The storage words, most significant first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Declared number of bits.
    pub fn bits(&self) -> usize {
        self.bits as usize
    }

    /// The same bits as a 64-bit [`ImageHash`], if this hash is exactly 64 bits long.
    pub fn to_fixed(&self) -> Option<ImageHash> {
        match self.words[..] {
            [word] if self.bits() == WORD_BITS => Some(ImageHash::new(self.alg, word)),
            _ => None,
        }
    }

    /// Calculate the Hamming distance between this and `other`, summed over all words.
    ///
    /// ## Errors:
    /// Returns `HashError::NotComparable` if the hashes come from different algorithms or have
    /// different lengths.
    pub fn dist(&self, other: &Self) -> Result<u32, HashError> {
        if self.alg != other.alg || self.bits != other.bits {
            return Err(not_comparable(self.describe(), other.describe()));
        }
        Ok(self.words.hamming(&other.words))
    }

    /// Binary form: the algorithm code byte, the bit length as a big-endian `u32`, then the
    /// big-endian words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 4 + self.words.len() * 8);
        bytes.push(self.alg.code() as u8);
        bytes.extend_from_slice(&self.bits.to_be_bytes());
        for word in self.words.iter() {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// Inverse of [`to_bytes`](#method.to_bytes).
    ///
    /// ## Errors:
    /// Returns a `HashError::BytesWrongLength` error if the slice length does not match the
    /// encoded bit length, or `HashError::MalformedEncoding` if the header or padding is invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let (alg, rest) = split_code_byte(bytes)?;
        let (len, payload) = rest.split_at(rest.len().min(4));
        let len: [u8; 4] = len.try_into().map_err(|_| HashError::BytesWrongLength {
            expected: 1 + 4,
            found: bytes.len(),
        })?;

        let bits = u32::from_be_bytes(len) as usize;
        let expected = words_for(bits)
            .checked_mul(8)
            .and_then(|len| len.checked_add(1 + 4))
            .unwrap_or(usize::MAX);
        if bytes.len() != expected {
            return Err(HashError::BytesWrongLength {
                expected,
                found: bytes.len(),
            });
        }

        let words = payload
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_be_bytes(word)
            })
            .collect();

        Self::from_words(alg, words, bits).ok_or_else(|| HashError::MalformedEncoding {
            input: format!("{bytes:02x?}"),
            reason: "bit length or padding is invalid",
        })
    }

    /// Get a Base64 string of the binary form.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(self.to_bytes())
    }

    /// Create an `ExtImageHash` instance from the given Base64-encoded string.
    ///
    /// ## Errors:
    /// Returns `HashError::Base64` if the string wasn't valid base64.
    /// Otherwise returns the same errors as `from_bytes`.
    pub fn from_base64(encoded_hash: &str) -> Result<Self, HashError> {
        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded_hash)?;
        Self::from_bytes(&bytes)
    }

    fn describe(&self) -> String {
        format!("extended {} hash of {} bits", self.alg, self.bits)
    }
}

impl fmt::Display for ExtImageHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hex = self.words.to_hex();
        write!(f, "{}:{}", self.alg.code(), &hex[..self.bits() / 4])
    }
}

impl FromStr for ExtImageHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, HashError> {
        let (alg, hex) = split_code(s)?;
        let bits = hex
            .len()
            .checked_mul(4)
            .and_then(|bits| u32::try_from(bits).ok())
            .ok_or_else(|| malformed(s, "too many hex digits"))?;

        let words = parse_hex(s, hex)?;
        Ok(ExtImageHash {
            alg,
            words: words.into_boxed_slice(),
            bits,
        })
    }
}

/// Either kind of hash, for when the representation is only known at runtime.
///
/// Parsing text picks [`Fixed`](#variant.Fixed) for exactly 16 hex digits and
/// [`Extended`](#variant.Extended) for any other length. A 64-bit extended hash has the same
/// text as the fixed hash with the same bits, so the two compare equal and have a distance.
#[derive(Debug, Clone)]
pub enum PerceptualHash {
    /// A 64-bit hash.
    Fixed(ImageHash),
    /// A hash of arbitrary length.
    Extended(ExtImageHash),
}

impl PerceptualHash {
    /// The algorithm that produced this hash.
    pub fn alg(&self) -> HashAlg {
        match self {
            PerceptualHash::Fixed(hash) => hash.alg(),
            PerceptualHash::Extended(hash) => hash.alg(),
        }
    }

    /// Number of bits in the hash.
    pub fn bits(&self) -> usize {
        match self {
            PerceptualHash::Fixed(hash) => hash.bits(),
            PerceptualHash::Extended(hash) => hash.bits(),
        }
    }

    /// Calculate the Hamming distance between this and `other`.
    ///
    /// A fixed hash and a 64-bit extended hash are measured like two fixed hashes.
    ///
    /// ## Errors:
    /// Returns `HashError::NotComparable` unless both sides have the same algorithm and length.
    pub fn dist(&self, other: &Self) -> Result<u32, HashError> {
        if let (Some(left), Some(right)) = (self.as_fixed(), other.as_fixed()) {
            return left.dist(&right);
        }

        match (self, other) {
            (PerceptualHash::Extended(left), PerceptualHash::Extended(right)) => left.dist(right),
            _ => Err(not_comparable(self.describe(), other.describe())),
        }
    }

    /// The 64-bit form, for fixed hashes and extended hashes of exactly 64 bits.
    fn as_fixed(&self) -> Option<ImageHash> {
        match self {
            PerceptualHash::Fixed(hash) => Some(*hash),
            PerceptualHash::Extended(hash) => hash.to_fixed(),
        }
    }

    fn describe(&self) -> String {
        match self {
            PerceptualHash::Fixed(hash) => hash.describe(),
            PerceptualHash::Extended(hash) => hash.describe(),
        }
    }
}

impl PartialEq for PerceptualHash {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_fixed(), other.as_fixed()) {
            (Some(left), Some(right)) => left == right,
            (None, None) => matches!(
                (self, other),
                (PerceptualHash::Extended(left), PerceptualHash::Extended(right)) if left == right
            ),
            _ => false,
        }
    }
}

impl Eq for PerceptualHash {}

// must agree with `eq`: 64-bit hashes hash through their fixed form
impl Hash for PerceptualHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match (self.as_fixed(), self) {
            (Some(fixed), _) => fixed.hash(state),
            (None, PerceptualHash::Extended(hash)) => hash.hash(state),
            (None, PerceptualHash::Fixed(hash)) => hash.hash(state),
        }
    }
}

impl From<ImageHash> for PerceptualHash {
    fn from(hash: ImageHash) -> Self {
        PerceptualHash::Fixed(hash)
    }
}

impl From<ExtImageHash> for PerceptualHash {
    fn from(hash: ExtImageHash) -> Self {
        PerceptualHash::Extended(hash)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PerceptualHash::Fixed(hash) => fmt::Display::fmt(hash, f),
            PerceptualHash::Extended(hash) => fmt::Display::fmt(hash, f),
        }
    }
}

impl FromStr for PerceptualHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, HashError> {
        let (_, hex) = split_code(s)?;
        if hex.len() == HEX_DIGITS_PER_WORD {
            s.parse().map(PerceptualHash::Fixed)
        } else {
            s.parse().map(PerceptualHash::Extended)
        }
    }
}

macro_rules! serde_as_text {
    ($($ty:ty),+) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }
    )+};
}

serde_as_text!(ImageHash, ExtImageHash, PerceptualHash);

fn split_code(input: &str) -> Result<(HashAlg, &str), HashError> {
    let (code, hex) = input
        .split_once(':')
        .ok_or_else(|| malformed(input, "missing ':' separator"))?;

    let mut chars = code.chars();
    let alg = match (chars.next(), chars.next()) {
        (Some(code), None) => HashAlg::from_code(code),
        _ => None,
    }
    .ok_or_else(|| malformed(input, "unknown algorithm code"))?;

    Ok((alg, hex))
}

fn split_code_byte(bytes: &[u8]) -> Result<(HashAlg, &[u8]), HashError> {
    let (&code, rest) = bytes.split_first().ok_or(HashError::BytesWrongLength {
        expected: 1 + 8,
        found: 0,
    })?;

    let alg = HashAlg::from_code(char::from(code)).ok_or_else(|| HashError::MalformedEncoding {
        input: format!("{bytes:02x?}"),
        reason: "unknown algorithm code",
    })?;
    Ok((alg, rest))
}

/// Parse lowercase hex into words, left-aligning a trailing partial word.
fn parse_hex(input: &str, hex: &str) -> Result<Vec<u64>, HashError> {
    if hex.is_empty() {
        return Err(malformed(input, "no hex digits"));
    }
    if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(malformed(input, "expected lowercase hex digits"));
    }

    hex.as_bytes()
        .chunks(HEX_DIGITS_PER_WORD)
        .map(|chunk| {
            // all ASCII, checked above
            let digits = std::str::from_utf8(chunk).map_err(|_| malformed(input, "invalid UTF-8"))?;
            let word = u64::from_str_radix(digits, 16)
                .map_err(|_| malformed(input, "expected lowercase hex digits"))?;
            Ok(word << (4 * (HEX_DIGITS_PER_WORD - chunk.len())))
        })
        .collect()
}

fn malformed(input: &str, reason: &'static str) -> HashError {
    HashError::MalformedEncoding {
        input: input.to_owned(),
        reason,
    }
}

fn not_comparable(left: String, right: String) -> HashError {
    HashError::NotComparable { left, right }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use hamming_bitwise_fast::hamming_bitwise_fast;
    use rand::rngs::SmallRng;
    use rand::{RngCore, SeedableRng};

    use super::{ExtImageHash, ImageHash, PerceptualHash};
    use crate::{HashAlg, HashError};

    fn random_words(count: usize, seed: u64) -> Vec<u64> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..count).map(|_| rng.next_u64()).collect()
    }

    fn word_bytes(words: &[u64]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    #[test]
    fn fixed_text_form() {
        let hash = ImageHash::new(HashAlg::Average, 0x1c3c_fed8_f9f9_f970);
        assert_eq!(hash.to_string(), "a:1c3cfed8f9f9f970");
        assert_eq!("a:1c3cfed8f9f9f970".parse::<ImageHash>(), Ok(hash));

        let hash = ImageHash::new(HashAlg::Perception, 0xff);
        assert_eq!(hash.to_string(), "p:00000000000000ff");
    }

    #[test]
    fn fixed_text_round_trip() {
        for (idx, word) in random_words(32, 1).into_iter().enumerate() {
            let hash = ImageHash::new(HashAlg::ALL[idx % 3], word);
            assert_eq!(hash.to_string().parse::<ImageHash>(), Ok(hash));
        }
    }

    #[test]
    fn extended_text_form() {
        let hash = ExtImageHash::from_words(HashAlg::Perception, vec![1, 0xab << 56], 128).unwrap();
        assert_eq!(
            hash.to_string(),
            "p:0000000000000001ab00000000000000"
        );

        // 56 bits render as 14 digits
        let hash = ExtImageHash::from_words(HashAlg::Difference, vec![u64::MAX << 8], 56).unwrap();
        assert_eq!(hash.to_string(), "d:ffffffffffffff");
    }

    #[test]
    fn extended_text_round_trip() {
        for (words, bits) in [(1, 64), (4, 256), (1, 56), (2, 68), (16, 1024)] {
            let mut words = random_words(words, bits as u64);
            let used = bits % 64;
            if used != 0 {
                *words.last_mut().unwrap() &= !0u64 << (64 - used);
            }

            let hash = ExtImageHash::from_words(HashAlg::Difference, words, bits).unwrap();
            let text = hash.to_string();
            assert_eq!(text.len(), 2 + bits / 4);
            assert_eq!(text.parse::<ExtImageHash>(), Ok(hash));
        }
    }

    #[test]
    fn from_words_checks_invariants() {
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![0; 4], 256).is_some());
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![0; 3], 256).is_none());
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![], 0).is_none());
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![0], 6).is_none());
        // a bit set past the declared length
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![1], 60).is_none());
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![1 << 4], 60).is_some());
    }

    #[test]
    fn generic_decode_picks_representation() {
        let fixed: PerceptualHash = "d:0000000000000000".parse().unwrap();
        assert_eq!(
            fixed,
            PerceptualHash::Fixed(ImageHash::new(HashAlg::Difference, 0))
        );

        let text = format!("p:{}", "0123456789abcdef".repeat(4));
        let ext: PerceptualHash = text.parse().unwrap();
        assert_eq!(ext.bits(), 256);
        assert_eq!(ext.alg(), HashAlg::Perception);
        assert_eq!(ext.to_string(), text);
    }

    #[test]
    fn malformed_text_is_rejected() {
        for text in [
            "",
            "a",
            "a1c3cfed8f9f9f970",
            "x:1c3cfed8f9f9f970",
            "ab:1c3cfed8f9f9f970",
            ":1c3cfed8f9f9f970",
            "a:",
            "a:1c3cfed8f9f9f97",
            "a:1c3cfed8f9f9f9701",
            "a:1C3CFED8F9F9F970",
            "a:+c3cfed8f9f9f970",
            "a:1c3cfed8 9f9f970",
        ] {
            assert!(
                matches!(
                    text.parse::<ImageHash>(),
                    Err(HashError::MalformedEncoding { .. })
                ),
                "{text:?}"
            );
        }

        for text in ["p:", "p:xyz", "q:00", "p:-1"] {
            assert!(
                matches!(
                    text.parse::<ExtImageHash>(),
                    Err(HashError::MalformedEncoding { .. })
                ),
                "{text:?}"
            );
        }
    }

    #[test]
    fn distance_properties() {
        let words = random_words(8, 2);
        for pair in words.windows(2) {
            let left = ImageHash::new(HashAlg::Average, pair[0]);
            let right = ImageHash::new(HashAlg::Average, pair[1]);

            assert_eq!(left.dist(&left), Ok(0));
            assert_eq!(left.dist(&right), right.dist(&left));
            assert_eq!(
                left.dist(&right),
                Ok(hamming_bitwise_fast(&pair[0].to_be_bytes(), &pair[1].to_be_bytes()) as u32)
            );

            let complement = ImageHash::new(HashAlg::Average, !pair[0]);
            assert_eq!(left.dist(&complement), Ok(64));
        }
    }

    #[test]
    fn extended_distance_properties() {
        let left_words = random_words(4, 3);
        let right_words = random_words(4, 4);
        let flipped: Vec<u64> = left_words.iter().map(|word| !word).collect();

        let expected =
            hamming_bitwise_fast(&word_bytes(&left_words), &word_bytes(&right_words)) as u32;

        let left = ExtImageHash::from_words(HashAlg::Perception, left_words, 256).unwrap();
        let right = ExtImageHash::from_words(HashAlg::Perception, right_words, 256).unwrap();
        let complement = ExtImageHash::from_words(HashAlg::Perception, flipped, 256).unwrap();

        assert_eq!(left.dist(&left), Ok(0));
        assert_eq!(left.dist(&right), Ok(expected));
        assert_eq!(right.dist(&left), Ok(expected));
        assert_eq!(left.dist(&complement), Ok(256));
    }

    #[test]
    fn incomparable_hashes() {
        let average = ImageHash::new(HashAlg::Average, 0);
        let difference = ImageHash::new(HashAlg::Difference, 0);
        assert!(matches!(
            average.dist(&difference),
            Err(HashError::NotComparable { .. })
        ));

        let short = ExtImageHash::from_words(HashAlg::Average, vec![0], 64).unwrap();
        let long = ExtImageHash::from_words(HashAlg::Average, vec![0; 4], 256).unwrap();
        assert!(matches!(
            short.dist(&long),
            Err(HashError::NotComparable { .. })
        ));

        let fixed = PerceptualHash::from(average);
        let ext = PerceptualHash::from(long);
        assert!(matches!(fixed.dist(&ext), Err(HashError::NotComparable { .. })));
        assert!(matches!(ext.dist(&fixed), Err(HashError::NotComparable { .. })));
        assert_eq!(fixed.dist(&fixed), Ok(0));

        let other_alg = PerceptualHash::from(
            ExtImageHash::from_words(HashAlg::Difference, vec![0], 64).unwrap(),
        );
        assert!(matches!(fixed.dist(&other_alg), Err(HashError::NotComparable { .. })));
    }

    #[test]
    fn extended_64_bits_matches_fixed() {
        let word = 0x00ff_00ff_0f0f_f0f0;
        let ext = ExtImageHash::from_words(HashAlg::Perception, vec![word], 64).unwrap();
        let fixed = ImageHash::new(HashAlg::Perception, word);
        assert_eq!(ext.to_fixed(), Some(fixed));

        let ext = PerceptualHash::from(ext);
        let fixed = PerceptualHash::from(fixed);
        assert_eq!(ext, fixed);
        assert_eq!(ext.dist(&fixed), Ok(0));

        let flipped = PerceptualHash::from(ImageHash::new(HashAlg::Perception, !word));
        assert_eq!(ext.dist(&flipped), Ok(64));
        assert_ne!(ext, flipped);

        let set: HashSet<PerceptualHash> = [ext, fixed].into_iter().collect();
        assert_eq!(set.len(), 1);

        let short = ExtImageHash::from_words(HashAlg::Perception, vec![word << 8], 56).unwrap();
        assert_eq!(short.to_fixed(), None);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_lengths_are_rejected() {
        let too_long = u32::MAX as usize + 4;
        assert!(ExtImageHash::from_words(HashAlg::Average, vec![0], too_long).is_none());

        let mut bytes = vec![b'a'];
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            ExtImageHash::from_bytes(&bytes),
            Err(HashError::BytesWrongLength { found: 5, .. })
        ));
    }

    #[test]
    fn bytes_and_base64_round_trip() {
        let hash = ImageHash::new(HashAlg::Difference, 0xf8d8_70b2_33b3_f3b3);
        let bytes = hash.to_bytes();
        assert_eq!(bytes[0], b'd');
        assert_eq!(bytes.len(), 9);
        assert_eq!(ImageHash::from_bytes(&bytes), Ok(hash));
        assert_eq!(ImageHash::from_base64(&hash.to_base64()), Ok(hash));

        let ext = ExtImageHash::from_words(HashAlg::Average, random_words(4, 5), 256).unwrap();
        assert_eq!(ext.to_bytes().len(), 1 + 4 + 32);
        assert_eq!(ExtImageHash::from_bytes(&ext.to_bytes()), Ok(ext.clone()));
        assert_eq!(ExtImageHash::from_base64(&ext.to_base64()), Ok(ext));
    }

    #[test]
    fn bad_bytes_are_rejected() {
        assert_eq!(
            ImageHash::from_bytes(b"a1234"),
            Err(HashError::BytesWrongLength {
                expected: 9,
                found: 5
            })
        );
        assert!(matches!(
            ImageHash::from_bytes(b"z12345678"),
            Err(HashError::MalformedEncoding { .. })
        ));
        assert!(matches!(
            ImageHash::from_base64("not base64!"),
            Err(HashError::Base64(_))
        ));

        let mut bytes = ExtImageHash::from_words(HashAlg::Average, vec![0; 4], 256)
            .unwrap()
            .to_bytes();
        bytes.pop();
        assert_eq!(
            ExtImageHash::from_bytes(&bytes),
            Err(HashError::BytesWrongLength {
                expected: 37,
                found: 36
            })
        );
    }

    #[test]
    fn serde_uses_text_form() {
        let hash = ImageHash::new(HashAlg::Average, 0x0107_ffff_f800_40c0);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"a:0107fffff80040c0\"");
        assert_eq!(serde_json::from_str::<ImageHash>(&json).unwrap(), hash);

        let any = PerceptualHash::from(
            ExtImageHash::from_words(HashAlg::Perception, random_words(4, 6), 256).unwrap(),
        );
        let json = serde_json::to_string(&any).unwrap();
        assert_eq!(serde_json::from_str::<PerceptualHash>(&json).unwrap(), any);

        assert!(serde_json::from_str::<ImageHash>("\"a:zz\"").is_err());
        assert_eq!(
            serde_json::to_string(&HashAlg::Perception).unwrap(),
            "\"Perception\""
        );
    }
}
