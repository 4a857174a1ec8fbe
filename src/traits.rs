/// Number of bits held by one storage word.
pub(crate) const WORD_BITS: usize = u64::BITS as usize;

/// Number of words needed to store `bits` bits.
pub(crate) fn words_for(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

/// Bitwise operations over hash storage.
pub(crate) trait BitSet {
    /// Count the bits that differ between `self` and `other`.
    ///
    /// Both sides must have the same length; callers check this first.
    fn hamming(&self, other: &Self) -> u32;

    /// Render the bits as lowercase hex, most significant word first.
    fn to_hex(&self) -> String;
}

impl BitSet for u64 {
    fn hamming(&self, other: &Self) -> u32 {
        (self ^ other).count_ones()
    }

    fn to_hex(&self) -> String {
        format!("{self:016x}")
    }
}

impl BitSet for [u64] {
    fn hamming(&self, other: &Self) -> u32 {
        debug_assert_eq!(self.len(), other.len());
        self.iter()
            .zip(other)
            .map(|(left, right)| left.hamming(right))
            .sum()
    }

    fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(self.len() * WORD_BITS / 4);
        for word in self {
            hex.push_str(&word.to_hex());
        }
        hex
    }
}

/// Packs an ordered stream of bits into words, MSB first within a word and
/// most significant word first.
///
/// Bit `idx` lands in word `idx / 64` at position `63 - idx % 64`, so a 64-bit hash built here
/// is identical to setting bit `63 - idx` of a single `u64`.
pub(crate) struct BitPacker {
    words: Vec<u64>,
    len: usize,
}

impl BitPacker {
    /// A packer for exactly `len` bits, all clear.
    pub(crate) fn new(len: usize) -> Self {
        BitPacker {
            words: vec![0; words_for(len)],
            len,
        }
    }

    /// Set bit `idx`, counted from the most significant end.
    pub(crate) fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "bit {idx} out of range for {} bits", self.len);
        self.words[idx / WORD_BITS] |= 1u64 << (WORD_BITS - idx % WORD_BITS - 1);
    }

    /// Walk `bits` in order and set every position whose value is `true`.
    ///
    /// The iterator must yield exactly the packer's length.
    pub(crate) fn extend<I: IntoIterator<Item = bool>>(mut self, bits: I) -> Self {
        let mut count = 0;
        for (idx, bit) in bits.into_iter().enumerate() {
            if bit {
                self.set(idx);
            }
            count = idx + 1;
        }
        debug_assert_eq!(count, self.len, "bit stream length mismatch");
        self
    }

    /// The single word of a 64-bit hash.
    pub(crate) fn into_word(self) -> u64 {
        debug_assert_eq!(self.len, WORD_BITS);
        self.words[0]
    }

    pub(crate) fn into_words(self) -> Box<[u64]> {
        self.words.into_boxed_slice()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod test {
    use super::{words_for, BitPacker, BitSet};

    #[test]
    fn first_bit_is_most_significant() {
        let words = BitPacker::new(64).extend((0..64).map(|i| i == 0)).into_words();
        assert_eq!(&*words, &[1u64 << 63]);
    }

    #[test]
    fn spills_into_following_words() {
        let words = BitPacker::new(130)
            .extend((0..130).map(|i| i == 63 || i == 64 || i == 129))
            .into_words();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], 1);
        assert_eq!(words[1], 1 << 63);
        assert_eq!(words[2], 1 << 62);
    }

    #[test]
    fn trailing_bits_stay_clear() {
        let words = BitPacker::new(56).extend((0..56).map(|_| true)).into_words();
        assert_eq!(words[0], !0u64 << 8);
    }

    #[test]
    fn word_count() {
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(64), 1);
        assert_eq!(words_for(65), 2);
        assert_eq!(words_for(256), 4);
    }

    #[test]
    fn hex_keeps_leading_zeros() {
        assert_eq!(0xabu64.to_hex(), "00000000000000ab");
        assert_eq!([1u64, 0].to_hex(), "00000000000000010000000000000000");
    }

    #[test]
    fn hamming_sums_words() {
        let left = [0u64, !0, 0xf0];
        let right = [!0u64, !0, 0x0f];
        assert_eq!(left.hamming(&right), 64 + 8);
        assert_eq!(left[..].hamming(&left[..]), 0);
    }
}
