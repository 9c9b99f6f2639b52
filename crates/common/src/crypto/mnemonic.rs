//! BIP39-style word encoding for byte strings of arbitrary aligned length
//!
//! Standard BIP39 only accepts 128 to 256 bits of entropy. Shares of a split
//! secret are longer than that and their size depends on the secret, so this
//! codec keeps the BIP39 structure and drops the range restriction:
//!
//! - entropy must be a non-zero multiple of 4 bytes (`ENT = 32k` bits)
//! - the checksum is the first `ENT / 32` bits of `SHA-256(entropy)`
//! - `entropy ‖ checksum` is cut into 11-bit groups, each indexing a word
//!
//! For 16 to 32 byte inputs the output is identical to standard BIP39.
//!
//! Shares rarely land on the 4-byte grid, so [`pad_to_block`] and
//! [`strip_block_padding`] provide a self-describing pad (1 to 4 bytes, each
//! holding the pad length) that is always present and always strippable.

use std::fmt;

use bip39::Language;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Bits encoded by a single word
pub const BITS_PER_WORD: usize = 11;
/// Entropy must be a multiple of this many bytes
pub const BLOCK_SIZE: usize = 4;
/// Largest entropy whose checksum still fits in one SHA-256 digest (256 checksum bits)
pub const MAX_ENTROPY_SIZE: usize = 1024;

const IDEOGRAPHIC_SPACE: &str = "\u{3000}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MnemonicError {
    #[error("invalid entropy length: {0} bytes (must be a non-zero multiple of 4, at most 1024)")]
    InvalidEntropyLength(usize),
    /// Position of the offending word; the word itself is secret material
    #[error("unknown word at position {0}")]
    UnknownWord(usize),
    #[error("no entropy length encodes to {0} words")]
    InvalidWordCount(usize),
    #[error("mnemonic checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid block padding")]
    InvalidPadding,
}

/// A word mnemonic as produced by [`MnemonicCodec::encode`]
///
/// `Debug` only reveals the word count, the words themselves are secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mnemonic(String);

impl Mnemonic {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic({} words)", self.word_count())
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Mnemonic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Mnemonic {
    fn from(phrase: String) -> Self {
        Mnemonic(phrase)
    }
}

impl From<&str> for Mnemonic {
    fn from(phrase: &str) -> Self {
        Mnemonic(phrase.to_string())
    }
}

impl From<bip39::Mnemonic> for Mnemonic {
    fn from(mnemonic: bip39::Mnemonic) -> Self {
        Mnemonic(mnemonic.to_string())
    }
}

/// Entropy ⇄ mnemonic codec over a BIP39 wordlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MnemonicCodec {
    language: Language,
}

impl Default for MnemonicCodec {
    fn default() -> Self {
        Self::new(Language::English)
    }
}

impl MnemonicCodec {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn separator(&self) -> &'static str {
        match self.language {
            Language::Japanese => IDEOGRAPHIC_SPACE,
            _ => " ",
        }
    }

    fn lookup(&self, word: &str) -> Option<u16> {
        self.language.find_word(word).or_else(|| {
            // wordlists are not uniformly stored decomposed
            let composed: String = word.nfc().collect();
            self.language.find_word(&composed)
        })
    }

    /// Encode entropy as a mnemonic
    ///
    /// # Errors
    ///
    /// Returns [`MnemonicError::InvalidEntropyLength`] unless the entropy is a
    /// non-zero multiple of [`BLOCK_SIZE`] bytes no longer than [`MAX_ENTROPY_SIZE`].
    pub fn encode(&self, entropy: &[u8]) -> Result<Mnemonic, MnemonicError> {
        let len = entropy.len();
        if len == 0 || len % BLOCK_SIZE != 0 || len > MAX_ENTROPY_SIZE {
            return Err(MnemonicError::InvalidEntropyLength(len));
        }

        let checksum = Sha256::digest(entropy);
        let entropy_bits = len * 8;
        let total_bits = entropy_bits + entropy_bits / 32;
        let word_list = self.language.word_list();

        let words: Vec<&str> = (0..total_bits / BITS_PER_WORD)
            .map(|word| {
                let index = (0..BITS_PER_WORD).fold(0usize, |acc, i| {
                    let pos = word * BITS_PER_WORD + i;
                    let bit = if pos < entropy_bits {
                        bit_at(entropy, pos)
                    } else {
                        bit_at(&checksum, pos - entropy_bits)
                    };
                    (acc << 1) | bit as usize
                });
                word_list[index]
            })
            .collect();

        Ok(Mnemonic(words.join(self.separator())))
    }

    /// Decode a mnemonic back to its entropy, verifying the embedded checksum
    ///
    /// Input is NFKD-normalised and split on any whitespace, so both ASCII and
    /// ideographic separators are accepted.
    pub fn decode(&self, mnemonic: impl AsRef<str>) -> Result<Vec<u8>, MnemonicError> {
        let normalized: String = mnemonic.as_ref().nfkd().collect();
        let indices = normalized
            .split_whitespace()
            .enumerate()
            .map(|(pos, word)| self.lookup(word).ok_or(MnemonicError::UnknownWord(pos)))
            .collect::<Result<Vec<u16>, _>>()?;

        let total_bits = indices.len() * BITS_PER_WORD;
        // the entropy/checksum boundary is the largest multiple of 32 bits
        //  leaving a checksum tail of ENT / 32 bits
        let entropy_bits = total_bits / 33 * 32;
        let checksum_bits = total_bits - entropy_bits;
        if entropy_bits == 0 || checksum_bits != entropy_bits / 32 {
            return Err(MnemonicError::InvalidWordCount(indices.len()));
        }
        if entropy_bits / 8 > MAX_ENTROPY_SIZE {
            return Err(MnemonicError::InvalidEntropyLength(entropy_bits / 8));
        }

        let bit = |pos: usize| {
            (indices[pos / BITS_PER_WORD] >> (BITS_PER_WORD - 1 - pos % BITS_PER_WORD)) & 1 == 1
        };

        let mut entropy = vec![0u8; entropy_bits / 8];
        for pos in (0..entropy_bits).filter(|pos| bit(*pos)) {
            entropy[pos / 8] |= 1 << (7 - pos % 8);
        }

        let checksum = Sha256::digest(&entropy);
        let intact = (0..checksum_bits).all(|i| bit(entropy_bits + i) == bit_at(&checksum, i));
        if !intact {
            return Err(MnemonicError::ChecksumMismatch);
        }

        Ok(entropy)
    }
}

fn bit_at(bytes: &[u8], pos: usize) -> bool {
    (bytes[pos / 8] >> (7 - pos % 8)) & 1 == 1
}

/// Pad `data` onto the [`BLOCK_SIZE`] grid
///
/// Always appends between 1 and 4 bytes, each equal to the number of bytes
/// appended, so [`strip_block_padding`] never needs to know the original length.
pub fn pad_to_block(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad as u8).take(pad));
    out
}

/// Remove the padding added by [`pad_to_block`]
pub fn strip_block_padding(data: &[u8]) -> Result<&[u8], MnemonicError> {
    let pad = *data.last().ok_or(MnemonicError::InvalidPadding)? as usize;
    if data.len() % BLOCK_SIZE != 0 || pad == 0 || pad > BLOCK_SIZE || pad > data.len() {
        return Err(MnemonicError::InvalidPadding);
    }

    let (body, tail) = data.split_at(data.len() - pad);
    if tail.iter().any(|b| *b as usize != pad) {
        return Err(MnemonicError::InvalidPadding);
    }
    Ok(body)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut buff = vec![0u8; len];
        rand::rng().fill(&mut buff[..]);
        buff
    }

    #[test]
    fn test_bip39_vectors() {
        let codec = MnemonicCodec::default();

        let zeros = codec.encode(&[0u8; 16]).unwrap();
        assert_eq!(
            zeros.as_str(),
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        );

        let sevens = codec.encode(&[0x7f; 16]).unwrap();
        assert_eq!(
            sevens.as_str(),
            "legal winner thank year wave sausage worth useful legal winner thank yellow"
        );

        let ones = codec.encode(&[0xff; 16]).unwrap();
        assert_eq!(
            ones.as_str(),
            "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong"
        );

        let long = codec.encode(&[0u8; 32]).unwrap();
        let mut expected = vec!["abandon"; 23];
        expected.push("art");
        assert_eq!(long.as_str(), expected.join(" "));
    }

    #[test]
    fn test_matches_bip39_for_standard_lengths() {
        let codec = MnemonicCodec::default();
        for len in (16..=32).step_by(4) {
            let entropy = random_bytes(len);
            let ours = codec.encode(&entropy).unwrap();
            let reference = bip39::Mnemonic::from_entropy_in(Language::English, &entropy).unwrap();
            assert_eq!(ours.as_str(), reference.to_string());
        }
    }

    #[test]
    fn test_roundtrip_arbitrary_lengths() {
        let codec = MnemonicCodec::default();
        for len in (BLOCK_SIZE..=128).step_by(BLOCK_SIZE) {
            let entropy = random_bytes(len);
            let mnemonic = codec.encode(&entropy).unwrap();
            assert_eq!(mnemonic.word_count(), len * 8 * 33 / 32 / BITS_PER_WORD);
            assert_eq!(codec.decode(&mnemonic).unwrap(), entropy);
        }
    }

    #[test]
    fn test_max_entropy_roundtrip() {
        let codec = MnemonicCodec::default();
        let entropy = random_bytes(MAX_ENTROPY_SIZE);
        let mnemonic = codec.encode(&entropy).unwrap();
        assert_eq!(codec.decode(&mnemonic).unwrap(), entropy);

        let too_long = random_bytes(MAX_ENTROPY_SIZE + BLOCK_SIZE);
        assert_eq!(
            codec.encode(&too_long),
            Err(MnemonicError::InvalidEntropyLength(MAX_ENTROPY_SIZE + BLOCK_SIZE))
        );
    }

    #[test]
    fn test_rejects_unaligned_entropy() {
        let codec = MnemonicCodec::default();
        assert_eq!(
            codec.encode(&[1, 2, 3]),
            Err(MnemonicError::InvalidEntropyLength(3))
        );
        assert_eq!(
            codec.encode(&[]),
            Err(MnemonicError::InvalidEntropyLength(0))
        );
    }

    #[test]
    fn test_unknown_word() {
        let codec = MnemonicCodec::default();
        let result = codec.decode("abandon abandon notaword");
        assert_eq!(result, Err(MnemonicError::UnknownWord(2)));
    }

    #[test]
    fn test_invalid_word_count() {
        let codec = MnemonicCodec::default();
        assert_eq!(
            codec.decode("abandon abandon abandon abandon"),
            Err(MnemonicError::InvalidWordCount(4))
        );
        assert_eq!(codec.decode(""), Err(MnemonicError::InvalidWordCount(0)));
    }

    #[test]
    fn test_checksum_detects_swapped_last_word() {
        let codec = MnemonicCodec::default();
        let result = codec.decode(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon",
        );
        assert_eq!(result, Err(MnemonicError::ChecksumMismatch));
    }

    #[test]
    fn test_single_bit_flips_fail_checksum() {
        // 48 bytes carry a 12 bit checksum, so a flip in the entropy region
        //  slips through with probability 2^-12 and flips in the checksum
        //  region never do
        let codec = MnemonicCodec::default();
        let entropy: Vec<u8> = (0..48u8).map(|b| b.wrapping_mul(37).wrapping_add(11)).collect();
        let mnemonic = codec.encode(&entropy).unwrap();
        let word_list = Language::English.word_list();
        let indices: Vec<usize> = mnemonic
            .words()
            .map(|w| Language::English.find_word(w).unwrap() as usize)
            .collect();

        let mut flips = 0;
        let mut rejected = 0;
        for word in 0..indices.len() {
            for bit in 0..BITS_PER_WORD {
                let mut flipped = indices.clone();
                flipped[word] ^= 1 << bit;
                let phrase: Vec<&str> = flipped.iter().map(|i| word_list[*i]).collect();
                flips += 1;
                match codec.decode(phrase.join(" ")) {
                    Err(MnemonicError::ChecksumMismatch) => rejected += 1,
                    Ok(decoded) => assert_ne!(decoded, entropy),
                    Err(e) => panic!("unexpected error {e:?}"),
                }
            }
        }

        assert_eq!(flips, 36 * BITS_PER_WORD);
        assert!(
            rejected >= flips - 4,
            "only {rejected} of {flips} single-bit flips were rejected"
        );
    }

    #[test]
    fn test_accepts_ideographic_separator_and_extra_whitespace() {
        let codec = MnemonicCodec::default();
        let entropy = random_bytes(20);
        let mnemonic = codec.encode(&entropy).unwrap();

        let spaced = format!("  {}\n", mnemonic.words().collect::<Vec<_>>().join("\u{3000}"));
        assert_eq!(codec.decode(spaced).unwrap(), entropy);
    }

    #[test]
    fn test_japanese_separator() {
        let codec = MnemonicCodec::new(Language::Japanese);
        let entropy = random_bytes(36);
        let mnemonic = codec.encode(&entropy).unwrap();

        assert!(mnemonic.as_str().contains('\u{3000}'));
        assert!(!mnemonic.as_str().contains(' '));
        assert_eq!(codec.decode(&mnemonic).unwrap(), entropy);
    }

    #[test]
    fn test_debug_hides_words() {
        let codec = MnemonicCodec::default();
        let mnemonic = codec.encode(&[0u8; 16]).unwrap();
        assert_eq!(format!("{:?}", mnemonic), "Mnemonic(12 words)");
    }

    #[test]
    fn test_padding() {
        for len in 0..12 {
            let data = random_bytes(len);
            let padded = pad_to_block(&data);
            assert_eq!(padded.len() % BLOCK_SIZE, 0);
            assert!(padded.len() > data.len());
            assert_eq!(strip_block_padding(&padded).unwrap(), data.as_slice());
        }
    }

    #[test]
    fn test_invalid_padding() {
        assert_eq!(strip_block_padding(&[]), Err(MnemonicError::InvalidPadding));
        assert_eq!(
            strip_block_padding(&[1, 2, 3, 0]),
            Err(MnemonicError::InvalidPadding)
        );
        assert_eq!(
            strip_block_padding(&[1, 2, 3, 2]),
            Err(MnemonicError::InvalidPadding)
        );
        assert_eq!(
            strip_block_padding(&[9, 9, 9, 9, 9, 9, 9, 5]),
            Err(MnemonicError::InvalidPadding)
        );
        assert_eq!(strip_block_padding(&[4, 4, 4, 4]).unwrap(), &[] as &[u8]);
    }
}
