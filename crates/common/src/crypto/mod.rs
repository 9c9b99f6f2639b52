//! Cryptographic building blocks for keysplit
//!
//! - **Mnemonics**: a BIP39-style codec that accepts any 4-byte aligned input,
//!   so shares of arbitrary length can be written down as words
//! - **Sharing**: threshold secret sharing behind the [`SecretSharingEngine`] seam
//! - **Password protection**: PBKDF2-HMAC-SHA512 + AES-128-GCM ([`ShardCipher`])
//! - **Custody keys**: random ChaCha20-Poly1305 keys for remotely stored shards
//! - **Splitting**: [`KeySplitter`] composes all of the above
//!
//! # Security Model
//!
//! The secret is encrypted under the user's password *before* it is split, so
//! no share, nor any set of fewer than `t` shares, carries plaintext key
//! material. Recovering `t` shares is not enough on its own: the password is
//! an independent second factor.
//!
//! Shards held locally are re-encrypted under the password; shards handed to
//! a remote custodian are encrypted under a fresh [`CustodyKey`] that is given
//! out of band and never stored beside the ciphertext.

mod mnemonic;
mod passphrase;
mod secret;
mod sharing;
mod splitter;

pub use mnemonic::{
    pad_to_block, strip_block_padding, Mnemonic, MnemonicCodec, MnemonicError, BITS_PER_WORD,
    BLOCK_SIZE, MAX_ENTROPY_SIZE,
};
pub use passphrase::{
    CipherError, EncryptedShard, KdfParams, Password, ShardCipher, DEFAULT_KDF_ITERATIONS,
    KEY_SIZE, SALT_SIZE,
};
pub use secret::{CustodyKey, CustodyKeyError, CUSTODY_KEY_SIZE};
pub use sharing::{SecretSharingEngine, ShamirEngine, SharingError, MAX_SHARES};
pub use splitter::{KeySplitError, KeySplitter, RECONSTRUCTION_TAG_SIZE};
