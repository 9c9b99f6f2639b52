//! Threshold splitting of a mnemonic secret behind a password
//!
//! Splitting encrypts first and shares second:
//!
//! ```text
//! secret mnemonic ──decode──▶ key bytes ──protect(password)──▶ salt ‖ nonce ‖ ct ‖ tag
//!                                                               │ append tag4
//!                                                               ▼
//!                                               composite blob ──split(n, t)──▶ n shares
//!                                                               each share ──pad──encode──▶ mnemonic
//! ```
//!
//! `tag4` is the first four bytes of SHA-256 over the rest of the blob. The
//! sharing engine cannot tell when it was handed too few shares, so `tag4`
//! is what separates "not enough shares" (tag mismatch) from "wrong password"
//! (tag matches, AEAD rejects).

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use super::mnemonic::{pad_to_block, strip_block_padding, Mnemonic, MnemonicCodec, MnemonicError};
use super::passphrase::{CipherError, EncryptedShard, Password, ShardCipher};
use super::sharing::{SecretSharingEngine, ShamirEngine, SharingError, MAX_SHARES};
use crate::config::KeySplitConfig;

/// Length of the reconstruction check appended to the composite blob
pub const RECONSTRUCTION_TAG_SIZE: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum KeySplitError {
    #[error("invalid threshold: {threshold} of {shares} (need 1 <= t <= n <= 255)")]
    InvalidThreshold { threshold: usize, shares: usize },
    #[error("invalid secret mnemonic: {0}")]
    InvalidSecret(String),
    #[error("no password supplied and no default password configured")]
    MissingPassword,
    /// Too few, inconsistent or foreign shares
    #[error("could not reconstruct the secret from the supplied shares")]
    ReconstructionFailed,
    #[error("wrong password")]
    WrongPassword,
    #[error("share mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),
    #[error("key split error: {0}")]
    Default(#[from] anyhow::Error),
}

impl From<CipherError> for KeySplitError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::DecryptionFailed => KeySplitError::WrongPassword,
            CipherError::Default(e) => KeySplitError::Default(e),
        }
    }
}

/// Splits a secret mnemonic into share mnemonics and recombines them
#[derive(Debug, Clone)]
pub struct KeySplitter<E = ShamirEngine> {
    engine: E,
    codec: MnemonicCodec,
    cipher: ShardCipher,
    password: Option<Password>,
}

impl KeySplitter<ShamirEngine> {
    pub fn new(config: &KeySplitConfig) -> Self {
        Self::with_engine(ShamirEngine, config)
    }
}

impl<E: SecretSharingEngine> KeySplitter<E> {
    pub fn with_engine(engine: E, config: &KeySplitConfig) -> Self {
        Self {
            engine,
            codec: config.codec(),
            cipher: config.cipher(),
            password: config.password.clone(),
        }
    }

    pub fn codec(&self) -> &MnemonicCodec {
        &self.codec
    }

    fn password<'a>(&'a self, explicit: Option<&'a Password>) -> Result<&'a Password, KeySplitError> {
        explicit
            .or(self.password.as_ref())
            .ok_or(KeySplitError::MissingPassword)
    }

    /// Split `secret` into `n` share mnemonics, any `t` of which recombine
    ///
    /// `password` overrides the configured default password.
    pub async fn split(
        &self,
        secret: &Mnemonic,
        n: usize,
        t: usize,
        password: Option<&Password>,
    ) -> Result<Vec<Mnemonic>, KeySplitError> {
        if t == 0 || t > n || n > MAX_SHARES {
            return Err(KeySplitError::InvalidThreshold {
                threshold: t,
                shares: n,
            });
        }
        let password = self.password(password)?;

        let normalized: String = secret.as_str().nfkd().collect();
        let key = bip39::Mnemonic::parse_in_normalized(self.codec.language(), &normalized)
            .map_err(|e| KeySplitError::InvalidSecret(e.to_string()))?
            .to_entropy();

        let encrypted = self.cipher.protect(&key, password).await?;
        let mut blob = encrypted.to_bytes();
        let tag = reconstruction_tag(&blob);
        blob.extend_from_slice(&tag);

        let shares = self.engine.split(&blob, n, t).map_err(|e| match e {
            SharingError::InvalidThreshold { threshold, shares } => {
                KeySplitError::InvalidThreshold { threshold, shares }
            }
            e => KeySplitError::Default(e.into()),
        })?;

        let mnemonics = shares
            .iter()
            .map(|share| self.codec.encode(&pad_to_block(share)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(shares = n, threshold = t, "secret split");
        Ok(mnemonics)
    }

    /// Recombine share mnemonics into the original secret mnemonic
    ///
    /// # Errors
    ///
    /// - [`KeySplitError::ReconstructionFailed`] if fewer than the threshold of
    ///   valid shares were supplied, or shares from different splits were mixed
    /// - [`KeySplitError::WrongPassword`] if the shares recombine but the
    ///   password does not decrypt the result
    /// - [`KeySplitError::Mnemonic`] if a share mnemonic itself is malformed
    pub async fn combine(
        &self,
        shares: &[Mnemonic],
        password: Option<&Password>,
    ) -> Result<Mnemonic, KeySplitError> {
        let password = self.password(password)?;

        let mut raw = Vec::with_capacity(shares.len());
        for share in shares {
            let padded = self.codec.decode(share)?;
            raw.push(strip_block_padding(&padded)?.to_vec());
        }

        let blob = self.engine.combine(&raw).map_err(|e| {
            tracing::warn!(error = %e, "sharing engine rejected shares");
            KeySplitError::ReconstructionFailed
        })?;

        if blob.len() < RECONSTRUCTION_TAG_SIZE {
            return Err(KeySplitError::ReconstructionFailed);
        }
        let (body, tag) = blob.split_at(blob.len() - RECONSTRUCTION_TAG_SIZE);
        if reconstruction_tag(body) != tag {
            tracing::warn!(shares = shares.len(), "reconstructed blob failed its integrity tag");
            return Err(KeySplitError::ReconstructionFailed);
        }

        let encrypted =
            EncryptedShard::from_bytes(body).map_err(|_| KeySplitError::ReconstructionFailed)?;
        let key = self.cipher.reveal(&encrypted, password).await?;

        let secret = self.codec.encode(&key)?;
        tracing::info!(shares = shares.len(), "secret reconstructed");
        Ok(secret)
    }
}

fn reconstruction_tag(body: &[u8]) -> [u8; RECONSTRUCTION_TAG_SIZE] {
    let digest = Sha256::digest(body);
    let mut tag = [0u8; RECONSTRUCTION_TAG_SIZE];
    tag.copy_from_slice(&digest[..RECONSTRUCTION_TAG_SIZE]);
    tag
}
