//! Random per-upload keys for remote custody blobs
//!
//! A shard handed to a remote custodian is encrypted under a freshly generated
//! 256-bit key with ChaCha20-Poly1305. The key is never stored next to the
//! blob; it travels out of band inside a retrieval capability.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const CUSTODY_KEY_SIZE: usize = 32;
/// Size of BLAKE3 hash in bytes (256 bits)
pub const BLAKE3_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CustodyKeyError {
    #[error("invalid custody key: {0}")]
    InvalidKey(String),
    /// Wrong key, tampered ciphertext or corrupted plaintext
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("custody key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric key protecting one remotely stored shard
///
/// The encrypted format is: `nonce (12 bytes) || encrypted(hash(32 bytes) || plaintext) || tag (16 bytes)`.
/// The BLAKE3 hash of the plaintext is sealed with the data and checked on
/// decryption, so a key that happens to authenticate garbage is still caught.
#[derive(Clone, PartialEq, Eq)]
pub struct CustodyKey([u8; CUSTODY_KEY_SIZE]);

impl fmt::Debug for CustodyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustodyKey(***)")
    }
}

impl From<[u8; CUSTODY_KEY_SIZE]> for CustodyKey {
    fn from(bytes: [u8; CUSTODY_KEY_SIZE]) -> Self {
        CustodyKey(bytes)
    }
}

impl CustodyKey {
    /// Generate a new random key using a cryptographically secure RNG
    pub fn generate() -> Result<Self, CustodyKeyError> {
        let mut buff = [0; CUSTODY_KEY_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `CUSTODY_KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CustodyKeyError> {
        if data.len() != CUSTODY_KEY_SIZE {
            return Err(CustodyKeyError::InvalidKey(format!(
                "expected {} bytes, got {}",
                CUSTODY_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; CUSTODY_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    pub fn from_base64(data: &str) -> Result<Self, CustodyKeyError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| CustodyKeyError::InvalidKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Encrypt data using ChaCha20-Poly1305 AEAD
    ///
    /// A random nonce is generated for each encryption operation.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CustodyKeyError> {
        let plaintext_hash = blake3::hash(data);

        let mut data_with_hash = Vec::with_capacity(BLAKE3_HASH_SIZE + data.len());
        data_with_hash.extend_from_slice(plaintext_hash.as_bytes());
        data_with_hash.extend_from_slice(data);

        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data_with_hash.as_ref())
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Decrypt data produced by [`CustodyKey::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns [`CustodyKeyError::DecryptionFailed`] if:
    /// - Data is too short to contain a nonce
    /// - Authentication tag verification fails (data was tampered with or wrong key)
    /// - Hash verification fails (data corruption)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CustodyKeyError> {
        if data.len() < NONCE_SIZE {
            return Err(CustodyKeyError::DecryptionFailed);
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        let decrypted = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| CustodyKeyError::DecryptionFailed)?;

        if decrypted.len() < BLAKE3_HASH_SIZE {
            return Err(CustodyKeyError::DecryptionFailed);
        }

        let (stored_hash, plaintext) = decrypted.split_at(BLAKE3_HASH_SIZE);
        if stored_hash != blake3::hash(plaintext).as_bytes() {
            return Err(CustodyKeyError::DecryptionFailed);
        }

        Ok(plaintext.to_vec())
    }
}

impl FromStr for CustodyKey {
    type Err = CustodyKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl Serialize for CustodyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for CustodyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_custody_key_encrypt_decrypt() {
        let key = CustodyKey::generate().unwrap();
        let data = b"padded share bytes headed for a custodian";

        let encrypted = key.encrypt(data).unwrap();
        let decrypted = key.decrypt(&encrypted).unwrap();

        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_wrong_key() {
        let key = CustodyKey::generate().unwrap();
        let other = CustodyKey::generate().unwrap();
        let encrypted = key.encrypt(b"data").unwrap();

        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CustodyKeyError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_key_size_validation() {
        assert!(CustodyKey::from_slice(&[1u8; 16]).is_err());
        assert!(CustodyKey::from_slice(&[1u8; 64]).is_err());
        assert!(CustodyKey::from_slice(&[1u8; CUSTODY_KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_tampered_ciphertext() {
        let key = CustodyKey::generate().unwrap();
        let mut encrypted = key.encrypt(b"test data for integrity check").unwrap();
        encrypted[NONCE_SIZE + 10] ^= 0xFF;

        assert!(matches!(
            key.decrypt(&encrypted),
            Err(CustodyKeyError::DecryptionFailed)
        ));
        assert!(matches!(
            key.decrypt(&[0u8; 4]),
            Err(CustodyKeyError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = CustodyKey::generate().unwrap();
        let encoded = key.to_base64();
        assert_eq!(encoded.parse::<CustodyKey>().unwrap(), key);

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", encoded));
        assert_eq!(serde_json::from_str::<CustodyKey>(&json).unwrap(), key);

        assert!("!!!".parse::<CustodyKey>().is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = CustodyKey::from([7u8; CUSTODY_KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "CustodyKey(***)");
    }
}
