//! Password based encryption of shard bytes
//!
//! A key is stretched from the password with PBKDF2-HMAC-SHA512 over a fresh
//! random salt, then used for AES-128-GCM. The stored form is
//! `salt (16) ‖ nonce (12) ‖ ciphertext ‖ tag (16)`; the salt travels with the
//! blob so only the password is needed to reverse it.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;

/// Size of the PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 16;
/// Size of the derived AES key in bytes (128 bits)
pub const KEY_SIZE: usize = 16;
/// Size of the AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;
/// Default PBKDF2 iteration count
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Authentication failed or the blob is malformed
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("cipher error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A user supplied password
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

impl From<String> for Password {
    fn from(password: String) -> Self {
        Self(password)
    }
}

/// Key derivation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Derive a key synchronously. Prefer [`ShardCipher`], which keeps this off
    ///  the async executor.
    pub fn derive(&self, password: &Password, salt: &[u8]) -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, self.iterations, &mut key);
        key
    }
}

/// Salt plus authenticated ciphertext, as produced by [`ShardCipher::protect`]
///
/// `ciphertext` holds `nonce ‖ ciphertext ‖ tag`. Serializes as a single hex
/// string of [`EncryptedShard::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedShard {
    pub salt: [u8; SALT_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedShard {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a stored blob back into salt and ciphertext
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] if the blob cannot hold a salt,
    /// a nonce and a tag.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CipherError> {
        if data.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::DecryptionFailed);
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&data[..SALT_SIZE]);
        Ok(Self {
            salt,
            ciphertext: data[SALT_SIZE..].to_vec(),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(data: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(data.trim()).map_err(|_| CipherError::DecryptionFailed)?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for EncryptedShard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncryptedShard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Password based confidentiality for shard bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardCipher {
    kdf: KdfParams,
}

impl ShardCipher {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypt `plaintext` under `password` with a freshly generated salt
    pub async fn protect(
        &self,
        plaintext: &[u8],
        password: &Password,
    ) -> Result<EncryptedShard, CipherError> {
        let mut salt = [0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| anyhow::anyhow!("failed to generate salt: {}", e))?;

        let key = self.derive_key(password, salt).await?;
        let cipher = Aes128Gcm::new_from_slice(&key)
            .map_err(|_| anyhow::anyhow!("invalid key length"))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
        ciphertext.extend_from_slice(&nonce_bytes);
        ciphertext.extend_from_slice(&sealed);

        Ok(EncryptedShard { salt, ciphertext })
    }

    /// Decrypt a blob produced by [`ShardCipher::protect`]
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] for a wrong password, a
    /// tampered blob or a blob too short to be valid.
    pub async fn reveal(
        &self,
        shard: &EncryptedShard,
        password: &Password,
    ) -> Result<Vec<u8>, CipherError> {
        if shard.ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::DecryptionFailed);
        }

        let key = self.derive_key(password, shard.salt).await?;
        let cipher = Aes128Gcm::new_from_slice(&key)
            .map_err(|_| anyhow::anyhow!("invalid key length"))?;

        let (nonce, sealed) = shard.ciphertext.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::DecryptionFailed)
    }

    async fn derive_key(
        &self,
        password: &Password,
        salt: [u8; SALT_SIZE],
    ) -> Result<[u8; KEY_SIZE], CipherError> {
        let kdf = self.kdf;
        let password = password.clone();
        let key = tokio::task::spawn_blocking(move || kdf.derive(&password, &salt))
            .await
            .map_err(|e| anyhow::anyhow!("key derivation task failed: {}", e))?;
        Ok(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fast_cipher() -> ShardCipher {
        ShardCipher::new(KdfParams::with_iterations(1_000))
    }

    #[tokio::test]
    async fn test_protect_reveal() {
        let cipher = fast_cipher();
        let password = Password::from("correct horse");
        let data = b"share bytes to protect";

        let encrypted = cipher.protect(data, &password).await.unwrap();
        assert_eq!(
            encrypted.ciphertext.len(),
            NONCE_SIZE + data.len() + TAG_SIZE
        );

        let revealed = cipher.reveal(&encrypted, &password).await.unwrap();
        assert_eq!(revealed, data.to_vec());
    }

    #[tokio::test]
    async fn test_salt_is_fresh_every_call() {
        let cipher = fast_cipher();
        let password = Password::from("pw");

        let a = cipher.protect(b"same", &password).await.unwrap();
        let b = cipher.protect(b"same", &password).await.unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let cipher = fast_cipher();
        let encrypted = cipher
            .protect(b"data", &Password::from("right"))
            .await
            .unwrap();

        let result = cipher.reveal(&encrypted, &Password::from("wrong")).await;
        assert!(matches!(result, Err(CipherError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_tampered_blob() {
        let cipher = fast_cipher();
        let password = Password::from("pw");
        let mut encrypted = cipher.protect(b"data", &password).await.unwrap();
        encrypted.ciphertext[NONCE_SIZE] ^= 0x01;

        let result = cipher.reveal(&encrypted, &password).await;
        assert!(matches!(result, Err(CipherError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_iterations_are_part_of_the_key() {
        let password = Password::from("pw");
        let encrypted = fast_cipher().protect(b"data", &password).await.unwrap();

        let other = ShardCipher::new(KdfParams::with_iterations(1_001));
        let result = other.reveal(&encrypted, &password).await;
        assert!(matches!(result, Err(CipherError::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_default_parameters() {
        let cipher = ShardCipher::default();
        assert_eq!(cipher.kdf().iterations, DEFAULT_KDF_ITERATIONS);

        let password = Password::from("correct horse");
        let encrypted = cipher.protect(b"default kdf", &password).await.unwrap();
        assert_eq!(
            cipher.reveal(&encrypted, &password).await.unwrap(),
            b"default kdf".to_vec()
        );
    }

    #[test]
    fn test_kdf_is_deterministic() {
        let kdf = KdfParams::with_iterations(10);
        let password = Password::from("pw");
        assert_eq!(kdf.derive(&password, b"salt"), kdf.derive(&password, b"salt"));
        assert_ne!(kdf.derive(&password, b"salt"), kdf.derive(&password, b"pepper"));
    }

    #[test]
    fn test_encrypted_shard_bytes_and_serde() {
        let shard = EncryptedShard {
            salt: [3u8; SALT_SIZE],
            ciphertext: vec![9u8; NONCE_SIZE + TAG_SIZE + 5],
        };
        let parsed = EncryptedShard::from_bytes(&shard.to_bytes()).unwrap();
        assert_eq!(parsed, shard);

        let json = serde_json::to_string(&shard).unwrap();
        assert_eq!(json, format!("\"{}\"", shard.to_hex()));
        let back: EncryptedShard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shard);

        assert!(matches!(
            EncryptedShard::from_bytes(&[0u8; SALT_SIZE]),
            Err(CipherError::DecryptionFailed)
        ));
        assert!(EncryptedShard::from_hex("not hex").is_err());
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::from("hunter2");
        assert_eq!(format!("{:?}", password), "Password(***)");
    }
}
