//! Threshold secret sharing
//!
//! The finite-field arithmetic is delegated to the `sharks` crate (Shamir over
//! GF(256)). Shares travel as plain bytes, `x ‖ y…`: one index byte followed
//! by one share byte per secret byte.

use std::collections::HashSet;

use sharks::{Share, Sharks};

/// Largest number of shares GF(256) can index (x = 0 is reserved for the secret)
pub const MAX_SHARES: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SharingError {
    #[error("invalid threshold: {threshold} of {shares} (need 1 <= t <= n <= 255)")]
    InvalidThreshold { threshold: usize, shares: usize },
    #[error("cannot split an empty secret")]
    EmptySecret,
    #[error("no shares supplied")]
    NoShares,
    #[error("malformed share: {0}")]
    MalformedShare(String),
}

/// Splits a secret into `n` shares of which any `t` reconstruct it
///
/// `combine` interpolates over every distinct share it is given and does not
/// know the threshold: handing it fewer than `t` shares produces garbage, not
/// an error. Callers detect that through their own integrity checks.
pub trait SecretSharingEngine: Send + Sync {
    fn split(&self, secret: &[u8], n: usize, t: usize) -> Result<Vec<Vec<u8>>, SharingError>;

    fn combine(&self, shares: &[Vec<u8>]) -> Result<Vec<u8>, SharingError>;
}

/// Shamir secret sharing over GF(256)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShamirEngine;

impl SecretSharingEngine for ShamirEngine {
    fn split(&self, secret: &[u8], n: usize, t: usize) -> Result<Vec<Vec<u8>>, SharingError> {
        if t == 0 || t > n || n > MAX_SHARES {
            return Err(SharingError::InvalidThreshold {
                threshold: t,
                shares: n,
            });
        }
        if secret.is_empty() {
            return Err(SharingError::EmptySecret);
        }

        let shares = Sharks(t as u8)
            .dealer(secret)
            .take(n)
            .map(|share| Vec::from(&share))
            .collect();
        Ok(shares)
    }

    fn combine(&self, shares: &[Vec<u8>]) -> Result<Vec<u8>, SharingError> {
        let mut seen = HashSet::new();
        let mut distinct = Vec::with_capacity(shares.len());
        for bytes in shares {
            let share = Share::try_from(bytes.as_slice())
                .map_err(|e| SharingError::MalformedShare(e.to_string()))?;
            // first byte is the share index
            if seen.insert(bytes[0]) {
                distinct.push(share);
            }
        }
        if distinct.is_empty() {
            return Err(SharingError::NoShares);
        }

        // interpolate over everything supplied; the real threshold is unknown here
        Sharks(distinct.len() as u8)
            .recover(distinct.as_slice())
            .map_err(|e| SharingError::MalformedShare(e.to_string()))
    }
}
