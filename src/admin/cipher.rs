// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM envelope for ticket backups.
//!
//! Layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh random
//! nonce is drawn for every seal. The associated data binds the envelope to
//! this service, so a ciphertext produced under the same key for another
//! purpose does not open here.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

const BACKUP_AAD: &[u8] = b"relational-support-bridge/backup";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid backup key")]
    InvalidKey,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,
}

pub struct BackupCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl BackupCipher {
    /// Build a cipher from a raw 32-byte key.
    pub fn from_key(key: &[u8; 32]) -> Result<Self, CipherError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CipherError::InvalidKey)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build a cipher from the configured passphrase (SHA-256 of its bytes).
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CipherError> {
        if passphrase.is_empty() {
            return Err(CipherError::InvalidKey);
        }
        let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        Self::from_key(&digest)
    }

    /// Returns nonce || ciphertext || tag.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(BACKUP_AAD),
                &mut in_out,
            )
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut output = Vec::with_capacity(NONCE_LEN + in_out.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&in_out);
        Ok(output)
    }

    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if data.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CipherError::DecryptionFailed)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(BACKUP_AAD), &mut in_out)
            .map_err(|_| CipherError::DecryptionFailed)?;
        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> BackupCipher {
        BackupCipher::from_passphrase("correct horse battery staple").unwrap()
    }

    #[test]
    fn seal_then_open() {
        let cipher = cipher();
        let sealed = cipher.seal(b"[]").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 2 + 16);
        assert_eq!(cipher.open(&sealed).unwrap(), b"[]");
    }

    #[test]
    fn nonces_are_fresh() {
        let cipher = cipher();
        let a = cipher.seal(b"same").unwrap();
        let b = cipher.seal(b"same").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = cipher().seal(b"secret").unwrap();
        let other = BackupCipher::from_passphrase("another passphrase").unwrap();
        assert_eq!(other.open(&sealed), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let cipher = cipher();
        let mut sealed = cipher.seal(b"important").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert_eq!(cipher.open(&sealed), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn short_input_fails() {
        assert_eq!(cipher().open(&[0u8; 10]), Err(CipherError::DecryptionFailed));
        assert_eq!(cipher().open(&[]), Err(CipherError::DecryptionFailed));
    }

    #[test]
    fn empty_passphrase_rejected() {
        assert!(matches!(
            BackupCipher::from_passphrase(""),
            Err(CipherError::InvalidKey)
        ));
    }
}
