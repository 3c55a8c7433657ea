//! At-rest sealing of credential values.
//!
//! Values are XORed with a SHA-256 counter-mode keystream under a random
//! nonce and carry a keyed integrity tag. The key is derived from caller
//! material, by default the machine id.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_SALT: &[u8] = b"catalog-installer-credential-salt";
const FALLBACK_MACHINE_ID: &str = "catalog-installer-default-machine-id";
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Reasons a sealed value cannot be opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum CipherError {
    #[error("value is not valid base64")]
    Encoding,
    #[error("value is truncated")]
    Truncated,
    #[error("integrity check failed")]
    Integrity,
    #[error("value is not valid UTF-8")]
    Utf8,
}

#[derive(Clone)]
pub(crate) struct Cipher {
    key: [u8; 32],
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    pub(crate) fn from_key_material(material: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(material);
        hasher.update(KEY_SALT);
        Self {
            key: hasher.finalize().into(),
        }
    }

    /// Cipher keyed to this machine.
    pub(crate) fn for_machine() -> Self {
        Self::from_key_material(machine_id().as_bytes())
    }

    pub(crate) fn seal(&self, plaintext: &str) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut body = plaintext.as_bytes().to_vec();
        self.apply_keystream(&nonce, &mut body);
        let tag = self.tag(&nonce, &body);

        let mut sealed = Vec::with_capacity(NONCE_LEN + TAG_LEN + body.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&tag);
        sealed.extend_from_slice(&body);
        BASE64.encode(sealed)
    }

    pub(crate) fn open(&self, sealed: &str) -> Result<String, CipherError> {
        let raw = BASE64.decode(sealed).map_err(|_| CipherError::Encoding)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated);
        }
        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, body) = rest.split_at(TAG_LEN);

        let expected = self.tag(nonce, body);
        let diff = expected
            .iter()
            .zip(tag)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff != 0 {
            return Err(CipherError::Integrity);
        }

        let mut plain = body.to_vec();
        self.apply_keystream(nonce, &mut plain);
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }

    fn apply_keystream(&self, nonce: &[u8], data: &mut [u8]) {
        for (counter, chunk) in data.chunks_mut(32).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(self.key);
            hasher.update(nonce);
            hasher.update((counter as u64).to_le_bytes());
            let block = hasher.finalize();
            for (byte, k) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= k;
            }
        }
    }

    fn tag(&self, nonce: &[u8], body: &[u8]) -> [u8; TAG_LEN] {
        let inner = Sha256::new()
            .chain_update(self.key)
            .chain_update(nonce)
            .chain_update(body)
            .finalize();
        let outer = Sha256::new()
            .chain_update(self.key)
            .chain_update(inner)
            .finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&outer[..TAG_LEN]);
        tag
    }
}

/// Best-effort stable machine identifier.
fn machine_id() -> String {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(id) = std::fs::read_to_string(path) {
            let id = id.trim();
            if !id.is_empty() {
                return id.to_string();
            }
        }
    }
    FALLBACK_MACHINE_ID.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let cipher = Cipher::from_key_material(b"test-key");
        let sealed = cipher.seal("ghp_secret_token_value_longer_than_one_block_of_32");
        assert!(!sealed.contains("ghp_"));
        assert_eq!(
            cipher.open(&sealed).unwrap(),
            "ghp_secret_token_value_longer_than_one_block_of_32"
        );
    }

    #[test]
    fn test_empty_value() {
        let cipher = Cipher::from_key_material(b"test-key");
        let sealed = cipher.seal("");
        assert_eq!(cipher.open(&sealed).unwrap(), "");
    }

    #[test]
    fn test_nonce_varies() {
        let cipher = Cipher::from_key_material(b"test-key");
        assert_ne!(cipher.seal("same"), cipher.seal("same"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = Cipher::from_key_material(b"one").seal("value");
        let result = Cipher::from_key_material(b"two").open(&sealed);
        assert_eq!(result, Err(CipherError::Integrity));
    }

    #[test]
    fn test_tampering_rejected() {
        let cipher = Cipher::from_key_material(b"test-key");
        let mut raw = BASE64.decode(cipher.seal("value")).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert_eq!(cipher.open(&BASE64.encode(raw)), Err(CipherError::Integrity));
    }

    #[test]
    fn test_malformed_input() {
        let cipher = Cipher::from_key_material(b"test-key");
        assert_eq!(cipher.open("not base64!"), Err(CipherError::Encoding));
        assert_eq!(cipher.open(&BASE64.encode([0u8; 4])), Err(CipherError::Truncated));
    }

    #[test]
    fn test_machine_cipher_round_trips() {
        let cipher = Cipher::for_machine();
        assert_eq!(cipher.open(&cipher.seal("v")).unwrap(), "v");
    }
}
