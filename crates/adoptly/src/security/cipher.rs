//! AES-256-GCM encryption for stored message bodies.
//!
//! Every call to [`MessageCipher::seal`] draws a fresh 96-bit nonce from the OS RNG; the nonce
//! is persisted next to the ciphertext in the message's `iv` field.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("message encryption failed")]
    Encrypt,
    #[error("message could not be decrypted")]
    Decrypt,
    #[error("stored message encoding is invalid")]
    Encoding,
}

/// Ciphertext and nonce, both base64 encoded for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub ciphertext: String,
    pub iv: String,
}

#[derive(Clone)]
pub struct MessageCipher {
    cipher: Aes256Gcm,
}

impl MessageCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    pub fn seal(&self, plaintext: &str) -> Result<SealedMessage, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        Ok(SealedMessage {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce),
        })
    }

    pub fn open(&self, ciphertext: &str, iv: &str) -> Result<String, CipherError> {
        let nonce = STANDARD.decode(iv).map_err(|_| CipherError::Encoding)?;
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::Encoding);
        }
        let ciphertext = STANDARD.decode(ciphertext).map_err(|_| CipherError::Encoding)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CipherError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::Encoding)
    }
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MessageCipher(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_plaintexts_get_distinct_nonces() {
        let cipher = MessageCipher::new(&[3u8; 32]);
        let first = cipher.seal("is Biscuit still available?").expect("seal");
        let second = cipher.seal("is Biscuit still available?").expect("seal");

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_eq!(
            cipher.open(&first.ciphertext, &first.iv).expect("open"),
            "is Biscuit still available?"
        );
    }

    #[test]
    fn wrong_key_or_nonce_fails() {
        let sealed = MessageCipher::new(&[3u8; 32]).seal("hello").expect("seal");

        let other = MessageCipher::new(&[4u8; 32]);
        assert!(matches!(
            other.open(&sealed.ciphertext, &sealed.iv),
            Err(CipherError::Decrypt)
        ));

        let cipher = MessageCipher::new(&[3u8; 32]);
        assert!(matches!(
            cipher.open(&sealed.ciphertext, "c2hvcnQ="),
            Err(CipherError::Encoding)
        ));
    }
}
