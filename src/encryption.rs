use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce
};
use serde_derive::{Serialize, Deserialize};
use crate::base64;
use crate::errors::AppError;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 24;

#[derive(Serialize, Deserialize, Debug)]
pub struct EncryptedData {
    pub nonce: String,
    pub data: String,
}

/// Seals bot tokens before they reach a durable store.
#[derive(Clone)]
pub struct Encryption {
    cipher: XChaCha20Poly1305,
}

impl Encryption {
    /// `key_base64` is 32 bytes of key material, base64 encoded without padding.
    pub fn with(key_base64: &str) -> Result<Encryption, AppError> {
        let key = base64::decode_no_pad(key_base64.trim().trim_end_matches('=').as_bytes())
            .map_err(|_| AppError::ConfigurationError("TOKEN_ENCRYPTION_KEY is not valid base64".to_string()))?;

        if key.len() != KEY_LENGTH {
            return Err(AppError::ConfigurationError(format!("TOKEN_ENCRYPTION_KEY must decode to {} bytes, got {}", KEY_LENGTH, key.len())));
        }

        Ok(Encryption {
            cipher: XChaCha20Poly1305::new(key.as_slice().into()),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedData, AppError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng); // 192-bits; unique per message
        let ciphertext = self.cipher.encrypt(&nonce, plaintext.as_bytes())?;

        Ok(EncryptedData{
            nonce: base64::encode_no_pad(nonce.as_slice()),
            data: base64::encode_no_pad(&ciphertext),
        })
    }

    pub fn decrypt(&self, encrypted_data: &EncryptedData) -> Result<String, AppError> {
        let nonce_bytes = base64::decode_no_pad(encrypted_data.nonce.as_ref())?;
        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(AppError::UnexpectedError(format!("Stored nonce has {} bytes", nonce_bytes.len())));
        }
        let encrypted = base64::decode_no_pad(encrypted_data.data.as_ref())?;

        let nonce = XNonce::from_slice(nonce_bytes.as_slice());
        let plaintext = self.cipher.decrypt(nonce, encrypted.as_slice())?;

        String::from_utf8(plaintext).map_err(|err| AppError::UnexpectedError(err.to_string()))
    }

    /// Serialized envelope as stored in the `bot_token` column/attribute.
    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(serde_json::to_string(&self.encrypt(plaintext)?)?)
    }

    pub fn open(&self, sealed: &str) -> Result<String, AppError> {
        let encrypted: EncryptedData = serde_json::from_str(sealed)?;
        self.decrypt(&encrypted)
    }
}

#[cfg(test)]
mod tests {
    use crate::{base64::encode_no_pad, encryption::Encryption};

    fn test_key() -> String {
        encode_no_pad(b"plain text key which should be s")
    }

    #[test]
    fn seal_and_open_bot_token() {
        let encryption = Encryption::with(&test_key()).expect("valid key");

        let sealed = encryption.seal("xoxb-secret").expect("Failed to encrypt token");
        assert!(!sealed.contains("xoxb-secret"));

        let opened = encryption.open(&sealed).expect("failed to decrypt sealed token");
        assert_eq!(opened, "xoxb-secret");
    }

    #[test]
    fn same_token_seals_differently_each_time() {
        let encryption = Encryption::with(&test_key()).expect("valid key");

        let first = encryption.seal("xoxb-secret").expect("seal");
        let second = encryption.seal("xoxb-secret").expect("seal");

        assert_ne!(first, second);
    }

    #[test]
    fn rejects_short_key() {
        assert!(Encryption::with(&encode_no_pad(b"too short")).is_err());
    }

    #[test]
    fn wrong_key_cannot_open() {
        let sealed = Encryption::with(&test_key()).expect("valid key").seal("xoxb-secret").expect("seal");
        let other = Encryption::with(&encode_no_pad(b"another key which is 32 bytes lo")).expect("valid key");

        assert!(other.open(&sealed).is_err());
    }
}
