//! Encryption of the stored app password.
//!
//! The settings file may hold the app password sealed with AES-256-GCM. The
//! key comes from the `SKYTHREAD_ENCRYPTION_KEY` environment variable; a
//! sealed secret is hex of `nonce || ciphertext || tag` and is stored in the
//! settings file with `"secretEncrypted": true`.

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use log::debug;
use std::env;

/// Environment variable holding the hex-encoded 32-byte key.
pub const ENCRYPTION_KEY_VAR: &str = "SKYTHREAD_ENCRYPTION_KEY";

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Seals and opens app passwords for the settings file.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Builds the cipher from `SKYTHREAD_ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self, BoxError> {
        let key_hex = env::var(ENCRYPTION_KEY_VAR).map_err(|_| {
            format!(
                "{} is not set, so the app password in the settings file cannot be sealed or opened \
                 (generate a key with: openssl rand -hex 32)",
                ENCRYPTION_KEY_VAR
            )
        })?;
        Self::from_hex_key(&key_hex)
    }

    /// Builds the cipher from a 64-character hex key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, BoxError> {
        let key = hex::decode(key_hex.trim())
            .map_err(|e| format!("{} is not valid hex: {}", ENCRYPTION_KEY_VAR, e))?;
        if key.len() != KEY_LENGTH {
            return Err(format!(
                "{} must decode to {} bytes (64 hex chars), got {} bytes",
                ENCRYPTION_KEY_VAR,
                KEY_LENGTH,
                key.len()
            )
            .into());
        }
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| format!("Unusable {}: {}", ENCRYPTION_KEY_VAR, e))?;
        Ok(SecretCipher { cipher })
    }

    /// Seals an app password; every call uses a fresh nonce.
    pub fn seal(&self, app_password: &str) -> Result<String, BoxError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| format!("No randomness available to seal the app password: {}", e))?;
        let nonce: Nonce<U12> = nonce_bytes.into();

        let sealed = self
            .cipher
            .encrypt(&nonce, app_password.as_bytes())
            .map_err(|e| format!("Could not seal the app password: {}", e))?;

        let mut stored = Vec::with_capacity(NONCE_LENGTH + sealed.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&sealed);
        Ok(hex::encode(stored))
    }

    /// Opens an app password read from the settings file.
    pub fn open(&self, stored_hex: &str) -> Result<String, BoxError> {
        let stored = hex::decode(stored_hex.trim())
            .map_err(|e| format!("Stored app password is not hex: {}", e))?;
        if stored.len() < NONCE_LENGTH {
            return Err("Stored app password is truncated".into());
        }

        let (nonce_bytes, sealed) = stored.split_at(NONCE_LENGTH);
        let nonce = Nonce::<U12>::from_slice(nonce_bytes);
        let plaintext = self.cipher.decrypt(nonce, sealed).map_err(|_| {
            format!(
                "Cannot open the stored app password: {} differs from the key it was saved with, \
                 or the settings file was edited",
                ENCRYPTION_KEY_VAR
            )
        })?;

        String::from_utf8(plaintext)
            .map_err(|e| format!("Stored app password is not UTF-8: {}", e).into())
    }
}

/// Seals `app_password` with the key from the environment.
pub fn encrypt_secret(app_password: &str) -> Result<String, BoxError> {
    let sealed = SecretCipher::from_env()?.seal(app_password)?;
    debug!("App password sealed for the settings file");
    Ok(sealed)
}

/// Opens a value produced by [`encrypt_secret`].
pub fn decrypt_secret(stored_hex: &str) -> Result<String, BoxError> {
    let app_password = SecretCipher::from_env()?.open(stored_hex)?;
    debug!("App password opened from the settings file");
    Ok(app_password)
}

/// `true` if a key is set (it may still be invalid).
pub fn is_encryption_configured() -> bool {
    env::var(ENCRYPTION_KEY_VAR).is_ok()
}

/// Fails at startup on a malformed key rather than on the first settings save.
pub fn validate_encryption_config() -> Result<(), BoxError> {
    SecretCipher::from_env()?;
    Ok(())
}

/// Serializes tests that touch the encryption key variable.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) const TEST_KEY: &str =
    "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
