//! Access token cipher.
//!
//! Tokens are AES-256-CBC (PKCS#7) over a camelCase JSON object, hex encoded
//! so they survive the `[A-Za-z0-9]` command grammar.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use secrecy::ExposeSecret;
use tracing::error;

use crate::access::types::AccessToken;
use crate::config::CodecConfig;
use crate::error::CodecError;

type Decryptor = cbc::Decryptor<Aes256>;
type Encryptor = cbc::Encryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Symmetric codec for access tokens, keyed once at startup.
#[derive(Clone)]
pub struct TokenCodec {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from raw key and IV bytes.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CodecError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CodecError::KeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CodecError::IvLength {
            expected: IV_LEN,
            actual: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self, CodecError> {
        Self::new(
            config.key.expose_secret().as_bytes(),
            config.iv.expose_secret().as_bytes(),
        )
    }

    /// Decode a token. Fails closed: any error is logged and yields `None`.
    pub fn decrypt(&self, cipher_text: &str) -> Option<AccessToken> {
        match self.try_decrypt(cipher_text) {
            Ok(token) => Some(token),
            Err(e) => {
                error!(error = %e, "Access token could not be decoded");
                None
            }
        }
    }

    /// Decode a token, keeping the failure reason.
    pub fn try_decrypt(&self, cipher_text: &str) -> Result<AccessToken, CodecError> {
        let bytes = hex::decode(cipher_text)?;
        let plain = Decryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| CodecError::Decrypt)?;
        let json = String::from_utf8(plain)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Mint a token for a printed access code.
    pub fn encrypt(&self, token: &AccessToken) -> Result<String, CodecError> {
        let json = serde_json::to_vec(token)?;
        let cipher = Encryptor::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(&json);
        Ok(hex::encode(cipher))
    }
}
