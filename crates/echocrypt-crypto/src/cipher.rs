//! Single-message AEAD encryption with a nonce-prefixed wire format.
//!
//! Wire format: `nonce(12) || AES-256-GCM(key, nonce, plaintext)`. The
//! nonce rides with the ciphertext because AEAD security only requires it
//! to be unique per key, not secret; a separate channel for nonces would
//! add complexity for no benefit.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use echocrypt_core::{Environment, NONCE_LEN};

use crate::error::CryptoError;
use crate::room_key::RoomKey;

/// Encrypt a message under a room key with a fresh random nonce.
///
/// Every call draws a new 96-bit nonce from the environment CSPRNG, so
/// encrypting identical plaintexts twice yields different ciphertexts.
///
/// # Errors
///
/// Returns `CryptoError::Aead` if the cipher rejects the input (plaintext
/// beyond the AEAD length bound; does not happen for chat-sized messages).
pub fn encrypt<E: Environment>(
    env: &E,
    key: &RoomKey,
    plaintext: &str,
) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    env.random_bytes(&mut nonce);
    encrypt_with_nonce(key, plaintext, nonce)
}

/// Encrypt with a caller-supplied nonce.
///
/// Exists so tests can be deterministic. Callers are responsible for nonce
/// uniqueness under a given key; production code goes through [`encrypt`].
pub fn encrypt_with_nonce(
    key: &RoomKey,
    plaintext: &str,
    nonce: [u8; NONCE_LEN],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptoError::Aead)?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a nonce-prefixed ciphertext back to text.
///
/// Deterministic, no side effects.
///
/// # Errors
///
/// - `CryptoError::CiphertextTooShort` if the input cannot even hold the
///   nonce prefix
/// - `CryptoError::Aead` if tag verification fails (tampered data or wrong
///   key)
/// - `CryptoError::InvalidPlaintext` if the decrypted bytes are not UTF-8
pub fn decrypt(key: &RoomKey, ciphertext: &[u8]) -> Result<String, CryptoError> {
    if ciphertext.len() < NONCE_LEN {
        return Err(CryptoError::CiphertextTooShort { len: ciphertext.len(), min: NONCE_LEN });
    }

    let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let plaintext =
        cipher.decrypt(Nonce::from_slice(nonce), sealed).map_err(|_| CryptoError::Aead)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;

    fn key(byte: u8) -> RoomKey {
        RoomKey::from_bytes([byte; crate::room_key::KEY_LEN])
    }

    #[test]
    fn roundtrip() {
        let env = TestEnv::new();
        let k = key(1);

        let ct = encrypt(&env, &k, "hello, room").unwrap();
        assert_eq!(decrypt(&k, &ct).unwrap(), "hello, room");
    }

    #[test]
    fn roundtrip_empty_plaintext() {
        let env = TestEnv::new();
        let k = key(1);

        let ct = encrypt(&env, &k, "").unwrap();
        // Even an empty message carries nonce + tag
        assert!(ct.len() >= NONCE_LEN + 16);
        assert_eq!(decrypt(&k, &ct).unwrap(), "");
    }

    #[test]
    fn same_plaintext_twice_differs() {
        let env = TestEnv::new();
        let k = key(1);

        let ct1 = encrypt(&env, &k, "repeat").unwrap();
        let ct2 = encrypt(&env, &k, "repeat").unwrap();
        assert_ne!(ct1, ct2, "nonce must be re-randomized per call");
    }

    #[test]
    fn wrong_key_fails() {
        let env = TestEnv::new();

        let ct = encrypt(&env, &key(1), "secret").unwrap();
        assert!(matches!(decrypt(&key(2), &ct), Err(CryptoError::Aead)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let env = TestEnv::new();
        let k = key(1);

        let mut ct = encrypt(&env, &k, "integrity matters").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;

        assert!(matches!(decrypt(&k, &ct), Err(CryptoError::Aead)));
    }

    #[test]
    fn tampered_nonce_fails() {
        let env = TestEnv::new();
        let k = key(1);

        let mut ct = encrypt(&env, &k, "integrity matters").unwrap();
        ct[0] ^= 0x80;

        assert!(matches!(decrypt(&k, &ct), Err(CryptoError::Aead)));
    }

    #[test]
    fn short_input_fails_before_aead() {
        let k = key(1);

        for len in 0..NONCE_LEN {
            let result = decrypt(&k, &vec![0u8; len]);
            assert!(matches!(result, Err(CryptoError::CiphertextTooShort { .. })), "len {len}");
        }
    }

    #[test]
    fn deterministic_with_fixed_nonce() {
        let k = key(3);
        let nonce = [9u8; NONCE_LEN];

        let ct1 = encrypt_with_nonce(&k, "same", nonce).unwrap();
        let ct2 = encrypt_with_nonce(&k, "same", nonce).unwrap();
        assert_eq!(ct1, ct2);
    }
}
