//! Software implementation of the platform keystore.
//!
//! Keys live in process memory and are zeroized on drop. This backs tests and
//! hosts without a hardware keystore; it does NOT enforce user presence, so
//! a [`CipherContext`] is usable as soon as it is created.

// Allow certain clippy lints for the simulation hooks
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroizing;

use super::keystore::{
    CipherContext, CipherMode, HardwareKeystore, KeySpec, KeystoreError, KeystoreResult,
};

/// IV length used by the software cipher (96-bit nonce).
pub const IV_LEN: usize = 12;

const KEY_LEN: usize = 32;
const KEY_BITS: u32 = 256;

struct StoredKey {
    material: SecretBox<[u8; KEY_LEN]>,
    invalidated: bool,
}

/// In-memory keystore using ChaCha20-Poly1305.
///
/// Besides the [`HardwareKeystore`] contract it exposes hooks that simulate
/// the platform events the engine has to survive:
/// - [`SoftwareKeystore::invalidate_key`]: a new biometric enrollment
/// - [`SoftwareKeystore::set_unavailable`]: a broken keystore backend
/// - [`SoftwareKeystore::set_cipher_failure`]: a key that exists but refuses
///   to initialise a cipher
pub struct SoftwareKeystore {
    keys: Mutex<HashMap<String, StoredKey>>,
    unavailable: AtomicBool,
    cipher_failure: AtomicBool,
    generated: AtomicUsize,
    deleted: AtomicUsize,
}

impl SoftwareKeystore {
    /// Creates an empty keystore.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            cipher_failure: AtomicBool::new(false),
            generated: AtomicUsize::new(0),
            deleted: AtomicUsize::new(0),
        }
    }

    /// Marks the key under `alias` as permanently invalidated, the way a new
    /// fingerprint enrollment does. Returns `false` if no such key exists.
    #[must_use]
    pub fn invalidate_key(&self, alias: &str) -> bool {
        let Ok(mut keys) = self.keys.lock() else {
            return false;
        };
        keys.get_mut(alias).is_some_and(|key| {
            key.invalidated = true;
            true
        })
    }

    /// Makes every operation fail with [`KeystoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes `init_cipher` fail with [`KeystoreError::Failure`] while key
    /// lookup, generation and deletion keep working.
    pub fn set_cipher_failure(&self, failing: bool) {
        self.cipher_failure.store(failing, Ordering::SeqCst);
    }

    /// Number of keys generated so far.
    #[must_use]
    pub fn generated_count(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// Number of `delete_key` calls so far.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> KeystoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KeystoreError::Unavailable(
                "software keystore disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> KeystoreResult<MutexGuard<'_, HashMap<String, StoredKey>>> {
        self.keys
            .lock()
            .map_err(|_| KeystoreError::Failure("mutex poisoned".to_string()))
    }
}

impl Default for SoftwareKeystore {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareKeystore for SoftwareKeystore {
    fn contains_key(&self, alias: String) -> KeystoreResult<bool> {
        self.check_available()?;
        Ok(self.lock()?.contains_key(&alias))
    }

    fn generate_key(&self, spec: KeySpec) -> KeystoreResult<()> {
        self.check_available()?;
        if spec.key_size_bits != KEY_BITS {
            return Err(KeystoreError::Failure(format!(
                "unsupported key size: {} bits",
                spec.key_size_bits
            )));
        }
        let mut material = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut material[..]);
        self.lock()?.insert(
            spec.alias,
            StoredKey {
                material: SecretBox::new(material),
                invalidated: false,
            },
        );
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_key(&self, alias: String) -> KeystoreResult<()> {
        self.check_available()?;
        self.lock()?.remove(&alias);
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn init_cipher(
        &self,
        alias: String,
        mode: CipherMode,
        iv: Option<Vec<u8>>,
    ) -> KeystoreResult<Arc<dyn CipherContext>> {
        self.check_available()?;
        let keys = self.lock()?;
        let stored = keys
            .get(&alias)
            .ok_or_else(|| KeystoreError::KeyNotFound(alias.clone()))?;
        if stored.invalidated {
            return Err(KeystoreError::KeyPermanentlyInvalidated(alias));
        }
        if self.cipher_failure.load(Ordering::SeqCst) {
            return Err(KeystoreError::Failure("cipher initialisation refused".to_string()));
        }

        let iv = match mode {
            CipherMode::Encrypt => {
                let mut fresh = [0u8; IV_LEN];
                OsRng.fill_bytes(&mut fresh);
                fresh
            }
            CipherMode::Decrypt => {
                let supplied = iv.ok_or_else(|| {
                    KeystoreError::InvalidIv("decryption requires an iv".to_string())
                })?;
                <[u8; IV_LEN]>::try_from(supplied.as_slice()).map_err(|_| {
                    KeystoreError::InvalidIv(format!(
                        "expected {IV_LEN} bytes, got {}",
                        supplied.len()
                    ))
                })?
            }
        };

        Ok(Arc::new(SoftwareCipher {
            key: Zeroizing::new(*stored.material.expose_secret()),
            mode,
            iv,
            used: AtomicBool::new(false),
        }))
    }
}

struct SoftwareCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
    mode: CipherMode,
    iv: [u8; IV_LEN],
    used: AtomicBool,
}

impl CipherContext for SoftwareCipher {
    fn iv(&self) -> KeystoreResult<Vec<u8>> {
        Ok(self.iv.to_vec())
    }

    fn do_final(&self, input: Vec<u8>) -> KeystoreResult<Vec<u8>> {
        if self.used.swap(true, Ordering::SeqCst) {
            return Err(KeystoreError::CipherConsumed);
        }
        let cipher = ChaCha20Poly1305::new_from_slice(self.key.as_slice())
            .map_err(|err| KeystoreError::Failure(err.to_string()))?;
        let nonce = Nonce::from_slice(&self.iv);
        match self.mode {
            CipherMode::Encrypt => cipher
                .encrypt(nonce, input.as_slice())
                .map_err(|err| KeystoreError::Failure(err.to_string())),
            CipherMode::Decrypt => cipher
                .decrypt(nonce, input.as_slice())
                .map_err(|_| KeystoreError::AuthenticationFailed("tag mismatch".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIAS: &str = "test_key";

    fn keystore_with_key() -> SoftwareKeystore {
        let keystore = SoftwareKeystore::new();
        keystore
            .generate_key(KeySpec::biometric_bound(ALIAS, 256))
            .expect("generate");
        keystore
    }

    #[test]
    fn test_seal_and_open() {
        let keystore = keystore_with_key();
        let enc = keystore
            .init_cipher(ALIAS.to_string(), CipherMode::Encrypt, None)
            .expect("init encrypt");
        let iv = enc.iv().expect("iv");
        assert_eq!(iv.len(), IV_LEN);
        let ciphertext = enc.do_final(b"hunter2".to_vec()).expect("encrypt");
        assert_ne!(ciphertext, b"hunter2");

        let dec = keystore
            .init_cipher(ALIAS.to_string(), CipherMode::Decrypt, Some(iv))
            .expect("init decrypt");
        assert_eq!(dec.do_final(ciphertext).expect("decrypt"), b"hunter2");
    }

    #[test]
    fn test_cipher_is_single_use() {
        let keystore = keystore_with_key();
        let enc = keystore
            .init_cipher(ALIAS.to_string(), CipherMode::Encrypt, None)
            .expect("init");
        enc.do_final(vec![1]).expect("first");
        assert!(matches!(
            enc.do_final(vec![1]),
            Err(KeystoreError::CipherConsumed)
        ));
    }

    #[test]
    fn test_missing_key() {
        let keystore = SoftwareKeystore::new();
        assert!(!keystore.contains_key(ALIAS.to_string()).expect("query"));
        assert!(matches!(
            keystore.init_cipher(ALIAS.to_string(), CipherMode::Encrypt, None),
            Err(KeystoreError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_invalidated_key_refuses_cipher() {
        let keystore = keystore_with_key();
        assert!(keystore.invalidate_key(ALIAS));
        assert!(matches!(
            keystore.init_cipher(ALIAS.to_string(), CipherMode::Encrypt, None),
            Err(KeystoreError::KeyPermanentlyInvalidated(_))
        ));
        assert!(!keystore.invalidate_key("other"));
    }

    #[test]
    fn test_unavailable_backend() {
        let keystore = keystore_with_key();
        keystore.set_unavailable(true);
        assert!(matches!(
            keystore.contains_key(ALIAS.to_string()),
            Err(KeystoreError::Unavailable(_))
        ));
        keystore.set_unavailable(false);
        assert!(keystore.contains_key(ALIAS.to_string()).expect("query"));
    }

    #[test]
    fn test_cipher_failure_keeps_key() {
        let keystore = keystore_with_key();
        keystore.set_cipher_failure(true);
        assert!(matches!(
            keystore.init_cipher(ALIAS.to_string(), CipherMode::Encrypt, None),
            Err(KeystoreError::Failure(_))
        ));
        assert!(keystore.contains_key(ALIAS.to_string()).expect("query"));
    }

    #[test]
    fn test_decrypt_requires_valid_iv() {
        let keystore = keystore_with_key();
        assert!(matches!(
            keystore.init_cipher(ALIAS.to_string(), CipherMode::Decrypt, None),
            Err(KeystoreError::InvalidIv(_))
        ));
        assert!(matches!(
            keystore.init_cipher(ALIAS.to_string(), CipherMode::Decrypt, Some(vec![0; 4])),
            Err(KeystoreError::InvalidIv(_))
        ));
    }

    #[test]
    fn test_rejects_unsupported_key_size() {
        let keystore = SoftwareKeystore::new();
        assert!(keystore
            .generate_key(KeySpec::biometric_bound(ALIAS, 128))
            .is_err());
        assert_eq!(keystore.generated_count(), 0);
    }
}
