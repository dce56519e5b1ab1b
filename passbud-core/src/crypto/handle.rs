//! Crypto objects and the authentication states they move through.
//!
//! ```text
//! create_auth_session ──► CryptoObject ──► biometric ceremony ──► AuthenticatedHandle
//!                          (inert)                                  (one encrypt or decrypt)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strum::Display;

use super::keystore::{CipherContext, CipherMode};
use crate::error::{VaultError, VaultResult};

/// What a crypto object will be used for once authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum CryptoPurpose {
    /// Encrypt a new or edited credential value before it is stored.
    Encryption,
    /// Reveal a stored credential value.
    Decryption,
}

impl CryptoPurpose {
    /// The cipher direction backing this purpose.
    #[must_use]
    pub const fn cipher_mode(self) -> CipherMode {
        match self {
            Self::Encryption => CipherMode::Encrypt,
            Self::Decryption => CipherMode::Decrypt,
        }
    }
}

/// A live cipher handed to the biometric ceremony.
///
/// The object is inert until the platform confirms the user's identity
/// against it. It performs exactly one operation; afterwards it reports
/// itself as consumed and every further use fails.
#[derive(uniffi::Object)]
pub struct CryptoObject {
    session_id: u64,
    purpose: CryptoPurpose,
    cipher: Arc<dyn CipherContext>,
    consumed: AtomicBool,
}

impl CryptoObject {
    pub(crate) fn new(session_id: u64, purpose: CryptoPurpose, cipher: Arc<dyn CipherContext>) -> Self {
        Self {
            session_id,
            purpose,
            cipher,
            consumed: AtomicBool::new(false),
        }
    }

    /// Claims the cipher for its single operation.
    pub(crate) fn claim(&self) -> VaultResult<&dyn CipherContext> {
        if self.consumed.swap(true, Ordering::SeqCst) {
            return Err(VaultError::HandleConsumed);
        }
        Ok(self.cipher.as_ref())
    }
}

#[uniffi::export]
impl CryptoObject {
    /// Identifier unique to this object within its engine.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// The purpose the cipher was initialised for.
    #[must_use]
    pub fn purpose(&self) -> CryptoPurpose {
        self.purpose
    }

    /// Whether the single operation has already run.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CryptoObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoObject")
            .field("session_id", &self.session_id)
            .field("purpose", &self.purpose)
            .field("consumed", &self.is_consumed())
            .finish_non_exhaustive()
    }
}

/// A crypto object the platform ceremony reported as authenticated.
///
/// Deliberately not `Clone`: encrypt and decrypt take the handle by value.
#[derive(Debug)]
pub struct AuthenticatedHandle(Arc<CryptoObject>);

impl AuthenticatedHandle {
    /// Wraps the crypto object returned by a successful biometric ceremony.
    ///
    /// Only call this from the ceremony's success callback; on a real
    /// keystore the cipher still refuses to run without authentication.
    #[must_use]
    pub const fn new(crypto_object: Arc<CryptoObject>) -> Self {
        Self(crypto_object)
    }

    /// The purpose of the underlying crypto object.
    #[must_use]
    pub fn purpose(&self) -> CryptoPurpose {
        self.0.purpose
    }

    /// The session id of the underlying crypto object.
    #[must_use]
    pub fn session_id(&self) -> u64 {
        self.0.session_id
    }

    pub(crate) fn require(&self, purpose: CryptoPurpose) -> VaultResult<()> {
        if self.0.purpose == purpose {
            Ok(())
        } else {
            Err(VaultError::PurposeMismatch {
                expected: purpose,
                found: self.0.purpose,
            })
        }
    }

    pub(crate) fn crypto_object(&self) -> &CryptoObject {
        &self.0
    }
}

/// Whether the caller completed a biometric ceremony.
#[derive(Debug)]
pub enum Authentication {
    /// No ceremony ran; only plaintext credentials can be saved.
    NotAuthenticated,
    /// The ceremony succeeded and produced this handle.
    Authenticated(AuthenticatedHandle),
}

impl Authentication {
    /// Consumes the state, returning the handle if there is one.
    #[must_use]
    pub fn into_handle(self) -> Option<AuthenticatedHandle> {
        match self {
            Self::NotAuthenticated => None,
            Self::Authenticated(handle) => Some(handle),
        }
    }
}

impl From<Option<Arc<CryptoObject>>> for Authentication {
    fn from(crypto_object: Option<Arc<CryptoObject>>) -> Self {
        crypto_object.map_or(Self::NotAuthenticated, |object| {
            Self::Authenticated(AuthenticatedHandle::new(object))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keystore::KeystoreResult;

    struct NullCipher;

    impl CipherContext for NullCipher {
        fn iv(&self) -> KeystoreResult<Vec<u8>> {
            Ok(Vec::new())
        }

        fn do_final(&self, input: Vec<u8>) -> KeystoreResult<Vec<u8>> {
            Ok(input)
        }
    }

    fn object(purpose: CryptoPurpose) -> Arc<CryptoObject> {
        Arc::new(CryptoObject::new(7, purpose, Arc::new(NullCipher)))
    }

    #[test]
    fn test_claim_is_single_shot() {
        let crypto_object = object(CryptoPurpose::Encryption);
        assert!(!crypto_object.is_consumed());
        assert!(crypto_object.claim().is_ok());
        assert!(crypto_object.is_consumed());
        assert!(matches!(
            crypto_object.claim(),
            Err(VaultError::HandleConsumed)
        ));
    }

    #[test]
    fn test_purpose_check() {
        let handle = AuthenticatedHandle::new(object(CryptoPurpose::Decryption));
        assert!(handle.require(CryptoPurpose::Decryption).is_ok());
        assert!(matches!(
            handle.require(CryptoPurpose::Encryption),
            Err(VaultError::PurposeMismatch {
                expected: CryptoPurpose::Encryption,
                found: CryptoPurpose::Decryption,
            })
        ));
    }

    #[test]
    fn test_authentication_from_option() {
        assert!(Authentication::from(None).into_handle().is_none());
        let auth = Authentication::from(Some(object(CryptoPurpose::Encryption)));
        assert_eq!(auth.into_handle().map(|h| h.session_id()), Some(7));
    }
}
