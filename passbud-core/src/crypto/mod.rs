//! Hardware-backed credential encryption.
//!
//! [`KeyedCryptoEngine`] owns one named key inside a [`HardwareKeystore`].
//! Every encrypt or decrypt runs through a [`CryptoObject`] that a biometric
//! ceremony has to authenticate first.

mod engine;
mod handle;
mod keystore;
pub mod software;

pub use engine::{EncryptedData, KeyState, KeyedCryptoEngine, ValidationResult};
pub use handle::{Authentication, AuthenticatedHandle, CryptoObject, CryptoPurpose};
pub use keystore::{
    AuthenticatorClass, CipherContext, CipherMode, HardwareKeystore, KeySpec, KeystoreError,
    KeystoreResult,
};
pub use software::SoftwareKeystore;
