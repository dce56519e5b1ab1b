//! Kotlin and Swift entry points.
//!
//! - [`PassbudVault`] wraps a [`crate::CredentialVault`]
//! - [`PassbudSession`] wraps a [`crate::CryptoSession`] for one screen
//! - free functions expose the pure codecs
//!
//! # Example (Kotlin)
//!
//! ```kotlin
//! val vault = PassbudVault.withDefaults(AndroidKeystore(), RoomRepository(db), AndroidBiometrics(ctx))
//! val session = PassbudSession(vault, SnackbarSink(host))
//! val info = session.checkBiometrics()
//!
//! val context = session.requestDecrypt(credentialId)
//! // show BiometricPrompt with context.prompt and context.cryptoObject, then:
//! session.onAuthSucceeded(context.cryptoObject)
//! ```

mod codec;
mod session;
mod vault;

pub use codec::{
    biometric_app_status, format_expiry, pack_bank_card, parse_credential_content,
    unpack_bank_card,
};
pub use session::PassbudSession;
pub use vault::PassbudVault;
