#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! PassBud core: the credential encryption and key-lifecycle engine.
//!
//! The crate owns a single hardware-backed symmetric key (through the
//! [`crypto::HardwareKeystore`] platform trait), encrypts and decrypts
//! individual credential values behind a biometric ceremony, and wipes all
//! stored data when the key becomes unusable.
//!
//! # Layers
//!
//! 1. [`crypto`]: [`KeyedCryptoEngine`] and the platform keystore traits.
//! 2. [`codec`]: base64 storage encoding, bank-card packing, expiry display.
//! 3. [`session`]: the authenticate-then-operate protocol ([`CryptoSession`]).
//! 4. [`vault`]: [`CredentialVault`], the repository-facing orchestrator.
//!
//! Persistence is a collaborator: anything implementing
//! [`repository::CredentialRepository`] works; [`repository::MemoryRepository`]
//! is provided for tests and simple hosts.

pub mod codec;
pub mod crypto;
pub mod ffi;
pub mod logger;
pub mod messages;
pub mod repository;
pub mod session;
pub mod vault;

mod error;
pub use error::*;

pub use codec::{format_expiry, pack_bank_card, unpack_bank_card, BankCard, CredentialContent};
pub use crypto::{
    Authentication, AuthenticatedHandle, CryptoObject, CryptoPurpose, KeyState,
    KeyedCryptoEngine, ValidationResult,
};
pub use ffi::{PassbudSession, PassbudVault};
pub use messages::{ChannelMessageSink, MessageSink, UiMessage};
pub use repository::{Account, AccountWithCounts, Credential, CredentialType};
pub use session::{CryptoSession, SessionOutcome};
pub use vault::{AppStatus, BiometricInfo, CredentialVault, KeyStatus, VaultConfig};

uniffi::setup_scaffolding!("passbud_core");
