use std::sync::Arc;

use strum::Display;

use crate::crypto::{CryptoObject, CryptoPurpose};

const PROMPT_TITLE: &str = "Biometric verification";
const NEGATIVE_BUTTON: &str = "Cancel";

/// What the pending intent will do once the user authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum IntentKind {
    /// Encrypt and store a credential.
    Encryption,
    /// Reveal a stored credential.
    Decryption,
    /// Delete an account or a credential.
    Deletion,
}

impl From<CryptoPurpose> for IntentKind {
    fn from(purpose: CryptoPurpose) -> Self {
        match purpose {
            CryptoPurpose::Encryption => Self::Encryption,
            CryptoPurpose::Decryption => Self::Decryption,
        }
    }
}

/// What a confirmed delete removes.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum DeleteTarget {
    /// An account and all of its credentials.
    Account {
        /// Account id.
        account_id: String,
    },
    /// A single credential.
    Credential {
        /// Credential id.
        credential_id: String,
    },
}

impl DeleteTarget {
    const fn noun(&self) -> &'static str {
        match self {
            Self::Account { .. } => "account",
            Self::Credential { .. } => "credential",
        }
    }
}

/// Text of the platform biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PromptConfig {
    /// Prompt title.
    pub title: String,
    /// Line explaining what the verification unlocks.
    pub subtitle: String,
    /// Label of the dismiss button.
    pub negative_button_text: String,
}

impl PromptConfig {
    fn with_subtitle(subtitle: String) -> Self {
        Self {
            title: PROMPT_TITLE.to_string(),
            subtitle,
            negative_button_text: NEGATIVE_BUTTON.to_string(),
        }
    }

    /// The prompt shown before a crypto operation.
    #[must_use]
    pub fn for_purpose(purpose: CryptoPurpose) -> Self {
        Self::with_subtitle(match purpose {
            CryptoPurpose::Encryption => "Verify yourself to encrypt and store data".to_string(),
            CryptoPurpose::Decryption => "Verify yourself to view credentials".to_string(),
        })
    }

    /// The prompt shown before a delete.
    #[must_use]
    pub fn for_delete(target: &DeleteTarget) -> Self {
        Self::with_subtitle(format!("Verify yourself to delete this {}", target.noun()))
    }
}

/// Everything the host needs to run the biometric ceremony.
#[derive(Debug, Clone, uniffi::Record)]
pub struct AuthContext {
    /// What happens on success.
    pub intent: IntentKind,
    /// The crypto object to authenticate; absent for deletes.
    pub crypto_object: Option<Arc<CryptoObject>>,
    /// Prompt text.
    pub prompt: PromptConfig,
}

/// Classified `BiometricPrompt` error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum AuthErrorKind {
    /// Sensor temporarily unavailable.
    HardwareUnavailable,
    /// The sensor could not process the input.
    UnableToProcess,
    /// The ceremony timed out.
    Timeout,
    /// Not enough storage to finish.
    NoSpace,
    /// The system canceled the ceremony.
    Canceled,
    /// Too many attempts; temporarily locked.
    Lockout,
    /// Vendor-specific failure.
    Vendor,
    /// Too many attempts; locked until device credential is used.
    LockoutPermanent,
    /// The user canceled.
    UserCanceled,
    /// No biometrics enrolled.
    NoBiometrics,
    /// The device has no biometric hardware.
    HardwareNotPresent,
    /// The user pressed the negative button.
    NegativeButton,
    /// No PIN, pattern or password set.
    NoDeviceCredential,
    /// A security update is required.
    SecurityUpdateRequired,
    /// Any code not listed above.
    Other,
}

impl AuthErrorKind {
    /// Maps a `BiometricPrompt.ERROR_*` code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::HardwareUnavailable,
            2 => Self::UnableToProcess,
            3 => Self::Timeout,
            4 => Self::NoSpace,
            5 => Self::Canceled,
            7 => Self::Lockout,
            8 => Self::Vendor,
            9 => Self::LockoutPermanent,
            10 => Self::UserCanceled,
            11 => Self::NoBiometrics,
            12 => Self::HardwareNotPresent,
            13 => Self::NegativeButton,
            14 => Self::NoDeviceCredential,
            15 => Self::SecurityUpdateRequired,
            _ => Self::Other,
        }
    }

    /// Cancellations end the ceremony without telling the user anything.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::UserCanceled | Self::NegativeButton
        )
    }
}
