//! Biometric capability and the status derived from it.

use strum::Display;

/// What the platform reports when asked whether strong biometrics can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum AuthenticatorAvailability {
    /// Biometrics can be used right now.
    Success,
    /// The device has no biometric sensor.
    NoHardware,
    /// The sensor exists but is temporarily unusable.
    HardwareUnavailable,
    /// The sensor works but the user has not enrolled.
    NoneEnrolled,
    /// A security update must be installed first.
    SecurityUpdateRequired,
    /// The requested authenticator combination is not supported.
    Unsupported,
    /// The platform could not determine availability.
    StatusUnknown,
}

impl AuthenticatorAvailability {
    /// Maps an Android `BiometricManager.canAuthenticate` result code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::HardwareUnavailable,
            11 => Self::NoneEnrolled,
            12 => Self::NoHardware,
            15 => Self::SecurityUpdateRequired,
            -2 => Self::Unsupported,
            _ => Self::StatusUnknown,
        }
    }
}

/// Queries the platform's biometric hardware.
#[uniffi::export(with_foreign)]
pub trait BiometricCapability: Send + Sync {
    /// Whether class 3 biometrics can authenticate the user.
    fn can_authenticate(&self) -> AuthenticatorAvailability;
}

/// Biometric readiness as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum BiometricAuthStatus {
    /// Biometrics can be used.
    Ready,
    /// The device cannot do biometrics.
    NotAvailable,
    /// Try again later.
    TemporarilyUnavailable,
    /// The user must enroll a biometric first.
    AvailableNotEnrolled,
}

impl From<AuthenticatorAvailability> for BiometricAuthStatus {
    fn from(availability: AuthenticatorAvailability) -> Self {
        match availability {
            AuthenticatorAvailability::Success => Self::Ready,
            AuthenticatorAvailability::HardwareUnavailable => Self::TemporarilyUnavailable,
            AuthenticatorAvailability::NoneEnrolled => Self::AvailableNotEnrolled,
            AuthenticatorAvailability::NoHardware
            | AuthenticatorAvailability::SecurityUpdateRequired
            | AuthenticatorAvailability::Unsupported
            | AuthenticatorAvailability::StatusUnknown => Self::NotAvailable,
        }
    }
}

/// Usability of the encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum KeyStatus {
    /// The key validated.
    Ready,
    /// The key cannot be used.
    NotReady,
    /// The key had been invalidated; data was wiped and a new key generated.
    Invalidated,
}

/// Overall readiness of the app, reduced from [`BiometricInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum AppStatus {
    /// Encrypted credentials can be stored and viewed.
    Ready,
    /// Something must change (enrollment, key) before encryption works.
    NotReady,
    /// The device cannot support encrypted credentials.
    Unavailable,
}

/// Biometric and key status reported at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct BiometricInfo {
    /// Platform biometric availability.
    pub biometric_auth_status: BiometricAuthStatus,
    /// Encryption key status.
    pub key_status: KeyStatus,
}

impl BiometricInfo {
    /// Reduces the two statuses to one.
    #[must_use]
    pub const fn app_status(&self) -> AppStatus {
        match (self.biometric_auth_status, self.key_status) {
            (BiometricAuthStatus::Ready, KeyStatus::Ready | KeyStatus::Invalidated) => {
                AppStatus::Ready
            }
            (BiometricAuthStatus::NotAvailable, _) => AppStatus::Unavailable,
            _ => AppStatus::NotReady,
        }
    }

    /// Whether stored data was wiped because the key had been invalidated.
    #[must_use]
    pub const fn was_reset(&self) -> bool {
        matches!(self.key_status, KeyStatus::Invalidated)
    }
}
