use crate::crypto::KeySpec;

/// Alias of the credential encryption key when none is configured.
pub const DEFAULT_KEY_ALIAS: &str = "passbud_credentials_key";

/// Key size requested from the platform when none is configured.
pub const DEFAULT_KEY_SIZE_BITS: u32 = 256;

/// Configuration of a [`super::CredentialVault`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct VaultConfig {
    /// Alias the encryption key is stored under.
    pub key_alias: String,
    /// Size of the encryption key in bits.
    pub key_size_bits: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            key_size_bits: DEFAULT_KEY_SIZE_BITS,
        }
    }
}

impl VaultConfig {
    /// The key the vault asks the platform for.
    #[must_use]
    pub fn key_spec(&self) -> KeySpec {
        KeySpec::biometric_bound(self.key_alias.clone(), self.key_size_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AuthenticatorClass;

    #[test]
    fn test_default_key_spec() {
        let spec = VaultConfig::default().key_spec();
        assert_eq!(spec.alias, "passbud_credentials_key");
        assert_eq!(spec.key_size_bits, 256);
        assert!(spec.user_authentication_required);
        assert!(spec.invalidated_by_biometric_enrollment);
        assert_eq!(spec.authenticator, AuthenticatorClass::BiometricStrong);
    }
}
