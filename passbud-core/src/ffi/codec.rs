#![allow(clippy::needless_pass_by_value)]

use crate::codec::{self, BankCard, CredentialContent};
use crate::error::VaultResult;
use crate::repository::CredentialType;
use crate::vault::{AppStatus, BiometricInfo};

/// Packs a bank card into the string stored as a credential value.
#[uniffi::export]
#[must_use]
pub fn pack_bank_card(card: BankCard) -> String {
    codec::pack_bank_card(&card)
}

/// Parses a packed bank card.
///
/// # Errors
///
/// Returns `ParseError` unless the value has exactly four fields.
#[uniffi::export]
pub fn unpack_bank_card(packed: String) -> VaultResult<BankCard> {
    codec::unpack_bank_card(&packed)
}

/// Formats `MMYY` as `MM/YY` for display.
#[uniffi::export]
#[must_use]
pub fn format_expiry(mmyy: String) -> String {
    codec::format_expiry(&mmyy)
}

/// Decodes a revealed or plaintext value according to its type.
///
/// # Errors
///
/// Returns `ParseError` for a malformed bank card.
#[uniffi::export]
pub fn parse_credential_content(
    credential_type: CredentialType,
    value: String,
) -> VaultResult<CredentialContent> {
    CredentialContent::parse(credential_type, &value)
}

/// Reduces biometric and key status to the app's readiness.
#[uniffi::export]
#[must_use]
pub fn biometric_app_status(info: BiometricInfo) -> AppStatus {
    info.app_status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exported_codecs() {
        let card = BankCard {
            card_number: "4111".to_string(),
            valid_from: None,
            valid_thru: Some("0129".to_string()),
            cvv: None,
        };
        let packed = pack_bank_card(card.clone());
        assert_eq!(unpack_bank_card(packed.clone()).unwrap(), card);
        assert_eq!(format_expiry("0129".to_string()), "01/29");
        assert_eq!(
            parse_credential_content(CredentialType::BankCard, packed).unwrap(),
            CredentialContent::BankCard { card }
        );
    }
}
