//! Text encodings for persisted credential values.
//!
//! Everything here is pure: no keystore, no repository.

mod bank_card;
mod expiry;
mod storage;

pub use bank_card::{
    check_bank_card, pack_bank_card, unpack_bank_card, BankCard, BANK_CARD_DELIMITER,
};
pub use expiry::format_expiry;
pub use storage::{decode_from_storage, encode_for_storage, StoredCiphertext};

pub(crate) use storage::decode_field;

use crate::error::VaultResult;
use crate::repository::CredentialType;

/// A decoded plaintext credential value, typed by its [`CredentialType`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum CredentialContent {
    /// A single opaque value (username, password, note).
    PlainValue {
        /// The value itself.
        value: String,
    },
    /// A packed bank card.
    BankCard {
        /// The unpacked card.
        card: BankCard,
    },
}

impl CredentialContent {
    /// Interprets a plaintext `value` according to `credential_type`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaultError::ParseError`] if a bank card value is malformed.
    pub fn parse(credential_type: CredentialType, value: &str) -> VaultResult<Self> {
        match credential_type {
            CredentialType::PlainValue => Ok(Self::PlainValue {
                value: value.to_string(),
            }),
            CredentialType::BankCard => Ok(Self::BankCard {
                card: unpack_bank_card(value)?,
            }),
        }
    }

    /// The storage type this content belongs to.
    #[must_use]
    pub const fn credential_type(&self) -> CredentialType {
        match self {
            Self::PlainValue { .. } => CredentialType::PlainValue,
            Self::BankCard { .. } => CredentialType::BankCard,
        }
    }

    /// Packs the content back into the plaintext stored in a credential.
    #[must_use]
    pub fn to_value(&self) -> String {
        match self {
            Self::PlainValue { value } => value.clone(),
            Self::BankCard { card } => pack_bank_card(card),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VaultError;

    #[test]
    fn test_content_follows_credential_type() {
        let plain = CredentialContent::parse(CredentialType::PlainValue, "a|||b").expect("plain");
        assert_eq!(
            plain,
            CredentialContent::PlainValue {
                value: "a|||b".to_string()
            }
        );

        let card = CredentialContent::parse(CredentialType::BankCard, "4111|||0124||||||")
            .expect("card");
        assert_eq!(card.credential_type(), CredentialType::BankCard);
        assert_eq!(card.to_value(), "4111|||0124||||||");

        assert!(matches!(
            CredentialContent::parse(CredentialType::BankCard, "4111"),
            Err(VaultError::ParseError(_))
        ));
    }
}
