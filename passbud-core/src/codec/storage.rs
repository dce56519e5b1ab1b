use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{VaultError, VaultResult};

/// Ciphertext and IV in their persisted base64 form.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StoredCiphertext {
    /// Base64 ciphertext, stored in `Credential::value`.
    pub value: String,
    /// Base64 IV, stored in `Credential::encryption_iv`.
    pub iv: String,
}

/// Encodes raw ciphertext and IV as standard base64 without line breaks.
#[must_use]
pub fn encode_for_storage(ciphertext: &[u8], iv: &[u8]) -> StoredCiphertext {
    StoredCiphertext {
        value: STANDARD.encode(ciphertext),
        iv: STANDARD.encode(iv),
    }
}

/// Decodes a persisted value and IV back to raw bytes.
///
/// ASCII whitespace is ignored so values written by line-wrapping encoders
/// still decode.
///
/// # Errors
///
/// Returns [`VaultError::InvalidEncoding`] if either input is not base64.
pub fn decode_from_storage(value: &str, iv: &str) -> VaultResult<(Vec<u8>, Vec<u8>)> {
    Ok((decode_field("value", value)?, decode_field("iv", iv)?))
}

pub(crate) fn decode_field(field: &str, encoded: &str) -> VaultResult<Vec<u8>> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|err| VaultError::InvalidEncoding(format!("{field}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_single_line() {
        let stored = encode_for_storage(&[0xAB; 200], &[7; 12]);
        assert!(!stored.value.contains('\n'));
        assert_eq!(stored.iv, "BwcHBwcHBwcHBwcH");
    }

    #[test]
    fn test_decode_restores_bytes() {
        let stored = encode_for_storage(b"ciphertext", b"iv-bytes");
        let (ciphertext, iv) = decode_from_storage(&stored.value, &stored.iv).expect("decode");
        assert_eq!(ciphertext, b"ciphertext");
        assert_eq!(iv, b"iv-bytes");
    }

    #[test]
    fn test_decode_tolerates_wrapped_input() {
        let (value, _) = decode_from_storage("aGVs\nbG8=\n", "AAAA").expect("decode");
        assert_eq!(value, b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_from_storage("not base64!", "AAAA").expect_err("garbage");
        assert!(matches!(err, VaultError::InvalidEncoding(ref reason) if reason.starts_with("value")));
        let err = decode_from_storage("AAAA", "%%").expect_err("garbage iv");
        assert!(matches!(err, VaultError::InvalidEncoding(ref reason) if reason.starts_with("iv")));
    }
}
