use crate::error::{VaultError, VaultResult};

/// Separator between the four packed bank card fields.
pub const BANK_CARD_DELIMITER: &str = "|||";

/// A bank card stored as a single credential value.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct BankCard {
    /// Card number as entered.
    pub card_number: String,
    /// Start of validity, `MMYY`.
    pub valid_from: Option<String>,
    /// End of validity, `MMYY`.
    pub valid_thru: Option<String>,
    /// Card verification value.
    pub cvv: Option<String>,
}

/// Packs `card` into `number|||from|||thru|||cvv`.
///
/// Absent fields become empty segments; an empty string is written the same
/// way and reads back as absent. Fields are not escaped: a field containing
/// `|` packs into a value that no longer unpacks to `card`, so callers storing
/// user input check it with [`check_bank_card`] first.
#[must_use]
pub fn pack_bank_card(card: &BankCard) -> String {
    [
        card.card_number.as_str(),
        card.valid_from.as_deref().unwrap_or_default(),
        card.valid_thru.as_deref().unwrap_or_default(),
        card.cvv.as_deref().unwrap_or_default(),
    ]
    .join(BANK_CARD_DELIMITER)
}

/// Parses a value written by [`pack_bank_card`].
///
/// # Errors
///
/// Returns [`VaultError::ParseError`] unless the value has exactly four
/// segments.
pub fn unpack_bank_card(packed: &str) -> VaultResult<BankCard> {
    let segments: Vec<&str> = packed.split(BANK_CARD_DELIMITER).collect();
    let [card_number, valid_from, valid_thru, cvv] = segments.as_slice() else {
        return Err(VaultError::ParseError(format!(
            "expected 4 bank card fields, found {}",
            segments.len()
        )));
    };
    Ok(BankCard {
        card_number: (*card_number).to_string(),
        valid_from: optional(valid_from),
        valid_thru: optional(valid_thru),
        cvv: optional(cvv),
    })
}

/// Rejects cards that [`pack_bank_card`] cannot store faithfully.
///
/// # Errors
///
/// Returns [`VaultError::InvalidInput`] naming the first field containing `|`.
pub fn check_bank_card(card: &BankCard) -> VaultResult<()> {
    let fields = [
        ("card_number", Some(card.card_number.as_str())),
        ("valid_from", card.valid_from.as_deref()),
        ("valid_thru", card.valid_thru.as_deref()),
        ("cvv", card.cvv.as_deref()),
    ];
    match fields
        .into_iter()
        .find(|(_, value)| value.is_some_and(|value| value.contains('|')))
    {
        Some((field, _)) => Err(VaultError::invalid_input(field, "must not contain '|'")),
        None => Ok(()),
    }
}

fn optional(segment: &str) -> Option<String> {
    (!segment.is_empty()).then(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn card(number: &str, from: Option<&str>, thru: Option<&str>, cvv: Option<&str>) -> BankCard {
        BankCard {
            card_number: number.to_string(),
            valid_from: from.map(str::to_string),
            valid_thru: thru.map(str::to_string),
            cvv: cvv.map(str::to_string),
        }
    }

    #[test]
    fn test_pack_layout() {
        let packed = pack_bank_card(&card("4111111111111111", Some("0124"), Some("0129"), Some("123")));
        assert_eq!(packed, "4111111111111111|||0124|||0129|||123");
        assert_eq!(pack_bank_card(&card("4111", None, None, None)), "4111|||||||||");
    }

    #[test_case(card("4111", Some("0124"), Some("0129"), Some("123")) ; "all fields")]
    #[test_case(card("4111", None, Some("0129"), None) ; "sparse")]
    #[test_case(card("", None, None, None) ; "empty")]
    #[test_case(card("5500 0000 0000 0004", Some("1299"), None, Some("000")) ; "spaced number")]
    fn test_unpack_restores_card(original: BankCard) {
        assert_eq!(unpack_bank_card(&pack_bank_card(&original)).expect("unpack"), original);
    }

    #[test]
    fn test_empty_string_reads_back_as_absent() {
        let packed = pack_bank_card(&card("4111", Some(""), Some("0129"), Some("")));
        assert_eq!(
            unpack_bank_card(&packed).expect("unpack"),
            card("4111", None, Some("0129"), None)
        );
    }

    #[test_case(card("4111|", None, None, None), "card_number" ; "number")]
    #[test_case(card("4111", Some("01|24"), None, None), "valid_from" ; "from")]
    #[test_case(card("4111", None, Some("|"), None), "valid_thru" ; "thru")]
    #[test_case(card("4111", None, None, Some("12|||3")), "cvv" ; "cvv")]
    fn test_check_rejects_pipe(card: BankCard, field: &str) {
        assert!(matches!(
            check_bank_card(&card),
            Err(VaultError::InvalidInput { parameter, .. }) if parameter == field
        ));
    }

    #[test]
    fn test_check_accepts_plain_card() {
        assert!(check_bank_card(&card("5500 0000 0000 0004", Some("1299"), None, Some("000"))).is_ok());
    }

    #[test_case("" ; "empty input")]
    #[test_case("4111" ; "one field")]
    #[test_case("4111|||0124|||0129" ; "three fields")]
    #[test_case("4111|||0124|||0129|||123|||x" ; "five fields")]
    fn test_unpack_rejects_field_count(packed: &str) {
        assert!(matches!(
            unpack_bank_card(packed),
            Err(VaultError::ParseError(_))
        ));
    }
}
