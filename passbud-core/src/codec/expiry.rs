/// Formats an `MMYY` string for display by inserting `/` after the month.
///
/// Inputs of two characters or fewer are returned unchanged, so partially
/// typed values never gain a trailing separator. The output is never parsed.
#[must_use]
pub fn format_expiry(mmyy: &str) -> String {
    let Some((split, _)) = mmyy.char_indices().nth(2) else {
        return mmyy.to_string();
    };
    let (month, year) = mmyy.split_at(split);
    format!("{month}/{year}")
}
