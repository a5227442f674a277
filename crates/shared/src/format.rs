//! Input formatters applied to form fields as the customer types.

pub const MAX_PHONE_LENGTH: usize = 14;
const MAX_CARD_DIGITS: usize = 19;
const AMEX_CARD_DIGITS: usize = 15;
const MAX_CVC_DIGITS: usize = 4;

/// Formats a phone number while it is being typed.
///
/// Numbers starting with `+` are international and only lose characters other
/// than digits and spaces. Everything else is grouped as `(AAA) BBB-CCCC`; the
/// separator after a complete group is held back when the customer just typed
/// it themselves, so deleting a separator does not immediately re-add it.
pub fn format_phone(raw: &str) -> String {
    if raw.starts_with('+') {
        let rest: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ' ')
            .collect();
        return format!("+{rest}");
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let len = digits.len();

    let mut formatted = slice(&digits, 0, 3).to_string();
    if len >= 3 {
        if len > 3 || !raw.ends_with(' ') {
            formatted = format!("({formatted}) ");
        }
        formatted.push_str(slice(&digits, 3, 6));
    }
    if len >= 6 {
        if len > 6 || !raw.ends_with('-') {
            formatted.push('-');
        }
        formatted.push_str(slice(&digits, 6, 10));
    }
    formatted.chars().take(MAX_PHONE_LENGTH).collect()
}

/// Groups a card number for display. American Express numbers use 4-6-5,
/// all other brands groups of four.
pub fn format_card_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let is_amex = digits.starts_with("34") || digits.starts_with("37");
    let (limit, groups): (usize, &[usize]) = if is_amex {
        (AMEX_CARD_DIGITS, &[4, 6, 5])
    } else {
        (MAX_CARD_DIGITS, &[4, 4, 4, 4, 3])
    };
    let digits = slice(&digits, 0, limit);

    let mut parts = Vec::new();
    let mut start = 0;
    for width in groups {
        if start >= digits.len() {
            break;
        }
        parts.push(slice(digits, start, start + width));
        start += width;
    }
    parts.join(" ")
}

pub fn format_card_cvc(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(MAX_CVC_DIGITS)
        .collect()
}

/// Re-indents a JSON document, keeping key order.
pub fn pretty_json(raw: &str) -> Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    serde_json::to_string_pretty(&value)
}

// Inputs are pre-filtered to ASCII digits, so byte offsets are char offsets.
fn slice(digits: &str, start: usize, end: usize) -> &str {
    let end = end.min(digits.len());
    if start >= end {
        return "";
    }
    &digits[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_groups_north_american_numbers() {
        assert_eq!(format_phone("5"), "5");
        assert_eq!(format_phone("55"), "55");
        assert_eq!(format_phone("555"), "(555) ");
        assert_eq!(format_phone("5551"), "(555) 1");
        assert_eq!(format_phone("555123"), "(555) 123-");
        assert_eq!(format_phone("5551234567"), "(555) 123-4567");
        assert_eq!(format_phone("(555) 123-4567 ext 9"), "(555) 123-4567");
    }

    #[test]
    fn phone_holds_back_separator_the_customer_typed() {
        assert_eq!(format_phone("555 "), "555");
        assert_eq!(format_phone("(555) 123-"), "(555) 123");
    }

    #[test]
    fn phone_keeps_international_numbers_loose() {
        assert_eq!(format_phone("+44 20-7946 0958"), "+44 207946 0958");
        assert_eq!(format_phone("+1 (555)"), "+1 555");
    }

    #[test]
    fn card_numbers_are_grouped_by_brand() {
        assert_eq!(format_card_number("4242424242424242"), "4242 4242 4242 4242");
        assert_eq!(format_card_number("4242-42"), "4242 42");
        assert_eq!(format_card_number("378282246310005"), "3782 822463 10005");
        assert_eq!(format_card_number("3782822463100059999"), "3782 822463 10005");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn cvc_is_digits_only() {
        assert_eq!(format_card_cvc("12a3"), "123");
        assert_eq!(format_card_cvc("123456"), "1234");
    }

    #[test]
    fn pretty_json_preserves_key_order() {
        let pretty = pretty_json(r#"{"zeta":1,"alpha":[true]}"#).expect("valid json");
        assert_eq!(pretty, "{\n  \"zeta\": 1,\n  \"alpha\": [\n    true\n  ]\n}");
        assert!(pretty_json("{oops").is_err());
    }
}
