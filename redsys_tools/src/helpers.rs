//! Field validation rules imposed by the gateway.

/// The gateway only accepts alphanumeric order references, so separators are stripped from store order numbers.
///
/// `LV261016-001` becomes `LV261016001`.
pub fn gateway_order_reference(order_number: &str) -> String {
    order_number.chars().filter(char::is_ascii_alphanumeric).collect()
}

pub fn is_valid_order_reference(reference: &str) -> bool {
    (4..=12).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_valid_merchant_code(code: &str) -> bool {
    code.len() == 9 && code.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_terminal(terminal: &str) -> bool {
    (1..=3).contains(&terminal.len()) && terminal.chars().all(|c| c.is_ascii_digit())
}
