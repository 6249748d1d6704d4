// Field-level input checks shared by the account and flight services

pub const REQUIRED: &str = "This field is required.";

/// Letters and single `',. -` separators between letter runs
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars().peekable();

    match chars.peek() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }

    let mut previous_was_separator = false;
    while let Some(c) = chars.next() {
        if c.is_alphabetic() {
            previous_was_separator = false;
        } else if matches!(c, '\'' | ',' | '.' | ' ' | '-') {
            if previous_was_separator && c != ' ' {
                return false;
            }
            previous_was_separator = true;
        } else {
            return false;
        }
    }

    true
}

/// Optional leading `+` followed by 8 to 15 digits
pub fn is_valid_phone_number(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Lowercases the domain part, as mail servers treat it case-insensitively
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_airport_code(value: &str) -> bool {
    value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic())
}
