// Validation helpers shared by request DTOs and services
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// E.164-ish phone numbers: optional +, 10 to 15 digits, spaces allowed between groups
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 ]{8,18}[0-9]$").unwrap();

    /// Lower-case catalogue slugs such as `hair`, `skin-care`, `nail_art`
    pub static ref CATEGORY_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_-]{1,49}$").unwrap();
}

/// Min 8 chars with upper case, lower case, a digit and a special character.
pub fn validate_password_strength(password: &str) -> Result<(), validator::ValidationError> {
    if password.chars().count() < 8 {
        return Err(validator::ValidationError::new("password_too_short"));
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_uppercase || !has_lowercase || !has_digit || !has_special {
        return Err(validator::ValidationError::new("password_complexity"));
    }

    Ok(())
}

/// Trim a required string field, rejecting blanks.
pub fn trim_and_validate_field(field: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() && required {
        return Err("Field cannot be empty".to_string());
    }
    Ok(trimmed)
}

/// Trim an optional field; blank values collapse to `None`.
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Build an `ILIKE` pattern matching `term` anywhere, with LIKE wildcards escaped.
pub fn ilike_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Randevu2025!").is_ok());
        assert_eq!(
            validate_password_strength("Ab1!").unwrap_err().code,
            "password_too_short"
        );
        assert_eq!(
            validate_password_strength("alllowercase1!").unwrap_err().code,
            "password_complexity"
        );
        assert_eq!(
            validate_password_strength("NoDigitsHere!").unwrap_err().code,
            "password_complexity"
        );
    }

    #[test]
    fn test_phone_regex() {
        assert!(PHONE_REGEX.is_match("+905321234567"));
        assert!(PHONE_REGEX.is_match("0532 123 45 67"));
        assert!(!PHONE_REGEX.is_match("12345"));
        assert!(!PHONE_REGEX.is_match("+90-532-abc"));
    }

    #[test]
    fn test_category_regex() {
        assert!(CATEGORY_REGEX.is_match("skin-care"));
        assert!(CATEGORY_REGEX.is_match("hair"));
        assert!(!CATEGORY_REGEX.is_match("Hair"));
        assert!(!CATEGORY_REGEX.is_match("x"));
    }

    #[test]
    fn test_trim_helpers() {
        assert_eq!(trim_and_validate_field("  Kuaför  ", true).unwrap(), "Kuaför");
        assert!(trim_and_validate_field("   ", true).is_err());
        assert_eq!(trim_and_validate_field("   ", false).unwrap(), "");
        assert_eq!(trim_optional_field(Some(&"  ".to_string())), None);
        assert_eq!(
            trim_optional_field(Some(&" Kadıköy ".to_string())),
            Some("Kadıköy".to_string())
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ayse@Example.COM "), "ayse@example.com");
    }

    #[test]
    fn test_ilike_pattern_escapes_wildcards() {
        assert_eq!(ilike_pattern("spa"), "%spa%");
        assert_eq!(ilike_pattern("50%_off"), "%50\\%\\_off%");
    }
}
