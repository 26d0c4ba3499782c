use bigdecimal::BigDecimal;
use std::fmt;

pub const PINCODE_LEN: usize = 6;
pub const EMAIL_MAX_LEN: usize = 255;
pub const NOTE_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    // Collapse whitespace first; control characters used as separators
    // (tabs, newlines) must still split words before being dropped.
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|ch| !ch.is_control())
        .collect()
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_email(field: &'static str, value: &str) -> ValidationResult {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, EMAIL_MAX_LEN)?;

    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::new(field, "must be a valid email address"));
    }

    Ok(())
}

pub fn validate_pincode(field: &'static str, value: &str) -> ValidationResult {
    let value = sanitize_string(value);
    validate_required(field, &value)?;

    if value.len() != PINCODE_LEN || !value.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            field,
            format!("must be exactly {} digits", PINCODE_LEN),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_latitude(lat: f64) -> ValidationResult {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::new("lat", "must be between -90 and 90"));
    }

    Ok(())
}

pub fn validate_longitude(lng: f64) -> ValidationResult {
    if !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::new("lng", "must be between -180 and 180"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("hello\nworld"), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
        assert_eq!(sanitize_string("a\tb\u{0007}c"), "a bc");
    }

    #[test]
    fn validates_email() {
        assert!(validate_email("user_email", "jane@example.com").is_ok());
        assert!(validate_email("user_email", "  jane@example.com  ").is_ok());
        assert!(validate_email("user_email", "jane").is_err());
        assert!(validate_email("user_email", "@example.com").is_err());
        assert!(validate_email("user_email", "jane@com").is_err());
        assert!(validate_email("user_email", "").is_err());
    }

    #[test]
    fn validates_pincode() {
        assert!(validate_pincode("pickup_pincode", "560001").is_ok());
        assert!(validate_pincode("pickup_pincode", " 560001 ").is_ok());
        assert!(validate_pincode("pickup_pincode", "5600").is_err());
        assert!(validate_pincode("pickup_pincode", "56000a").is_err());
        assert!(validate_pincode("pickup_pincode", "5600012").is_err());
    }

    #[test]
    fn validates_positive_amount() {
        let positive = BigDecimal::from_str("4500.00").expect("valid decimal");
        let zero = BigDecimal::from(0);
        let negative = BigDecimal::from(-1);

        assert!(validate_positive_amount(&positive).is_ok());
        assert!(validate_positive_amount(&zero).is_err());
        assert!(validate_positive_amount(&negative).is_err());
    }

    #[test]
    fn validates_coordinates() {
        assert!(validate_latitude(12.97).is_ok());
        assert!(validate_latitude(91.0).is_err());
        assert!(validate_longitude(77.59).is_ok());
        assert!(validate_longitude(-181.0).is_err());
    }
}
