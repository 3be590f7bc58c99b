//! Validation utilities for the Tea Factory Management Platform
//!
//! Includes Sri Lanka-specific validations and the fat-finger heuristics
//! applied to collection entry forms.

use rust_decimal::Decimal;

// ============================================================================
// Catalogue Validations
// ============================================================================

/// Validate a retail price: positive with at most 2 decimal places
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Price must be positive");
    }
    if price.normalize().scale() > 2 {
        return Err("Price may have at most 2 decimal places");
    }
    Ok(())
}

/// Validate a stock level or minimum-stock threshold
pub fn validate_stock_level(level: i32) -> Result<(), &'static str> {
    if level < 0 {
        return Err("Stock level cannot be negative");
    }
    Ok(())
}

/// Validate batch number format (e.g. "BT-2025-0042"):
/// 3-20 characters, uppercase alphanumeric and dashes
pub fn validate_batch_no(batch_no: &str) -> Result<(), &'static str> {
    if batch_no.len() < 3 {
        return Err("Batch number must be at least 3 characters");
    }
    if batch_no.len() > 20 {
        return Err("Batch number must be at most 20 characters");
    }
    if !batch_no
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Batch number must be uppercase alphanumeric");
    }
    Ok(())
}

// ============================================================================
// Collection Entry Validations
// ============================================================================

/// True when the string contains a run of 3 or more identical consecutive
/// digits (e.g. "111", "25.888").
///
/// Fat-finger heuristic carried over from the collection entry forms; a run
/// broken by a non-digit character (such as the decimal point) does not
/// count.
pub fn has_repeated_digit_run(s: &str) -> bool {
    let mut run_char = '\0';
    let mut run_len = 0;
    for c in s.chars() {
        if c.is_ascii_digit() && c == run_char {
            run_len += 1;
            if run_len >= 3 {
                return true;
            }
        } else if c.is_ascii_digit() {
            run_char = c;
            run_len = 1;
        } else {
            run_char = '\0';
            run_len = 0;
        }
    }
    false
}

/// Validate a collection amount (delivery weight or per-kg rate): positive
/// and free of repeated-digit runs in its decimal representation
pub fn validate_collection_amount(value: Decimal) -> Result<(), &'static str> {
    if value <= Decimal::ZERO {
        return Err("Amount must be positive");
    }
    if has_repeated_digit_run(&value.normalize().to_string()) {
        return Err("Amount looks mistyped (repeated digits)");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Sri Lanka-Specific Validations
// ============================================================================

/// Validate Sri Lankan phone number format
/// Accepts: 0771234567, 077-123-4567, +94771234567
pub fn validate_sri_lankan_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if has_repeated_digit_run(&digits) {
        return Err("Phone number looks mistyped (repeated digits)");
    }

    // Local mobile/landline: 10 digits starting with 0 (e.g. 0771234567)
    if digits.len() == 10 && digits.starts_with('0') {
        return Ok(());
    }
    // Without the leading 0: 9 digits (e.g. 771234567)
    if digits.len() == 9 && !digits.starts_with('0') {
        return Ok(());
    }
    // International format with country code: 11 digits starting with 94
    if digits.len() == 11 && digits.starts_with("94") {
        return Ok(());
    }

    Err("Invalid Sri Lankan phone number format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Catalogue Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_price_valid() {
        assert!(validate_price(dec("450")).is_ok());
        assert!(validate_price(dec("450.5")).is_ok());
        assert!(validate_price(dec("450.25")).is_ok());
    }

    #[test]
    fn test_validate_price_invalid() {
        assert!(validate_price(dec("0")).is_err());
        assert!(validate_price(dec("-10")).is_err());
        assert!(validate_price(dec("450.125")).is_err()); // 3 decimal places
    }

    #[test]
    fn test_validate_price_trailing_zeros_ok() {
        // 450.2500 normalizes to 450.25
        assert!(validate_price(dec("450.2500")).is_ok());
    }

    #[test]
    fn test_validate_stock_level() {
        assert!(validate_stock_level(0).is_ok());
        assert!(validate_stock_level(500).is_ok());
        assert!(validate_stock_level(-1).is_err());
    }

    #[test]
    fn test_validate_batch_no_valid() {
        assert!(validate_batch_no("BT-2025-0042").is_ok());
        assert!(validate_batch_no("GRN001").is_ok());
    }

    #[test]
    fn test_validate_batch_no_invalid() {
        assert!(validate_batch_no("BT").is_err()); // Too short
        assert!(validate_batch_no("BT-2025-0042-EXTRA-LONG").is_err()); // Too long
        assert!(validate_batch_no("bt-2025").is_err()); // Lowercase
        assert!(validate_batch_no("BT_2025").is_err()); // Underscore
    }

    // ========================================================================
    // Collection Entry Validation Tests
    // ========================================================================

    #[test]
    fn test_repeated_digit_run_detection() {
        assert!(has_repeated_digit_run("111"));
        assert!(has_repeated_digit_run("25.888"));
        assert!(has_repeated_digit_run("120007777"));
        assert!(!has_repeated_digit_run("25.5"));
        assert!(!has_repeated_digit_run("1212"));
        assert!(!has_repeated_digit_run("11"));
    }

    #[test]
    fn test_repeated_run_broken_by_decimal_point() {
        // "55.5" is two digits, a point, then one digit: no run of 3
        assert!(!has_repeated_digit_run("55.5"));
        assert!(has_repeated_digit_run("5.555"));
    }

    #[test]
    fn test_validate_collection_amount_valid() {
        assert!(validate_collection_amount(dec("10")).is_ok());
        assert!(validate_collection_amount(dec("250.5")).is_ok());
    }

    #[test]
    fn test_validate_collection_amount_invalid() {
        assert!(validate_collection_amount(dec("0")).is_err());
        assert!(validate_collection_amount(dec("-5")).is_err());
        assert!(validate_collection_amount(dec("111")).is_err());
        assert!(validate_collection_amount(dec("2.555")).is_err());
    }

    #[test]
    fn test_validate_collection_amount_normalizes_first() {
        // 25.500 normalizes to 25.5, so the trailing zeros never form a run
        assert!(validate_collection_amount(dec("25.500")).is_ok());
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.lk").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
        assert!(validate_email("@.").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
    }

    // ========================================================================
    // Sri Lanka-Specific Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_sri_lankan_phone_valid() {
        // Standard mobile
        assert!(validate_sri_lankan_phone("0771234567").is_ok());
        // With dashes
        assert!(validate_sri_lankan_phone("077-123-4567").is_ok());
        // Without leading zero
        assert!(validate_sri_lankan_phone("771234567").is_ok());
        // International format
        assert!(validate_sri_lankan_phone("+94771234567").is_ok());
        assert!(validate_sri_lankan_phone("94771234567").is_ok());
    }

    #[test]
    fn test_validate_sri_lankan_phone_invalid() {
        assert!(validate_sri_lankan_phone("12345").is_err());
        assert!(validate_sri_lankan_phone("123456789012").is_err());
        assert!(validate_sri_lankan_phone("abcdefghij").is_err());
        // Repeated-digit heuristic
        assert!(validate_sri_lankan_phone("0777777777").is_err());
    }
}
