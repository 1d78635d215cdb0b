use crate::constants::{STATE_UNAVAILABLE, STATE_UNKNOWN};
use crate::error::ConversionError;

/// Parse an entity state as a float (e.g. `"500"`, `" 1.5e3 "`)
pub fn convert_to_float(value: &str) -> Result<f64, ConversionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConversionError::Empty);
    }

    let parsed: f64 = trimmed
        .parse()
        .map_err(|_| ConversionError::NotANumber(value.to_string()))?;

    if !parsed.is_finite() {
        return Err(ConversionError::NotFinite(value.to_string()));
    }

    Ok(parsed)
}

/// Interpret an entity state as a boolean; anything not truthy is false
pub fn convert_to_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "yes" | "1"
    )
}

/// Whether a state carries a reading at all
pub fn is_readable(state: &str) -> bool {
    let trimmed = state.trim();
    !trimmed.is_empty() && trimmed != STATE_UNKNOWN && trimmed != STATE_UNAVAILABLE
}

/// Render a float state the way the state store expects (`500` -> `"500.0"`)
pub fn format_state(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500", 500.0)]
    #[case(" 120.5 ", 120.5)]
    #[case("-42", -42.0)]
    #[case("1e3", 1000.0)]
    fn test_convert_to_float(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(convert_to_float(input).unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("12W")]
    #[case("unavailable")]
    fn test_convert_to_float_rejects_text(#[case] input: &str) {
        assert!(matches!(
            convert_to_float(input),
            Err(ConversionError::NotANumber(_))
        ));
    }

    #[test]
    fn test_convert_to_float_rejects_empty_and_non_finite() {
        assert_eq!(convert_to_float("  "), Err(ConversionError::Empty));
        assert!(matches!(
            convert_to_float("NaN"),
            Err(ConversionError::NotFinite(_))
        ));
        assert!(matches!(
            convert_to_float("inf"),
            Err(ConversionError::NotFinite(_))
        ));
    }

    #[rstest]
    #[case("on", true)]
    #[case("True", true)]
    #[case("yes", true)]
    #[case("1", true)]
    #[case("off", false)]
    #[case("false", false)]
    #[case("unknown", false)]
    #[case("", false)]
    fn test_convert_to_boolean(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(convert_to_boolean(input), expected);
    }

    #[test]
    fn test_is_readable() {
        assert!(is_readable("0"));
        assert!(is_readable("abc"));
        assert!(!is_readable(""));
        assert!(!is_readable("unknown"));
        assert!(!is_readable("unavailable"));
    }

    #[test]
    fn test_format_state() {
        assert_eq!(format_state(380.0), "380.0");
        assert_eq!(format_state(0.0), "0.0");
        assert_eq!(format_state(-20.0), "-20.0");
        assert_eq!(format_state(12.25), "12.25");
    }
}
