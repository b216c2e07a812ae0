//! Native literals for numbers and strings.

/// Native expression for the number `value`.
///
/// Integral values in `int` range print as integers, the IEEE special
/// values print as `std::numeric_limits` expressions, and everything else
/// prints in the shortest form that parses back to the same double.
pub fn numeric_literal(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0".to_string() } else { "0".to_string() };
    }
    if value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        let truncated = value as i32;
        if f64::from(truncated) == value {
            return truncated.to_string();
        }
    }
    if value.is_infinite() {
        let infinity = "std::numeric_limits<double>::infinity()";
        return if value.is_sign_negative() { format!("-{}", infinity) } else { infinity.to_string() };
    }
    if value.is_nan() {
        return "std::numeric_limits<double>::quiet_NaN()".to_string();
    }
    // Debug is the shortest round-trip form and switches to exponents for
    // very large and very small magnitudes.
    format!("{:?}", value)
}

/// `QStringLiteral("...")` with backslashes, quotes and line breaks escaped.
pub fn string_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    format!("QStringLiteral(\"{}\")", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(numeric_literal(42.0), "42");
        assert_eq!(numeric_literal(-7.0), "-7");
        assert_eq!(numeric_literal(f64::from(i32::MAX)), "2147483647");
    }

    #[test]
    fn test_signed_zero() {
        assert_eq!(numeric_literal(0.0), "0");
        assert_eq!(numeric_literal(-0.0), "-0.0");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(numeric_literal(f64::INFINITY), "std::numeric_limits<double>::infinity()");
        assert_eq!(numeric_literal(f64::NEG_INFINITY), "-std::numeric_limits<double>::infinity()");
        assert_eq!(numeric_literal(f64::NAN), "std::numeric_limits<double>::quiet_NaN()");
    }

    #[test]
    fn test_fractions_round_trip() {
        assert_eq!(numeric_literal(0.1), "0.1");
        assert_eq!(numeric_literal(-2.5), "-2.5");
        assert_eq!(numeric_literal(4294967296.0), "4294967296.0");
    }

    #[test]
    fn test_extreme_magnitudes_round_trip() {
        for value in [1e-20, -1e-300, f64::MIN_POSITIVE, 5e-324, 1e300, f64::MAX, 0.1 + 0.2] {
            let text = numeric_literal(value);
            assert!(text.len() < 32, "{}", text);
            assert_eq!(text.parse::<f64>().ok(), Some(value), "{}", text);
        }
        assert_eq!(numeric_literal(1e-20), "1e-20");
        assert_eq!(numeric_literal(1e300), "1e300");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(string_literal("plain"), "QStringLiteral(\"plain\")");
        assert_eq!(string_literal("a \"b\"\n\\"), "QStringLiteral(\"a \\\"b\\\"\\n\\\\\")");
    }
}
