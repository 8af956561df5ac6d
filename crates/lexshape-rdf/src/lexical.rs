//! Lexical-space checks for the XSD datatypes lexshape reads and writes.
//!
//! Field registration, instance creation and SHACL validation all go through
//! [`is_valid_lexical`], so a literal accepted on the way in is never rejected
//! by the validator later.

use crate::vocab::xsd;

/// Whether `lexical` is in the lexical space of the datatype `datatype_iri`.
///
/// Datatypes outside the XSD namespace, and XSD types without a grammar here,
/// accept every lexical form.
pub fn is_valid_lexical(datatype_iri: &str, lexical: &str) -> bool {
    let Some(local) = datatype_iri.strip_prefix(xsd::NS) else {
        return true;
    };
    match local {
        "integer" => is_integer(lexical),
        "long" => is_integer(lexical) && lexical.parse::<i64>().is_ok(),
        "int" => is_integer(lexical) && lexical.parse::<i32>().is_ok(),
        "short" => is_integer(lexical) && lexical.parse::<i16>().is_ok(),
        "byte" => is_integer(lexical) && lexical.parse::<i8>().is_ok(),
        "nonNegativeInteger" => is_integer(lexical) && (!is_negative(lexical) || is_zero(lexical)),
        "positiveInteger" => is_integer(lexical) && !is_negative(lexical) && !is_zero(lexical),
        "nonPositiveInteger" => is_integer(lexical) && (is_negative(lexical) || is_zero(lexical)),
        "negativeInteger" => is_integer(lexical) && is_negative(lexical) && !is_zero(lexical),
        "decimal" => is_decimal(lexical),
        "double" | "float" => is_floating(lexical),
        "boolean" => matches!(lexical, "true" | "false" | "1" | "0"),
        "date" => chrono::NaiveDate::parse_from_str(lexical, "%Y-%m-%d").is_ok(),
        "dateTime" => {
            chrono::DateTime::parse_from_rfc3339(lexical).is_ok()
                || chrono::NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        "anyURI" => !lexical.contains(char::is_whitespace),
        _ => true,
    }
}

fn unsigned(lexical: &str) -> &str {
    lexical.strip_prefix(['+', '-']).unwrap_or(lexical)
}

fn is_negative(lexical: &str) -> bool {
    lexical.starts_with('-')
}

fn is_zero(lexical: &str) -> bool {
    unsigned(lexical).chars().all(|c| c == '0')
}

fn is_integer(lexical: &str) -> bool {
    let digits = unsigned(lexical);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal(lexical: &str) -> bool {
    let body = unsigned(lexical);
    let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
    (!whole.is_empty() || !frac.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

/// `xsd:double` / `xsd:float`: decimal or exponent notation, plus the three
/// special values in their exact spelling.
fn is_floating(lexical: &str) -> bool {
    if matches!(lexical, "INF" | "+INF" | "-INF" | "NaN") {
        return true;
    }
    let (mantissa, exponent) = match lexical.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (lexical, None),
    };
    is_decimal(mantissa) && exponent.map_or(true, is_integer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(local: &str, lexical: &str) -> bool {
        is_valid_lexical(&format!("{}{local}", xsd::NS), lexical)
    }

    #[test]
    fn numeric_grammars() {
        assert!(ok("integer", "-017"));
        assert!(!ok("integer", "1.0"));
        assert!(!ok("int", "3000000000"));
        assert!(ok("decimal", "-1.50"));
        assert!(ok("decimal", ".5"));
        assert!(!ok("decimal", "."));
        assert!(!ok("decimal", "1e3"));
        assert!(!ok("positiveInteger", "0"));
        assert!(ok("nonNegativeInteger", "-0"));
    }

    #[test]
    fn special_float_values_use_exact_spelling() {
        for bad in ["NaN", "inf", "INF", "Infinity", "nan"] {
            assert!(!ok("decimal", bad), "{bad} accepted as decimal");
        }
        assert!(ok("double", "INF"));
        assert!(ok("double", "-INF"));
        assert!(ok("float", "NaN"));
        assert!(ok("double", "1.5E-3"));
        for bad in ["inf", "infinity", "nan", "Infinity", "1e", "e3"] {
            assert!(!ok("double", bad), "{bad} accepted as double");
        }
    }

    #[test]
    fn dates_and_unknown_types() {
        assert!(ok("date", "2024-02-29"));
        assert!(!ok("date", "2023-02-29"));
        assert!(ok("dateTime", "2024-05-01T10:00:00Z"));
        assert!(ok("dateTime", "2024-05-01T10:00:00.250"));
        assert!(ok("gYear", "anything"));
        assert!(is_valid_lexical("http://example.org/custom", "x"));
    }
}
