use html_escape::decode_html_entities;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static TO_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+to\s+").expect("route regex"));

/// Dash and arrow separators tried after " to ", in this order
const ROUTE_SEPARATORS: [&str; 5] = [" - ", " – ", " — ", "->", "→"];

/// Decode HTML entities, drop any tags left over, collapse whitespace.
///
/// Entities are decoded first so that numeric entities (`&#36;`) never
/// leak their digits into the price stripper.
pub fn clean_text(fragment: &str) -> String {
    let decoded = decode_html_entities(fragment);
    let untagged = TAG.replace_all(&decoded, " ");
    untagged.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only digits and decimal points, then parse what is left.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok()
}

/// First run of digits anywhere in the text, 0 when there is none.
pub fn parse_seat_count(text: &str) -> u32 {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|run| run.parse().ok())
        .unwrap_or(0)
}

/// Split a free-text route into (origin, destination).
///
/// " to " wins over dash/arrow separators. With a separator, the first and
/// last non-empty parts are used so multi-leg routes collapse to their ends.
/// An unsplittable route comes back as the trimmed input twice.
pub fn parse_route(text: &str) -> (String, String) {
    let txt = text.trim();
    if txt.is_empty() {
        return (String::new(), String::new());
    }

    let parts: Vec<&str> = TO_SEPARATOR.splitn(txt, 2).collect();
    if let [origin, destination] = parts.as_slice() {
        return (origin.trim().to_string(), destination.trim().to_string());
    }

    for sep in ROUTE_SEPARATORS {
        if !txt.contains(sep) {
            continue;
        }
        let parts: Vec<&str> = txt.split(sep).map(str::trim).filter(|p| !p.is_empty()).collect();
        if let (Some(first), Some(last)) = (parts.first(), parts.last()) {
            if parts.len() >= 2 {
                return (first.to_string(), last.to_string());
            }
        }
    }

    (txt.to_string(), txt.to_string())
}

/// True when `parse_route` would split the route into two ends
pub fn has_route_separator(route: &str) -> bool {
    TO_SEPARATOR.is_match(route) || ROUTE_SEPARATORS.iter().any(|sep| route.contains(sep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_with_currency_and_separators() {
        assert_eq!(parse_price("$1,234.50"), Some(Decimal::new(123450, 2)));
        assert_eq!(parse_price("£ 12 500"), Some(Decimal::new(12500, 0)));
        assert_eq!(parse_price("USD 8,000.00 per seat"), Some(Decimal::new(8000, 0)));
    }

    #[test]
    fn test_price_missing_or_garbage() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Call for price"), None);
        assert_eq!(parse_price("1.2.3"), None);
    }

    #[test]
    fn test_entities_are_decoded_before_stripping() {
        let raw = "&#36;12,500.00";
        // Stripping the raw fragment picks up the entity's digits.
        assert_eq!(parse_price(raw), Some(Decimal::new(361250000, 2)));
        assert_eq!(parse_price(&clean_text(raw)), Some(Decimal::new(12500, 0)));

        let nbsp = "<bdi><span>$</span>9&nbsp;750</bdi>";
        assert_eq!(clean_text(nbsp), "$ 9 750");
        assert_eq!(parse_price(&clean_text(nbsp)), Some(Decimal::new(9750, 0)));
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Operator:\n\t Pegasus&nbsp;Elite  "), "Operator: Pegasus Elite");
        assert_eq!(clean_text("a &amp; b"), "a & b");
    }

    #[test]
    fn test_seat_count() {
        assert_eq!(parse_seat_count("6 Seats Available"), 6);
        assert_eq!(parse_seat_count("Only 2 left, was 10"), 2);
        assert_eq!(parse_seat_count("Sold Out"), 0);
        assert_eq!(parse_seat_count(""), 0);
    }

    #[test]
    fn test_route_split_on_to() {
        assert_eq!(
            parse_route("Teterboro, New Jersey to Dubai, UAE"),
            ("Teterboro, New Jersey".to_string(), "Dubai, UAE".to_string())
        );
        assert_eq!(
            parse_route("Toronto, Canada TO Paris, France"),
            ("Toronto, Canada".to_string(), "Paris, France".to_string())
        );
    }

    #[test]
    fn test_route_split_on_dashes_and_arrows() {
        assert_eq!(
            parse_route("London, UK - Van Nuys, California"),
            ("London, UK".to_string(), "Van Nuys, California".to_string())
        );
        assert_eq!(
            parse_route("Teterboro, New Jersey – Dubai, UAE"),
            ("Teterboro, New Jersey".to_string(), "Dubai, UAE".to_string())
        );
        assert_eq!(
            parse_route("London -> Paris -> Dubai"),
            ("London".to_string(), "Dubai".to_string())
        );
        assert_eq!(parse_route("Lisbon→Madrid"), ("Lisbon".to_string(), "Madrid".to_string()));
    }

    #[test]
    fn test_route_fallback() {
        assert_eq!(
            parse_route("  Unsplittable Text "),
            ("Unsplittable Text".to_string(), "Unsplittable Text".to_string())
        );
        assert_eq!(parse_route("London - "), ("London -".to_string(), "London -".to_string()));
    }

    #[test]
    fn test_route_separator_detection() {
        assert!(has_route_separator("London -> Paris"));
        assert!(has_route_separator("London To Paris"));
        assert!(has_route_separator("London, UK - Van Nuys, California"));
        assert!(has_route_separator("Teterboro – Dubai"));
        assert!(has_route_separator("Lisbon→Madrid"));
        assert!(!has_route_separator("Paris, France"));
        assert!(!has_route_separator("Toronto, Canada"));
        assert!(!has_route_separator("Kailua-Kona"));
    }
}
