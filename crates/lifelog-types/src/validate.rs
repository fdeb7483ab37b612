use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());
static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());
static TAG_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9 _-]*$").unwrap());

pub const MAX_TAG_NAME_LEN: usize = 100;

/// YYYY-MM-DD with a real calendar date behind it
pub fn is_valid_date(s: &str) -> bool {
    DATE_RE.is_match(s) && chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// HH:MM, 24-hour
pub fn is_valid_time(s: &str) -> bool {
    TIME_RE.is_match(s)
}

/// #rrggbb hex color
pub fn is_valid_color(s: &str) -> bool {
    COLOR_RE.is_match(s)
}

/// Normalize a tag name: lowercase, trimmed. Callers validate afterwards.
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Alphanumeric plus dashes, underscores, spaces; already normalized to lowercase
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_TAG_NAME_LEN && TAG_NAME_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates() {
        assert!(is_valid_date("2025-08-01"));
        assert!(!is_valid_date("2025-13-01"));
        assert!(!is_valid_date("2025-8-1"));
        assert!(!is_valid_date("yesterday"));
    }

    #[test]
    fn times() {
        assert!(is_valid_time("00:00"));
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("9:30"));
    }

    #[test]
    fn colors() {
        assert!(is_valid_color("#A1b2C3"));
        assert!(!is_valid_color("A1b2C3"));
        assert!(!is_valid_color("#fff"));
    }

    #[test]
    fn tag_names() {
        assert_eq!(normalize_tag_name("  Deep Work "), "deep work");
        assert!(is_valid_tag_name("deep work"));
        assert!(is_valid_tag_name("code-review_2"));
        assert!(!is_valid_tag_name(""));
        assert!(!is_valid_tag_name("-leading-dash"));
        assert!(!is_valid_tag_name(&"x".repeat(101)));
    }
}
