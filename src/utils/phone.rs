use std::sync::OnceLock;

use regex::Regex;

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\-()]").unwrap())
}

fn normalized_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+234[0-9]{10}$").unwrap())
}

/// Normalizes a phone number to the single `+234...` format the SMS provider
/// expects. Accepts local (`0803...`), bare international (`234803...`) and
/// already-normalized (`+234803...`) inputs. Returns None when the input
/// cannot be interpreted as a Nigerian mobile number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits_only = separator_regex().replace_all(raw.trim(), "");
    let candidate = digits_only.as_ref();

    let normalized = if let Some(rest) = candidate.strip_prefix("+234") {
        format!("+234{}", rest)
    } else if let Some(rest) = candidate.strip_prefix("234") {
        format!("+234{}", rest)
    } else if let Some(rest) = candidate.strip_prefix('0') {
        format!("+234{}", rest)
    } else {
        return None;
    };

    // +234 followed by a 10-digit subscriber number
    if normalized_regex().is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_format_gets_country_code() {
        assert_eq!(
            normalize_phone("08031234567").as_deref(),
            Some("+2348031234567")
        );
    }

    #[test]
    fn international_without_plus() {
        assert_eq!(
            normalize_phone("2348031234567").as_deref(),
            Some("+2348031234567")
        );
    }

    #[test]
    fn already_normalized_passes_through() {
        assert_eq!(
            normalize_phone("+2348031234567").as_deref(),
            Some("+2348031234567")
        );
    }

    #[test]
    fn separators_are_stripped() {
        assert_eq!(
            normalize_phone("0803 123-4567").as_deref(),
            Some("+2348031234567")
        );
    }

    #[test]
    fn repeated_calls_reuse_the_compiled_patterns() {
        for _ in 0..3 {
            assert_eq!(
                normalize_phone("08031234567").as_deref(),
                Some("+2348031234567")
            );
            assert_eq!(normalize_phone("nope"), None);
        }
    }

    #[test]
    fn garbage_is_rejected()  {
        assert_eq!(normalize_phone("not a number"), None);
        assert_eq!(normalize_phone("0803123"), None);
        assert_eq!(normalize_phone(""), None);
    }
}
