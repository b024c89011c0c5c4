use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}]+").expect("slug pattern is valid")
});

/// Lower-case `text` and collapse every run of characters that are neither
/// letters nor digits (in any script) into `-`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  About   Us  "), "about-us");
        assert_eq!(slugify("2024 Roadmap"), "2024-roadmap");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slugify_keeps_non_ascii_letters() {
        assert_eq!(slugify("Café"), "café");
        assert_eq!(slugify("東京ガイド"), "東京ガイド");
        assert_eq!(slugify("東京 ganda!"), "東京-ganda");
        assert_ne!(slugify("Café"), slugify("Cafe"));
    }
}
