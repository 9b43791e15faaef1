/// Maximum number of words kept in a derived conversation title
const TITLE_WORDS: usize = 6;
const ELLIPSIS: &str = "...";

/// Derive a conversation title from the first user message.
///
/// Keeps the first six whitespace-separated words and appends `...` when the
/// message had more.
pub fn derive_title(first_message: &str) -> String {
    let mut words = first_message.split_whitespace();
    let head: Vec<&str> = words.by_ref().take(TITLE_WORDS).collect();
    let mut title = head.join(" ");
    if words.next().is_some() {
        title.push_str(ELLIPSIS);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_kept_whole() {
        assert_eq!(derive_title("turbine vibration alarm"), "turbine vibration alarm");
    }

    #[test]
    fn test_exactly_six_words_has_no_ellipsis() {
        assert_eq!(
            derive_title("one two three four five six"),
            "one two three four five six"
        );
    }

    #[test]
    fn test_long_message_is_truncated() {
        assert_eq!(
            derive_title("why does turbine T07 gearbox overheat every afternoon"),
            "why does turbine T07 gearbox overheat..."
        );
    }

    #[test]
    fn test_irregular_whitespace_is_collapsed() {
        assert_eq!(derive_title("  pitch\tsystem \n fault  "), "pitch system fault");
    }
}
