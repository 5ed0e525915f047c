use std::sync::OnceLock;

use regex::Regex;

// Flag pairs, keycaps, then pictographs with optional presentation selector,
// skin-tone modifiers and zero-width-joiner continuations.
const EMOJI_PATTERN: &str = concat!(
    r"\p{Regional_Indicator}{2}",
    r"|[0-9#*]\x{FE0F}?\x{20E3}",
    r"|\p{Extended_Pictographic}[\x{FE0F}\p{Emoji_Modifier}]*",
    r"(?:\x{200D}\p{Extended_Pictographic}[\x{FE0F}\p{Emoji_Modifier}]*)*",
);

fn emoji_regex() -> &'static Regex {
    static EMOJI: OnceLock<Regex> = OnceLock::new();
    EMOJI.get_or_init(|| Regex::new(EMOJI_PATTERN).expect("emoji pattern is valid"))
}

/// First emoji sequence in an untrusted model reply.
///
/// Plain digits and punctuation never count, even though some of them carry
/// the Unicode `Emoji` property.
pub fn extract_emoji(text: &str) -> Option<String> {
    emoji_regex()
        .find(text)
        .map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::extract_emoji;

    #[test]
    fn finds_single_pictograph_in_prose() {
        assert_eq!(
            extract_emoji("Sure! Here is the emoji: \u{1FAA8}."),
            Some("\u{1FAA8}".to_string())
        );
    }

    #[test]
    fn keeps_variation_selector_and_modifiers() {
        assert_eq!(
            extract_emoji("\u{2702}\u{FE0F}"),
            Some("\u{2702}\u{FE0F}".to_string())
        );
        assert_eq!(
            extract_emoji("wave \u{1F44B}\u{1F3FD} hi"),
            Some("\u{1F44B}\u{1F3FD}".to_string())
        );
    }

    #[test]
    fn keeps_zwj_sequences_whole() {
        let astronaut = "\u{1F469}\u{200D}\u{1F680}";
        assert_eq!(extract_emoji(astronaut), Some(astronaut.to_string()));
    }

    #[test]
    fn matches_flags_and_keycaps() {
        assert_eq!(
            extract_emoji("\u{1F1EF}\u{1F1F5}"),
            Some("\u{1F1EF}\u{1F1F5}".to_string())
        );
        assert_eq!(
            extract_emoji("number \u{0031}\u{FE0F}\u{20E3}"),
            Some("1\u{FE0F}\u{20E3}".to_string())
        );
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            extract_emoji("\u{1F4C4} beats \u{1FAA8}"),
            Some("\u{1F4C4}".to_string())
        );
    }

    #[test]
    fn plain_text_and_digits_have_no_emoji() {
        assert_eq!(extract_emoji("I cannot help with that."), None);
        assert_eq!(extract_emoji("42 # *"), None);
        assert_eq!(extract_emoji(""), None);
    }
}
