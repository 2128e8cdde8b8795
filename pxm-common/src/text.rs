//! Text normalization helpers shared by entity naming and slug generation

use deunicode::deunicode_with_tofu;

/// Default maximum length for descriptive fields (characters)
pub const CLIP_DEFAULT: usize = 160;

/// Maximum length of the text a slug is generated from (characters)
pub const CLIP_SLUG: usize = 80;

/// Trim surrounding whitespace and truncate to at most `max_chars` characters.
///
/// Truncation happens on character boundaries, and the result is trimmed
/// again so a cut never leaves trailing whitespace.
pub fn clip(value: &str, max_chars: usize) -> String {
    let trimmed = value.trim();

    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let clipped: String = trimmed.chars().take(max_chars).collect();
    clipped.trim_end().to_string()
}

/// Generate a lowercase ASCII slug joined by `-`.
///
/// Text is transliterated to ASCII first, so accented Latin, Cyrillic and
/// CJK names keep distinct slugs. Characters with no transliteration and
/// anything that is not an ASCII letter or digit act as separators.
/// Returns an empty string when nothing slug-worthy remains.
pub fn slugify(value: &str) -> String {
    let ascii = deunicode_with_tofu(value, "-");

    let folded: String = ascii
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    // Collapse duplicate dashes produced by punctuation stripping.
    folded
        .split('-')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_trims_and_truncates() {
        assert_eq!(clip("  Canon  ", CLIP_DEFAULT), "Canon");
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab cdef", 3), "ab");
        assert_eq!(clip("", 10), "");
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("ééééé", 2), "éé");
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Canon EF24-70mm"), "canon-ef24-70mm");
        assert_eq!(slugify("Apple iPhone SE back camera 4.15mm f/2.2"), "apple-iphone-se-back-camera-4-15mm-f-2-2");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Señor Café"), "senor-cafe");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("--a  //  b--"), "a-b");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slugify_transliterates_cyrillic() {
        assert_eq!(slugify("Зенит Гелиос-44"), "zenit-gelios-44");
        assert_ne!(slugify("Гелиос-44"), slugify("Юпитер-44"));
    }

    #[test]
    fn test_slugify_transliterates_cjk() {
        let japan = slugify("日本");
        assert!(!japan.is_empty());
        assert!(japan.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        assert_ne!(japan, slugify("中国"));
    }

    #[test]
    fn test_slugify_is_deterministic() {
        assert_eq!(slugify("NIKON Z 24-70mm f/4"), slugify("NIKON Z 24-70mm f/4"));
    }
}
