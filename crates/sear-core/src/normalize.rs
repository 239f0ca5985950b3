//! Word normalization applied before indexing and querying.
//!
//! Indexed and queried terms must go through the same pipeline so that
//! lookups land on the same keys the indexer produced. The pipeline is:
//! plural trimming, length capping, case folding, punctuation stripping and
//! whitespace trimming, each step driven by [`NormalizeFlags`].

/// Maximum stored length of a word, in bytes. Longer words are truncated at
/// the preceding character boundary.
pub const MAX_WORD_LENGTH: usize = 63;

/// Minimum byte length a word must have to be indexed.
pub const MIN_WORD_LENGTH: usize = 3;

/// Stop words skipped while indexing when the option is on.
pub const COMMON_WORDS: &[&str] = &[
    "the", "and", "inc", "its", "this", "that", "not", "are", "was", "were", "been", "have",
    "has", "had", "does", "did", "can", "could", "may", "might", "must", "shall", "should",
    "will", "would", "for", "from",
];

/// Switches for [`format_word`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeFlags {
    /// Preserve the original case instead of folding to lowercase
    pub keep_case: bool,

    /// Strip a trailing plural marker from common English forms
    pub trim_plural: bool,

    /// Remove `.`, `,`, `:` and `;` anywhere in the word
    pub strip_punctuation: bool,
}

/// Normalize a single word.
pub fn format_word(word: &str, flags: NormalizeFlags) -> String {
    let mut s = word;

    // Plural trimming inspects raw bytes so multi-byte characters never
    // match the single-byte patterns.
    if flags.trim_plural {
        let b = s.as_bytes();
        let n = b.len();
        if n >= 4 && b[n - 1] == b's' {
            if b[n - 2] == b'e' && b[n - 3] == b's' {
                s = &s[..n - 2];
            } else if matches!(b[n - 2], b't' | b'r' | b'n' | b'd') {
                s = &s[..n - 1];
            }
        }
    }

    if s.len() > MAX_WORD_LENGTH {
        let mut cut = MAX_WORD_LENGTH;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s = &s[..cut];
    }

    let mut out = if flags.keep_case {
        s.to_string()
    } else {
        s.to_lowercase()
    };

    if flags.strip_punctuation {
        out.retain(|c| !matches!(c, '.' | ',' | ':' | ';'));
    }

    let trimmed = out.trim_matches(' ');
    if trimmed.len() != out.len() {
        trimmed.to_string()
    } else {
        out
    }
}

/// Trim quote, dot, colon and space characters from both ends.
pub fn clean_text(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '\'' | '.' | ':' | ' '))
}

/// Whether a word is too short or too common to index.
pub fn skip_word(word: &str, skip_common_words: bool) -> bool {
    if word.len() < MIN_WORD_LENGTH {
        return true;
    }
    if skip_common_words
        && COMMON_WORDS
            .iter()
            .any(|common| common.eq_ignore_ascii_case(word))
    {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold() -> NormalizeFlags {
        NormalizeFlags::default()
    }

    fn trim() -> NormalizeFlags {
        NormalizeFlags {
            trim_plural: true,
            ..NormalizeFlags::default()
        }
    }

    #[test]
    fn test_plural_trimming() {
        assert_eq!(format_word("cats", trim()), "cat");
        assert_eq!(format_word("managers", trim()), "manager");
        assert_eq!(format_word("runs", trim()), "run");
        assert_eq!(format_word("words", trim()), "word");
        assert_eq!(format_word("buses", trim()), "bus");
        // Preceding letter not in the marker set
        assert_eq!(format_word("glass", trim()), "glass");
        // Too short to trim
        assert_eq!(format_word("its", trim()), "its");
        // Capital S never matches
        assert_eq!(format_word("CATS", trim()), "cats");
        // Trimming off without the flag
        assert_eq!(format_word("cats", fold()), "cats");
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(format_word("MÉlanie", fold()), "mélanie");
        let keep = NormalizeFlags {
            keep_case: true,
            ..NormalizeFlags::default()
        };
        assert_eq!(format_word("MÉlanie", keep), "MÉlanie");
    }

    #[test]
    fn test_punctuation_stripping() {
        let flags = NormalizeFlags {
            strip_punctuation: true,
            ..NormalizeFlags::default()
        };
        assert_eq!(format_word("a.b,c:d;e", flags), "abcde");
        assert_eq!(format_word("a.b,c:d;e", fold()), "a.b,c:d;e");
    }

    #[test]
    fn test_length_cap_respects_char_boundaries() {
        let long = "a".repeat(100);
        assert_eq!(format_word(&long, fold()).len(), MAX_WORD_LENGTH);

        // 'é' is two bytes; place one straddling the cap.
        let mut tricky = "a".repeat(MAX_WORD_LENGTH - 1);
        tricky.push('é');
        tricky.push_str("tail");
        let formatted = format_word(&tricky, fold());
        assert_eq!(formatted.len(), MAX_WORD_LENGTH - 1);
        assert!(formatted.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("\"quoted\""), "quoted");
        assert_eq!(clean_text("'single.'"), "single");
        assert_eq!(clean_text(" : spaced : "), "spaced");
        assert_eq!(clean_text("inner'quote"), "inner'quote");
    }

    #[test]
    fn test_skip_word() {
        assert!(skip_word("ab", false));
        assert!(!skip_word("abc", false));
        assert!(skip_word("the", true));
        assert!(skip_word("THE", true));
        assert!(!skip_word("the", false));
        assert!(!skip_word("search", true));
    }
}
