//! Region-level text concatenation.
//!
//! Joins recognized line texts into one region string while filtering out
//! the noise artifacts handwriting OCR produces for decorative strokes and
//! line-break markers: empty lines and lines consisting of a lone hyphen.
//! Excluded lines stay in the document for traceability; only the join
//! skips them.

use crate::core::config::ConcatConfig;

/// Outcome of concatenating one region's line texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOutcome {
    /// The joined text.
    pub text: String,
    /// Number of lines excluded as empty or lone-hyphen noise.
    pub line_breaks_handled: usize,
    /// Best-effort count of hyphenated word continuations.
    ///
    /// Counts included lines whose trimmed text ends with `-` and whose
    /// following included line starts with a lowercase letter. The text
    /// itself is never rewritten; the metric only flags likely
    /// continuations for the reviewer.
    pub merged_words: usize,
}

/// Returns true for texts treated as noise rather than content.
pub fn is_noise(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == "-"
}

/// Concatenates line texts in source order.
///
/// Lines whose trimmed text is noise (see [`is_noise`]) are skipped and
/// counted in `line_breaks_handled`; the rest are joined with the
/// configured delimiter.
pub fn concatenate<'a, I>(texts: I, config: &ConcatConfig) -> ConcatOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let mut included: Vec<&str> = Vec::new();
    let mut line_breaks_handled = 0;

    for text in texts {
        if is_noise(text) {
            line_breaks_handled += 1;
        } else {
            included.push(text.trim());
        }
    }

    let merged_words = included
        .windows(2)
        .filter(|pair| {
            pair[0].ends_with('-')
                && pair[1]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_lowercase())
        })
        .count();

    ConcatOutcome {
        text: included.join(&config.delimiter),
        line_breaks_handled,
        merged_words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(texts: &[&str]) -> ConcatOutcome {
        concatenate(texts.iter().copied(), &ConcatConfig::default())
    }

    #[test]
    fn test_noise_filter() {
        assert!(is_noise(""));
        assert!(is_noise("   "));
        assert!(is_noise("-"));
        assert!(is_noise(" - "));
        assert!(!is_noise("a-"));
        assert!(!is_noise("--"));
    }

    #[test]
    fn test_empty_and_hyphen_lines_excluded() {
        let outcome = concat(&["", "-", "Hello"]);
        assert_eq!(outcome.text, "Hello");
        assert_eq!(outcome.line_breaks_handled, 2);
        assert_eq!(outcome.merged_words, 0);
    }

    #[test]
    fn test_delimiter_joins_included_lines() {
        let outcome = concat(&["первая", "вторая"]);
        assert_eq!(outcome.text, "первая\nвторая");
        assert_eq!(outcome.line_breaks_handled, 0);
    }

    #[test]
    fn test_custom_delimiter() {
        let config = ConcatConfig {
            delimiter: " ".to_string(),
        };
        let outcome = concatenate(["a", "b"], &config);
        assert_eq!(outcome.text, "a b");
    }

    #[test]
    fn test_merged_words_counts_hyphen_continuations() {
        let outcome = concat(&["выда-", "но третьему", "лицу"]);
        assert_eq!(outcome.merged_words, 1);
        assert_eq!(outcome.text, "выда-\nно третьему\nлицу");
    }

    #[test]
    fn test_merged_words_ignores_capitalized_continuation() {
        let outcome = concat(&["выда-", "Петров"]);
        assert_eq!(outcome.merged_words, 0);
    }

    #[test]
    fn test_noise_between_continuation_lines_breaks_the_pair() {
        let outcome = concat(&["выда-", "-", "но"]);
        // The lone hyphen is filtered out first, so the remaining pair is
        // still adjacent and counts as a continuation.
        assert_eq!(outcome.line_breaks_handled, 1);
        assert_eq!(outcome.merged_words, 1);
    }

    #[test]
    fn test_all_noise_yields_empty_text() {
        let outcome = concat(&["", "-", "  "]);
        assert_eq!(outcome.text, "");
        assert_eq!(outcome.line_breaks_handled, 3);
    }
}
