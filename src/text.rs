//! Text cleanup, statistics and chunking applied before texts are sent for analysis.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::TextStats;

// Best-effort: a scheme followed by everything up to the next whitespace.
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("valid URL pattern"));

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("valid sentence pattern"));

/// Removes URLs, collapses whitespace runs into single spaces and trims.
///
/// URLs are stripped before whitespace is collapsed so the space left behind by
/// a removed URL is collapsed too, which keeps `clean` idempotent.
pub fn clean(text: &str) -> String {
    let without_urls = URL_PATTERN.replace_all(text, "");
    without_urls.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character, word and sentence counts for `text`.
///
/// Words are whitespace-delimited tokens, so trailing punctuation counts towards
/// a word's length. Sentences are the non-blank segments between runs of `.`,
/// `!` and `?`; abbreviations such as "Mr." therefore end a sentence.
pub fn stats(text: &str) -> TextStats {
    if text.is_empty() {
        return TextStats::default();
    }

    let word_lengths: Vec<usize> = text
        .split_whitespace()
        .map(|word| word.chars().count())
        .collect();
    let sentence_count = SENTENCE_BREAK
        .split(text)
        .filter(|segment| !segment.trim().is_empty())
        .count();

    let word_count = word_lengths.len();
    let avg_word_length = if word_count == 0 {
        0.0
    } else {
        word_lengths.iter().sum::<usize>() as f64 / word_count as f64
    };

    TextStats {
        character_count: text.chars().count(),
        word_count,
        sentence_count,
        avg_word_length,
    }
}

/// Splits `text` into chunks of at most `max_size` characters on word boundaries.
///
/// Text that already fits is returned unchanged as a single chunk. Otherwise words
/// are re-joined with single spaces; a word longer than `max_size` is never split
/// and forms its own oversized chunk.
pub fn chunk(text: &str, max_size: usize) -> Vec<String> {
    if text.chars().count() <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if !current.is_empty() && current_len + 1 + word_len > max_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// One text per non-blank line, trimmed.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_urls_and_whitespace() {
        assert_eq!(
            clean("  check\n\nthis  https://example.com/a?b=c out\t"),
            "check this out"
        );
        assert_eq!(clean("see http://x.io"), "see");
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\t "), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "plain text",
            "  lots   of\n\n space ",
            "a https://one.com b http://two.org/path c",
            "glued texthttp://x.com/y more",
            "https://only.example",
            "émoji 😊 and ünïcode\u{00a0}spaces",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn stats_of_empty_text_is_zero() {
        assert_eq!(stats(""), TextStats::default());
    }

    #[test]
    fn stats_attach_punctuation_to_words() {
        let s = stats("Hi there. Bye!");
        assert_eq!(s.word_count, 3);
        assert_eq!(s.sentence_count, 2);
        assert_eq!(s.character_count, 14);
        assert!((s.avg_word_length - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_count_abbreviations_as_sentence_breaks() {
        let s = stats("Mr. Smith went home. Did he?!");
        assert_eq!(s.sentence_count, 3);
    }

    #[test]
    fn stats_of_whitespace_only_text() {
        let s = stats("   ");
        assert_eq!(s.character_count, 3);
        assert_eq!(s.word_count, 0);
        assert_eq!(s.sentence_count, 0);
        assert_eq!(s.avg_word_length, 0.0);
    }

    #[test]
    fn chunk_keeps_short_text_unchanged() {
        assert_eq!(chunk("  short\ntext ", 100), vec!["  short\ntext "]);
        assert_eq!(chunk("", 0), vec![""]);
    }

    #[test]
    fn chunk_respects_max_size() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let chunks = chunk(text, 12);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 12, "chunk too long: {c:?}");
        }
        assert_eq!(
            chunks.join(" ").split_whitespace().collect::<Vec<_>>(),
            text.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn chunk_fills_to_exact_limit() {
        assert_eq!(chunk("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn chunk_never_splits_long_words() {
        let chunks = chunk("a supercalifragilistic b", 5);
        assert_eq!(chunks, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn chunk_counts_characters_not_bytes() {
        let chunks = chunk("ééé ééé ééé", 7);
        assert_eq!(chunks, vec!["ééé ééé", "ééé"]);
    }

    #[test]
    fn split_lines_drops_blank_lines() {
        assert_eq!(
            split_lines("first\n\n  second  \r\n\t\nthird"),
            vec!["first", "second", "third"]
        );
    }
}
