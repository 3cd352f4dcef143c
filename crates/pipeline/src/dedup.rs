//! Fuzzy transcript dedup
//!
//! Chunked transcription feeds each new chunk together with a few previous
//! chunks for context, so consecutive transcripts overlap: the tail of the
//! previous text reappears at the head of the next one, often with small
//! recognition differences. `strip_overlap` removes that repeated head so
//! only genuinely new words are appended to the pending utterance.

use strsim::normalized_levenshtein;

/// Length in characters of the longest overlap between the end of `prev`
/// and the start of `next`.
///
/// Scans candidate lengths from the longest possible down to one character
/// and accepts the first suffix/prefix pair whose normalized similarity
/// reaches `threshold`. Comparison is case-insensitive. Returns 0 when no
/// candidate qualifies or either string is empty.
pub fn overlap_len(prev: &str, next: &str, threshold: f64) -> usize {
    if prev.is_empty() || next.is_empty() {
        return 0;
    }

    let prev_lower = prev.to_lowercase();
    let next_lower = next.to_lowercase();

    let max_len = prev_lower.chars().count().min(next_lower.chars().count());
    let prev_chars: Vec<char> = prev_lower.chars().collect();
    let next_chars: Vec<char> = next_lower.chars().collect();

    for len in (1..=max_len).rev() {
        let suffix: String = prev_chars[prev_chars.len() - len..].iter().collect();
        let prefix: String = next_chars[..len].iter().collect();
        if normalized_levenshtein(&suffix, &prefix) >= threshold {
            return len;
        }
    }

    0
}

/// Remove from `next` the head that repeats the tail of `prev`.
///
/// The returned slice is trimmed of leading/trailing whitespace. If the
/// whole of `next` overlaps, the result is empty.
pub fn strip_overlap<'a>(prev: &str, next: &'a str, threshold: f64) -> &'a str {
    let len = overlap_len(prev, next, threshold);
    if len == 0 {
        return next.trim();
    }

    // len counts characters of the lowercased text; char counts match the
    // original since lowercasing here is 1:1 for our supported scripts
    let byte_offset = next
        .char_indices()
        .nth(len)
        .map(|(i, _)| i)
        .unwrap_or(next.len());

    next[byte_offset..].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.7;

    #[test]
    fn test_identical_strings_fully_overlap() {
        let text = "hello world";
        assert_eq!(overlap_len(text, text, THRESHOLD), text.len());
        assert_eq!(strip_overlap(text, text, THRESHOLD), "");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(overlap_len("", "hello", THRESHOLD), 0);
        assert_eq!(overlap_len("hello", "", THRESHOLD), 0);
        assert_eq!(strip_overlap("", "hello", THRESHOLD), "hello");
    }

    #[test]
    fn test_exact_tail_repeated_at_head() {
        let prev = "hello";
        let next = "hello how are you";
        assert_eq!(overlap_len(prev, next, THRESHOLD), 5);
        assert_eq!(strip_overlap(prev, next, THRESHOLD), "how are you");
    }

    #[test]
    fn test_partial_overlap_stripped() {
        let prev = "what is the status";
        let next = "status of my complaint";
        assert_eq!(strip_overlap(prev, next, THRESHOLD), "of my complaint");
    }

    #[test]
    fn test_no_overlap_returns_trimmed_next() {
        let prev = "completely different";
        let next = "  brand new words  ";
        assert_eq!(overlap_len(prev, next, THRESHOLD), 0);
        assert_eq!(strip_overlap(prev, next, THRESHOLD), "brand new words");
    }

    #[test]
    fn test_fuzzy_overlap_survives_recognition_noise() {
        // Recognizer spelled the repeated word differently across windows
        let prev = "hello wurld";
        let next = "world again";
        assert_eq!(overlap_len(prev, next, THRESHOLD), 5);
        assert_eq!(strip_overlap(prev, next, THRESHOLD), "again");
    }

    #[test]
    fn test_case_insensitive() {
        let prev = "Hello There";
        let next = "HELLO THERE again";
        assert_eq!(strip_overlap(prev, next, THRESHOLD), "again");
    }

    #[test]
    fn test_threshold_one_requires_exact_match() {
        assert_eq!(overlap_len("xyzabc", "abc rest", 1.0), 3);
        assert_eq!(overlap_len("abcdef", "zzz", 1.0), 0);
    }
}
