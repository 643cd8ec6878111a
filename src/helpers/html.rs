//! HTML and text helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Count words in plain text. CJK ideographs count as one word each.
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if c > '\u{4E00}' && c < '\u{9FFF}' {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                in_word = true;
                count += 1;
            }
        } else {
            in_word = false;
        }
    }

    count
}

/// Estimated reading time in whole minutes, never less than one
pub fn reading_minutes(words: usize, words_per_minute: usize) -> usize {
    let wpm = words_per_minute.max(1);
    words.div_ceil(wpm).max(1)
}
