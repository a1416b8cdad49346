use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};

/// Masks blocked words in message content.
///
/// Matching is whole-word and case-insensitive; each match is replaced by as
/// many `*` as it has characters. "Whole word" means the neighbouring
/// characters are not letters, digits or `_`, so entries such as `c++` or
/// `$$$` match too.
#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    pattern: Option<Regex>,
}

impl WordFilter {
    pub fn new<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_string())
            .filter(|word| !word.is_empty())
            .collect();
        if words.is_empty() {
            return Ok(Self::default());
        }

        // Longest first, so `spam` wins over `spa` at the same position.
        words.sort_by_key(|word| std::cmp::Reverse(word.chars().count()));
        let alternatives: Vec<String> = words.iter().map(|word| regex::escape(word)).collect();

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Load one blocked word per line. Blank lines and `#` comments are
    /// skipped. An unreadable file yields an empty filter.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!(
                    "Word filter {} not readable ({err}); filtering disabled",
                    path.display()
                );
                return Self::default();
            }
        };

        let words = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        match Self::new(words) {
            Ok(filter) => {
                log::info!("Loaded word filter from {}", path.display());
                filter
            }
            Err(err) => {
                log::warn!("Invalid word filter {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn censor(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        let mut censored = String::with_capacity(text.len());
        let mut copied = 0;
        let mut pos = 0;
        while pos < text.len() {
            let Some(found) = pattern.find_at(text, pos) else {
                break;
            };
            let starts_token = text[..found.start()]
                .chars()
                .next_back()
                .is_none_or(|c| !is_word_char(c));
            let ends_token = text[found.end()..]
                .chars()
                .next()
                .is_none_or(|c| !is_word_char(c));

            if starts_token && ends_token {
                censored.push_str(&text[copied..found.start()]);
                censored.push_str(&"*".repeat(found.as_str().chars().count()));
                copied = found.end();
                pos = found.end();
            } else {
                // Embedded in a longer word; look again one character later.
                pos = found.start()
                    + text[found.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
            }
        }
        censored.push_str(&text[copied..]);
        censored
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn masks_whole_words_regardless_of_case() {
        let filter = WordFilter::new(["darn", "heck"]).unwrap();
        assert_eq!(filter.censor("Darn it, what the HECK"), "**** it, what the ****");
        assert_eq!(filter.censor("darnation stays"), "darnation stays");
    }

    #[test]
    fn words_with_regex_metacharacters_are_literal() {
        let filter = WordFilter::new(["a.b"]).unwrap();
        assert_eq!(filter.censor("a.b axb"), "*** axb");
    }

    #[test]
    fn words_with_symbol_edges_are_matched() {
        let filter = WordFilter::new(["c++", "$$$"]).unwrap();
        assert_eq!(filter.censor("I write c++ for $$$!"), "I write *** for ***!");
        assert_eq!(filter.censor("c++, then C++"), "***, then ***");
        assert_eq!(filter.censor("abc++ and $$$x"), "abc++ and $$$x");
    }

    #[test]
    fn adjacent_matches_are_all_masked() {
        let filter = WordFilter::new(["spam"]).unwrap();
        assert_eq!(filter.censor("spam spam,spam"), "**** ****,****");
        assert_eq!(filter.censor("spamspam"), "spamspam");
    }

    #[test]
    fn longer_entry_wins_over_its_prefix() {
        let filter = WordFilter::new(["dar", "darn"]).unwrap();
        assert_eq!(filter.censor("darn dar"), "**** ***");
    }

    #[test]
    fn empty_filter_passes_text_through() {
        let filter = WordFilter::new(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.censor("anything"), "anything");
    }

    #[test]
    fn load_skips_comments_and_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# blocked words\n\nspam\n  eggs  ").unwrap();

        let filter = WordFilter::load(file.path());
        assert_eq!(filter.censor("spam and eggs"), "**** and ****");
    }

    #[test]
    fn missing_file_disables_filtering() {
        let filter = WordFilter::load("/definitely/not/here.txt");
        assert!(filter.is_empty());
    }
}
