//! Player command tokenizer
//!
//! Splits a command line into words known to the dictionary. Numbers and
//! quoted strings become literal words, noise words are dropped and
//! punctuation separating commands is mapped onto the first conjunction word.
//! Game code splits string attributes into words with [`strip`].

use crate::dictionary::{Dictionary, WordClasses};
use log::debug;
use std::ops::Range;

/// What a single input word turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum WordKind {
    /// Index into the dictionary
    Dictionary(usize),
    Number(i32),
    Text(String),
}

/// One tokenized input word with its position in the command line
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub kind: WordKind,
    pub span: Range<usize>,
}

impl Word {
    pub fn dictionary_index(&self) -> Option<usize> {
        match self.kind {
            WordKind::Dictionary(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self.kind, WordKind::Dictionary(_))
    }
}

/// Tokenizer failures, reported to the player
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizeError {
    UnknownWord(String),
    UnterminatedString(usize),
}

/// Split `line` into words.
pub fn tokenize(line: &str, dictionary: &Dictionary) -> Result<Vec<Word>, TokenizeError> {
    let mut words = Vec::new();
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c == '"' {
            let start = pos;
            let close = line[pos + 1..]
                .find('"')
                .ok_or(TokenizeError::UnterminatedString(start))?;
            let end = pos + 1 + close;
            words.push(Word {
                kind: WordKind::Text(line[pos + 1..end].to_string()),
                span: start..end + 1,
            });
            pos = end + 1;
            continue;
        }

        if c == ',' || c == '.' {
            // Separators act like the first conjunction word, if the game has one
            if let Some(index) = dictionary.first_with_class(WordClasses::CONJUNCTION) {
                words.push(Word {
                    kind: WordKind::Dictionary(index),
                    span: pos..pos + 1,
                });
            }
            pos += 1;
            continue;
        }

        let start = pos;
        while pos < bytes.len() {
            let ch = bytes[pos] as char;
            if ch.is_ascii_whitespace() || ch == ',' || ch == '.' || ch == '"' {
                break;
            }
            pos += 1;
        }
        let text = &line[start..pos];

        if let Ok(number) = text.parse::<i32>() {
            words.push(Word {
                kind: WordKind::Number(number),
                span: start..pos,
            });
            continue;
        }

        match dictionary.lookup(text) {
            Some(index) => {
                let is_noise = dictionary
                    .entry(index)
                    .map(|e| e.classes.is_noise())
                    .unwrap_or(false);
                if is_noise {
                    debug!("Skipping noise word '{}'", text);
                } else {
                    words.push(Word {
                        kind: WordKind::Dictionary(index),
                        span: start..pos,
                    });
                }
            }
            None => return Err(TokenizeError::UnknownWord(text.to_string())),
        }
    }

    debug!("Tokenized '{}' into {} words", line, words.len());
    Ok(words)
}

/// Characters that end a word for STRIP
const WORD_SEPARATORS: &[char] = &[' ', '.', ',', '?'];

/// Split `count` characters or words off the start or the end of `text`.
/// Returns the stripped part and the rest, without the blanks between them.
pub fn strip(text: &str, count: usize, words: bool, from_start: bool) -> (String, String) {
    let (stripped, rest) = match (words, from_start) {
        (false, true) => {
            let at = text
                .char_indices()
                .nth(count)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            (&text[..at], &text[at..])
        }
        (false, false) => {
            let len = text.chars().count();
            let at = text
                .char_indices()
                .nth(len.saturating_sub(count))
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            (&text[at..], &text[..at])
        }
        (true, true) => {
            let mut at = 0;
            for _ in 0..count {
                at = text.len() - text[at..].trim_start_matches(' ').len();
                at = text[at..]
                    .find(WORD_SEPARATORS)
                    .map(|i| at + i)
                    .unwrap_or(text.len());
            }
            (
                text[..at].trim_start_matches(' '),
                text[at..].trim_start_matches(' '),
            )
        }
        (true, false) => {
            let mut at = text.len();
            for _ in 0..count {
                at = text[..at].trim_end_matches(' ').len();
                if at == 0 {
                    break;
                }
                at = text[..at].rfind(WORD_SEPARATORS).map(|i| i + 1).unwrap_or(0);
            }
            (
                text[at..].trim_start_matches(' '),
                text[..at].trim_end_matches(' '),
            )
        }
    };
    (stripped.to_string(), rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryEntry;
    use test_log::test;

    fn dictionary() -> Dictionary {
        Dictionary::new(vec![
            DictionaryEntry::new("take", 1, WordClasses::VERB),
            DictionaryEntry::new("lamp", 2, WordClasses::NOUN),
            DictionaryEntry::new("and", 3, WordClasses::CONJUNCTION),
            DictionaryEntry::new("the", 4, WordClasses::NOISE),
            DictionaryEntry::new("say", 5, WordClasses::VERB),
        ])
    }

    #[test]
    fn test_simple_command() {
        let words = tokenize("take the lamp", &dictionary()).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].kind, WordKind::Dictionary(0));
        assert_eq!(words[1].kind, WordKind::Dictionary(1));
        assert_eq!(words[1].span, 9..13);
    }

    #[test]
    fn test_literals() {
        let words = tokenize("say \"hello there\" 42", &dictionary()).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].kind, WordKind::Text("hello there".to_string()));
        assert_eq!(words[2].kind, WordKind::Number(42));
        assert!(words[2].is_literal());
    }

    #[test]
    fn test_punctuation_maps_to_conjunction() {
        let words = tokenize("take lamp, lamp", &dictionary()).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[2].kind, WordKind::Dictionary(2));
    }

    #[test]
    fn test_unknown_word() {
        let result = tokenize("take sword", &dictionary());
        assert_eq!(result, Err(TokenizeError::UnknownWord("sword".to_string())));
    }

    #[test]
    fn test_unterminated_string() {
        let result = tokenize("say \"oops", &dictionary());
        assert_eq!(result, Err(TokenizeError::UnterminatedString(4)));
    }

    fn split(stripped: &str, rest: &str) -> (String, String) {
        (stripped.to_string(), rest.to_string())
    }

    #[test]
    fn test_strip_words() {
        assert_eq!(strip("the brass lamp", 2, true, true), split("the brass", "lamp"));
        assert_eq!(strip("the brass lamp", 1, true, false), split("lamp", "the brass"));
        assert_eq!(strip("  the brass lamp", 1, true, true), split("the", "brass lamp"));
        assert_eq!(strip("the brass lamp", 5, true, false), split("the brass lamp", ""));
        assert_eq!(strip("", 1, true, true), split("", ""));
    }

    #[test]
    fn test_strip_characters() {
        assert_eq!(strip("the brass lamp", 3, false, true), split("the", " brass lamp"));
        assert_eq!(strip("the brass lamp", 4, false, false), split("lamp", "the brass "));
        assert_eq!(strip("lamp", 10, false, true), split("lamp", ""));
        assert_eq!(strip("lamp", 10, false, false), split("lamp", ""));
        assert_eq!(strip("lamp", 0, false, false), split("", "lamp"));
    }
}
