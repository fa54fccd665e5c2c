use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use indexmap::IndexMap;

/// Word class bits as stored in the compiled dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordClasses(pub u32);

impl WordClasses {
    pub const VERB: u32 = 1 << 0;
    pub const CONJUNCTION: u32 = 1 << 1;
    pub const NOUN: u32 = 1 << 2;
    pub const ADJECTIVE: u32 = 1 << 3;
    pub const PREPOSITION: u32 = 1 << 4;
    pub const ALL: u32 = 1 << 5;
    pub const PRONOUN: u32 = 1 << 6;
    pub const NOISE: u32 = 1 << 7;

    pub fn has(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn is_verb(&self) -> bool {
        self.has(Self::VERB)
    }

    pub fn is_conjunction(&self) -> bool {
        self.has(Self::CONJUNCTION)
    }

    pub fn is_noun(&self) -> bool {
        self.has(Self::NOUN)
    }

    pub fn is_adjective(&self) -> bool {
        self.has(Self::ADJECTIVE)
    }

    pub fn is_preposition(&self) -> bool {
        self.has(Self::PREPOSITION)
    }

    pub fn is_all(&self) -> bool {
        self.has(Self::ALL)
    }

    pub fn is_pronoun(&self) -> bool {
        self.has(Self::PRONOUN)
    }

    pub fn is_noise(&self) -> bool {
        self.has(Self::NOISE)
    }

    /// Classes that may be matched literally by a grammar word element
    pub fn is_matchable(&self) -> bool {
        self.has(Self::VERB | Self::PREPOSITION | Self::NOUN | Self::ADJECTIVE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry {
    /// The word itself, lower case
    pub word: String,
    /// Code used by grammar elements and verbs
    pub code: i32,
    pub classes: WordClasses,
    /// Offset of the word text in the image text area
    pub string_offset: u32,
    /// Instances this word names as a noun
    pub noun_refs: Vec<usize>,
    /// Instances this word describes as an adjective
    pub adjective_refs: Vec<usize>,
}

impl DictionaryEntry {
    pub fn new(word: &str, code: i32, classes: u32) -> DictionaryEntry {
        DictionaryEntry {
            word: word.to_lowercase(),
            code,
            classes: WordClasses(classes),
            string_offset: 0,
            noun_refs: Vec::new(),
            adjective_refs: Vec::new(),
        }
    }

    pub fn with_nouns(mut self, refs: &[usize]) -> DictionaryEntry {
        self.noun_refs = refs.to_vec();
        self
    }

    pub fn with_adjectives(mut self, refs: &[usize]) -> DictionaryEntry {
        self.adjective_refs = refs.to_vec();
        self
    }
}

/// Read-only word table, loaded with the game image
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    index: IndexMap<String, usize>,
}

impl Dictionary {
    pub fn new(entries: Vec<DictionaryEntry>) -> Dictionary {
        let mut index = IndexMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            // First entry wins for homographs, later ones are only reachable by index
            index.entry(entry.word.clone()).or_insert(i);
        }
        Dictionary { entries, index }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&DictionaryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Find the dictionary index of a word (case insensitive)
    pub fn lookup(&self, word: &str) -> Option<usize> {
        self.index.get(word.to_lowercase().as_str()).copied()
    }

    /// First dictionary entry carrying the given class bit
    pub fn first_with_class(&self, bit: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.classes.has(bit))
    }
}

/// Number of pronoun words in the dictionary, used to size pronoun tables
pub fn no_of_pronouns(dictionary: &Dictionary) -> usize {
    dictionary
        .entries
        .iter()
        .filter(|e| e.classes.is_pronoun())
        .count()
}

impl Display for Dictionary {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        writeln!(
            f,
            "Dictionary: {} words, {} pronouns",
            self.entries.len(),
            no_of_pronouns(self)
        )?;
        for (i, e) in self.entries.iter().enumerate() {
            writeln!(f, "{:4}: {:<16} code {:4} classes {:#06x}", i, e.word, e.code, e.classes.0)?;
        }

        Ok(())
    }
}
