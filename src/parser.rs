//! Parse-tree matcher
//!
//! Walks the compiled grammar against a tokenized command. Matching is
//! first-match in table order: at every position a word match is tried
//! before a parameter slot, and a parameter slot before end of syntax. A
//! failed alternative rolls back the parameters, the plural flag and the
//! input position before the next sibling is tried.

use crate::dictionary::{Dictionary, DictionaryEntry};
use crate::syntax::{ElementEntry, ElementTable, SyntaxEntry, MULTIPLE_FLAG};
use crate::text::{Word, WordKind};
use log::debug;

/// Index of a literal value collected while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(i32),
    Text(String),
}

/// What a parameter refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRef {
    Object(usize),
    Literal(LiteralId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamEntry {
    pub instance: ParamRef,
    pub plural: bool,
}

impl ParamEntry {
    pub fn object(instance: usize) -> Self {
        ParamEntry {
            instance: ParamRef::Object(instance),
            plural: false,
        }
    }
}

/// Pronoun antecedent: the instance a pronoun word currently refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PronounEntry {
    pub pronoun: i32,
    pub instance: usize,
}

/// Result of matching one command
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub verb: i32,
    pub params: Vec<ParamEntry>,
    pub plural: bool,
    pub literals: Vec<Literal>,
    /// Number of words consumed, not counting a trailing conjunction
    pub consumed: usize,
}

pub struct Parser<'a> {
    dictionary: &'a Dictionary,
    elements: &'a ElementTable,
    words: &'a [Word],
    position: usize,
    pronouns: &'a [PronounEntry],
    scope: &'a dyn Fn(usize) -> bool,
    instance_max: usize,
    literals: Vec<Literal>,
}

fn everything_in_scope(_: usize) -> bool {
    true
}

impl<'a> Parser<'a> {
    pub fn new(dictionary: &'a Dictionary, elements: &'a ElementTable, words: &'a [Word]) -> Self {
        Parser {
            dictionary,
            elements,
            words,
            position: 0,
            pronouns: &[],
            scope: &everything_in_scope,
            instance_max: 0,
            literals: Vec::new(),
        }
    }

    /// Restrict object references to instances `1..=instance_max` accepted by `scope`
    pub fn with_scope(mut self, instance_max: usize, scope: &'a dyn Fn(usize) -> bool) -> Self {
        self.instance_max = instance_max;
        self.scope = scope;
        self
    }

    pub fn with_pronouns(mut self, pronouns: &'a [PronounEntry]) -> Self {
        self.pronouns = pronouns;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    fn entry_at(&self, position: usize) -> Option<&'a DictionaryEntry> {
        let dictionary: &'a Dictionary = self.dictionary;
        self.words
            .get(position)
            .and_then(|w| w.dictionary_index())
            .and_then(|i| dictionary.entry(i))
    }

    fn current_entry(&self) -> Option<&'a DictionaryEntry> {
        self.entry_at(self.position)
    }

    /// No significant input left: end of the words or a conjunction
    /// starting the next command
    fn end_of_command(&self) -> bool {
        match self.words.get(self.position) {
            None => true,
            Some(_) => self
                .current_entry()
                .map(|e| e.classes.is_conjunction())
                .unwrap_or(false),
        }
    }

    fn end_of_syntax_index(&self, table: usize) -> Option<usize> {
        let mut index = table;
        loop {
            match self.elements.get(index)? {
                ElementEntry::EndOfSyntax { .. } => return Some(index),
                ElementEntry::EndOfTable => return None,
                _ => index += 1,
            }
        }
    }

    fn parameter_element_index(&self, table: usize) -> Option<usize> {
        let mut index = table;
        loop {
            match self.elements.get(index)? {
                ElementEntry::ParameterSlot { .. } => return Some(index),
                ElementEntry::EndOfTable => return None,
                _ => index += 1,
            }
        }
    }

    /// First `EndOfSyntax` in the alternatives list at `table`
    pub fn match_end_of_syntax(&self, table: usize) -> Option<&'a ElementEntry> {
        let elements: &'a ElementTable = self.elements;
        self.end_of_syntax_index(table).and_then(|i| elements.get(i))
    }

    /// First `ParameterSlot` in the alternatives list at `table`
    pub fn match_parameter_element(&self, table: usize) -> Option<&'a ElementEntry> {
        let elements: &'a ElementTable = self.elements;
        self.parameter_element_index(table).and_then(|i| elements.get(i))
    }

    /// Match the remaining input against the alternatives list at `table`.
    /// Returns the `EndOfSyntax` element reached, or `None` when every
    /// alternative failed. On `None`, `params`, `plural` and the position are
    /// unchanged.
    pub fn match_parse_tree(
        &mut self,
        params: &mut Vec<ParamEntry>,
        table: usize,
        plural: &mut bool,
    ) -> Option<&'a ElementEntry> {
        let elements: &'a ElementTable = self.elements;

        if let Some(entry) = self.current_entry() {
            if entry.classes.is_matchable() {
                let mut index = table;
                while let Some(element) = elements.get(index) {
                    match *element {
                        ElementEntry::EndOfTable => break,
                        ElementEntry::WordMatch { code, next } if code == entry.code => {
                            let saved = self.position;
                            self.position += 1;
                            if let Some(found) = self.match_parse_tree(params, next, plural) {
                                return Some(found);
                            }
                            self.position = saved;
                        }
                        _ => {}
                    }
                    index += 1;
                }
            }
        }

        let mut search = table;
        while let Some(slot) = self.parameter_element_index(search) {
            if let Some(&ElementEntry::ParameterSlot { flags, next }) = elements.get(slot) {
                let saved_position = self.position;
                let saved_len = params.len();
                let saved_plural = *plural;
                let saved_literals = self.literals.len();

                if let Some(entries) = self.parse_noun_phrase(flags) {
                    if entries.len() > 1 {
                        *plural = true;
                    }
                    params.extend(entries);
                    if let Some(found) = self.match_parse_tree(params, next, plural) {
                        return Some(found);
                    }
                }

                self.position = saved_position;
                params.truncate(saved_len);
                *plural = saved_plural;
                self.literals.truncate(saved_literals);
            }
            search = slot + 1;
        }

        if self.end_of_command() {
            return self.match_end_of_syntax(table);
        }
        None
    }

    /// Wrap the word at `word_index` as a literal parameter
    pub fn setup_parameter_for_word(&mut self, word_index: usize) -> Option<ParamEntry> {
        let word = self.words.get(word_index)?;
        let literal = match &word.kind {
            WordKind::Number(n) => Literal::Number(*n),
            WordKind::Text(s) => Literal::Text(s.clone()),
            WordKind::Dictionary(i) => Literal::Text(self.dictionary.entry(*i)?.word.clone()),
        };
        self.literals.push(literal);
        Some(ParamEntry {
            instance: ParamRef::Literal(LiteralId(self.literals.len() - 1)),
            plural: false,
        })
    }

    /// Can a noun phrase start at `position`?
    fn reference_starts_at(&self, position: usize) -> bool {
        match self.words.get(position) {
            None => false,
            Some(word) if word.is_literal() => true,
            Some(_) => self
                .entry_at(position)
                .map(|e| {
                    e.classes.is_noun()
                        || e.classes.is_adjective()
                        || e.classes.is_all()
                        || e.classes.is_pronoun()
                })
                .unwrap_or(false),
        }
    }

    /// A word that is both adjective and noun is taken as the noun when no
    /// further adjective or noun follows it
    fn last_possible_noun(&self, position: usize) -> bool {
        !self
            .entry_at(position + 1)
            .map(|e| e.classes.is_noun() || e.classes.is_adjective())
            .unwrap_or(false)
    }

    fn parse_noun_phrase(&mut self, flags: u32) -> Option<Vec<ParamEntry>> {
        let mut entries = Vec::new();
        loop {
            entries.extend(self.parse_reference()?);
            let conjunction = self
                .current_entry()
                .map(|e| e.classes.is_conjunction())
                .unwrap_or(false);
            if conjunction && self.reference_starts_at(self.position + 1) {
                self.position += 1;
                continue;
            }
            break;
        }

        if entries.len() > 1 {
            if flags & MULTIPLE_FLAG == 0 {
                return None;
            }
            for entry in entries.iter_mut() {
                entry.plural = true;
            }
        }
        Some(entries)
    }

    fn in_scope_objects<I: IntoIterator<Item = usize>>(&self, candidates: I) -> Vec<ParamEntry> {
        candidates
            .into_iter()
            .filter(|&i| i >= 1 && (self.instance_max == 0 || i <= self.instance_max))
            .filter(|&i| (self.scope)(i))
            .map(ParamEntry::object)
            .collect()
    }

    fn parse_reference(&mut self) -> Option<Vec<ParamEntry>> {
        let word = self.words.get(self.position)?;
        if word.is_literal() {
            let entry = self.setup_parameter_for_word(self.position)?;
            self.position += 1;
            return Some(vec![entry]);
        }

        let entry = self.current_entry()?;
        if entry.classes.is_all() {
            self.position += 1;
            let all = self.in_scope_objects(1..=self.instance_max);
            return if all.is_empty() { None } else { Some(all) };
        }
        if entry.classes.is_pronoun() {
            self.position += 1;
            let antecedents = self.in_scope_objects(
                self.pronouns
                    .iter()
                    .filter(|p| p.pronoun == entry.code)
                    .map(|p| p.instance),
            );
            return if antecedents.is_empty() {
                None
            } else {
                Some(antecedents)
            };
        }

        let mut candidates: Option<Vec<usize>> = None;
        let mut noun_found = false;
        while let Some(entry) = self.current_entry() {
            let refs = if entry.classes.is_adjective()
                && !(entry.classes.is_noun() && self.last_possible_noun(self.position))
            {
                &entry.adjective_refs
            } else if entry.classes.is_noun() {
                noun_found = true;
                &entry.noun_refs
            } else {
                break;
            };
            candidates = Some(match candidates {
                None => refs.clone(),
                Some(previous) => previous.into_iter().filter(|c| refs.contains(c)).collect(),
            });
            self.position += 1;
            if noun_found {
                break;
            }
        }

        if !noun_found {
            return None;
        }
        let resolved = self.in_scope_objects(candidates.unwrap_or_default());
        resolved.into_iter().next().map(|first| vec![first])
    }

    /// Match the command at the current position against every syntax of its
    /// leading verb word, in table order
    pub fn parse_command(&mut self, syntaxes: &[SyntaxEntry]) -> Option<ParsedCommand> {
        let start = self.position;
        let verb_word = self.current_entry()?;
        if !verb_word.classes.is_verb() {
            return None;
        }

        for syntax in syntaxes.iter().filter(|s| s.code == verb_word.code) {
            self.position = start + 1;
            self.literals.clear();
            let mut params = Vec::new();
            let mut plural = false;
            if let Some(&ElementEntry::EndOfSyntax { verb }) =
                self.match_parse_tree(&mut params, syntax.elements, &mut plural)
            {
                debug!(
                    "Matched verb {} with {} parameters (plural: {})",
                    verb,
                    params.len(),
                    plural
                );
                return Some(ParsedCommand {
                    verb,
                    params,
                    plural,
                    literals: self.literals.clone(),
                    consumed: self.position - start,
                });
            }
        }
        self.position = start;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{DictionaryEntry, WordClasses};
    use crate::text::tokenize;
    use test_log::test;

    // 1 lamp, 2 red box, 3 blue box
    fn dictionary() -> Dictionary {
        Dictionary::new(vec![
            DictionaryEntry::new("take", 1, WordClasses::VERB),
            DictionaryEntry::new("lamp", 2, WordClasses::NOUN).with_nouns(&[1]),
            DictionaryEntry::new("box", 3, WordClasses::NOUN).with_nouns(&[2, 3]),
            DictionaryEntry::new("red", 4, WordClasses::ADJECTIVE).with_adjectives(&[2]),
            DictionaryEntry::new("blue", 5, WordClasses::ADJECTIVE).with_adjectives(&[3]),
            DictionaryEntry::new("and", 6, WordClasses::CONJUNCTION),
            DictionaryEntry::new("all", 7, WordClasses::ALL),
            DictionaryEntry::new("it", 8, WordClasses::PRONOUN),
            DictionaryEntry::new("in", 9, WordClasses::PREPOSITION),
            DictionaryEntry::new("look", 10, WordClasses::VERB),
        ])
    }

    // take <obj>           -> verb 100
    // take <obj> in <obj>  -> verb 101
    fn grammar() -> (ElementTable, usize) {
        let mut table = ElementTable::new();
        let end = table.add_list(&[ElementEntry::EndOfSyntax { verb: 101 }]);
        let container = table.add_list(&[ElementEntry::ParameterSlot { flags: 0, next: end }]);
        let after_object = table.add_list(&[
            ElementEntry::WordMatch {
                code: 9,
                next: container,
            },
            ElementEntry::EndOfSyntax { verb: 100 },
        ]);
        let start = table.add_list(&[ElementEntry::ParameterSlot {
            flags: MULTIPLE_FLAG,
            next: after_object,
        }]);
        (table, start)
    }

    fn parse(line: &str) -> Option<(i32, Vec<ParamEntry>, bool)> {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let words = tokenize(line, &dictionary).unwrap();
        let mut parser = Parser::new(&dictionary, &table, &words)
            .with_scope(3, &everything_in_scope);
        parser.set_position(1);
        let mut params = Vec::new();
        let mut plural = false;
        match parser.match_parse_tree(&mut params, start, &mut plural) {
            Some(ElementEntry::EndOfSyntax { verb }) => Some((*verb, params, plural)),
            _ => None,
        }
    }

    #[test]
    fn test_end_of_syntax_on_empty_list() {
        let dictionary = dictionary();
        let mut table = ElementTable::new();
        let start = table.add_list(&[]);
        let parser = Parser::new(&dictionary, &table, &[]);
        assert_eq!(parser.match_end_of_syntax(start), None);
    }

    #[test]
    fn test_end_of_syntax_first() {
        let dictionary = dictionary();
        let mut table = ElementTable::new();
        let start = table.add_list(&[
            ElementEntry::EndOfSyntax { verb: 7 },
            ElementEntry::WordMatch { code: 1, next: 0 },
        ]);
        let parser = Parser::new(&dictionary, &table, &[]);
        assert_eq!(
            parser.match_end_of_syntax(start),
            Some(&ElementEntry::EndOfSyntax { verb: 7 })
        );
    }

    #[test]
    fn test_parameter_element_positions() {
        let dictionary = dictionary();
        let mut table = ElementTable::new();
        let first = table.add_list(&[ElementEntry::ParameterSlot { flags: 1, next: 0 }]);
        let after_eos = table.add_list(&[
            ElementEntry::EndOfSyntax { verb: 3 },
            ElementEntry::ParameterSlot { flags: 0, next: 0 },
        ]);
        let none = table.add_list(&[ElementEntry::EndOfSyntax { verb: 3 }]);
        let parser = Parser::new(&dictionary, &table, &[]);
        assert_eq!(
            parser.match_parameter_element(first),
            Some(&ElementEntry::ParameterSlot { flags: 1, next: 0 })
        );
        assert_eq!(
            parser.match_parameter_element(after_eos),
            Some(&ElementEntry::ParameterSlot { flags: 0, next: 0 })
        );
        assert_eq!(parser.match_parameter_element(none), None);
    }

    #[test]
    fn test_simple_object() {
        let (verb, params, plural) = parse("take lamp").unwrap();
        assert_eq!(verb, 100);
        assert_eq!(params, vec![ParamEntry::object(1)]);
        assert!(!plural);
    }

    #[test]
    fn test_adjective_narrows_candidates() {
        let (_, params, _) = parse("take blue box").unwrap();
        assert_eq!(params, vec![ParamEntry::object(3)]);
        // Ambiguous noun resolves to the first candidate
        let (_, params, _) = parse("take box").unwrap();
        assert_eq!(params, vec![ParamEntry::object(2)]);
    }

    #[test]
    fn test_word_match_then_second_parameter() {
        let (verb, params, _) = parse("take lamp in red box").unwrap();
        assert_eq!(verb, 101);
        assert_eq!(params, vec![ParamEntry::object(1), ParamEntry::object(2)]);
    }

    #[test]
    fn test_conjunction_list_sets_plural() {
        let (verb, params, plural) = parse("take lamp and blue box").unwrap();
        assert_eq!(verb, 100);
        assert!(plural);
        assert_eq!(params.len(), 2);
        assert!(params.iter().all(|p| p.plural));
    }

    #[test]
    fn test_all_expands_scope() {
        let (_, params, plural) = parse("take all").unwrap();
        assert_eq!(params.len(), 3);
        assert!(plural);
    }

    #[test]
    fn test_running_out_of_input_is_soft() {
        assert_eq!(parse("take"), None);
        assert_eq!(parse("take lamp in"), None);
        assert_eq!(parse("take red"), None);
    }

    #[test]
    fn test_failure_leaves_params_untouched() {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let words = tokenize("take lamp in", &dictionary).unwrap();
        let mut parser = Parser::new(&dictionary, &table, &words);
        parser.set_position(1);
        let mut params = vec![ParamEntry::object(3)];
        let mut plural = false;
        assert!(parser.match_parse_tree(&mut params, start, &mut plural).is_none());
        assert_eq!(params, vec![ParamEntry::object(3)]);
        assert!(!plural);
        assert_eq!(parser.position(), 1);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let first = parse("take lamp and box in blue box");
        for _ in 0..10 {
            assert_eq!(parse("take lamp and box in blue box"), first);
        }
        assert!(first.is_some());
    }

    #[test]
    fn test_pronoun_uses_antecedents() {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let words = tokenize("take it", &dictionary).unwrap();
        let pronouns = [PronounEntry {
            pronoun: 8,
            instance: 3,
        }];
        let mut parser = Parser::new(&dictionary, &table, &words).with_pronouns(&pronouns);
        parser.set_position(1);
        let mut params = Vec::new();
        let mut plural = false;
        assert!(parser.match_parse_tree(&mut params, start, &mut plural).is_some());
        assert_eq!(params, vec![ParamEntry::object(3)]);
    }

    #[test]
    fn test_scope_filters_candidates() {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let words = tokenize("take box", &dictionary).unwrap();
        let only_three = |i: usize| i == 3;
        let mut parser = Parser::new(&dictionary, &table, &words).with_scope(3, &only_three);
        parser.set_position(1);
        let mut params = Vec::new();
        let mut plural = false;
        assert!(parser.match_parse_tree(&mut params, start, &mut plural).is_some());
        assert_eq!(params, vec![ParamEntry::object(3)]);
    }

    #[test]
    fn test_literal_parameter() {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let words = tokenize("take 42", &dictionary).unwrap();
        let mut parser = Parser::new(&dictionary, &table, &words);
        parser.set_position(1);
        let mut params = Vec::new();
        let mut plural = false;
        assert!(parser.match_parse_tree(&mut params, start, &mut plural).is_some());
        assert_eq!(params[0].instance, ParamRef::Literal(LiteralId(0)));
        assert_eq!(parser.literals(), &[Literal::Number(42)]);
    }

    #[test]
    fn test_parse_command_stops_at_conjunction() {
        let dictionary = dictionary();
        let (table, start) = grammar();
        let syntaxes = [SyntaxEntry {
            code: 1,
            elements: start,
        }];
        let words = tokenize("take lamp and look", &dictionary).unwrap();
        let mut parser = Parser::new(&dictionary, &table, &words);
        let command = parser.parse_command(&syntaxes).unwrap();
        assert_eq!(command.verb, 100);
        assert_eq!(command.consumed, 2);
        assert_eq!(command.params, vec![ParamEntry::object(1)]);
    }
}
