//! Compiled grammar tables
//!
//! The grammar is a tree of alternatives lists stored in one arena. Each list
//! is a contiguous run of elements terminated by `EndOfTable`; `next` links
//! are arena indices of the list to continue matching at.

use crate::error::SysError;
use std::fmt;

/// Parameter slot flag: more than one object may be given
pub const MULTIPLE_FLAG: u32 = 1 << 0;

/// One node of the compiled grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEntry {
    /// Match the dictionary word with this code, then continue at `next`
    WordMatch { code: i32, next: usize },
    /// Consume a noun phrase, then continue at `next`
    ParameterSlot { flags: u32, next: usize },
    /// A complete sentence pattern for `verb`
    EndOfSyntax { verb: i32 },
    /// Terminates an alternatives list
    EndOfTable,
}

impl ElementEntry {
    pub fn is_end_of_table(&self) -> bool {
        matches!(self, ElementEntry::EndOfTable)
    }
}

/// Syntax entry: which element tree applies to a leading verb word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxEntry {
    /// Dictionary code of the verb word
    pub code: i32,
    /// Arena index of the first alternatives list after the verb
    pub elements: usize,
}

/// Arena holding every alternatives list of the grammar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementTable {
    elements: Vec<ElementEntry>,
}

impl ElementTable {
    pub fn new() -> Self {
        ElementTable {
            elements: Vec::new(),
        }
    }

    /// Append one alternatives list, adding its `EndOfTable`.
    /// Returns the arena index of the first element.
    pub fn add_list(&mut self, alternatives: &[ElementEntry]) -> usize {
        let start = self.elements.len();
        self.elements
            .extend(alternatives.iter().filter(|e| !e.is_end_of_table()));
        self.elements.push(ElementEntry::EndOfTable);
        start
    }

    /// Reserve room for a list whose elements are patched in later.
    /// Used by the image loader, where lists may reference each other.
    pub fn reserve_list(&mut self, len: usize) -> usize {
        let start = self.elements.len();
        self.elements
            .extend(std::iter::repeat(ElementEntry::EndOfTable).take(len + 1));
        start
    }

    pub fn set(&mut self, index: usize, element: ElementEntry) {
        self.elements[index] = element;
    }

    pub fn get(&self, index: usize) -> Option<&ElementEntry> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check that every list is terminated and every link stays inside the arena
    pub fn verify(&self) -> Result<(), SysError> {
        if let Some(last) = self.elements.last() {
            if !last.is_end_of_table() {
                return Err(SysError::MissingTerminator("element"));
            }
        }
        for (i, element) in self.elements.iter().enumerate() {
            let next = match element {
                ElementEntry::WordMatch { next, .. } => *next,
                ElementEntry::ParameterSlot { next, .. } => *next,
                _ => continue,
            };
            if next >= self.elements.len() {
                return Err(SysError::Image(format!(
                    "element {} links outside the grammar ({})",
                    i, next
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ElementTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                ElementEntry::WordMatch { code, next } => {
                    writeln!(f, "{:4}: WORD {} -> {}", i, code, next)?
                }
                ElementEntry::ParameterSlot { flags, next } => {
                    writeln!(f, "{:4}: PARAM flags {:#x} -> {}", i, flags, next)?
                }
                ElementEntry::EndOfSyntax { verb } => writeln!(f, "{:4}: EOS verb {}", i, verb)?,
                ElementEntry::EndOfTable => writeln!(f, "{:4}: EOT", i)?,
            }
        }
        Ok(())
    }
}
