//! Game image loader
//!
//! An image is a sequence of big-endian 32-bit words. Variable-length tables
//! end with an `EOF` word; a table that runs off the end of the image without
//! one is rejected. Everything loaded here is immutable for the rest of the
//! session.

use crate::dictionary::{Dictionary, DictionaryEntry};
use crate::error::SysError;
use crate::header::Header;
use crate::instruction::Code;
use crate::set::Set;
use crate::syntax::{ElementEntry, ElementTable, SyntaxEntry};
use crate::world::{AttributeBlock, AttributeEntry, AttributeValue, Exit, InitSlot, InstanceEntry};
use indexmap::IndexMap;
use log::{debug, info};
use std::fmt::{Display, Error, Formatter};

/// Table terminator
pub const EOF: u32 = 0xFFFF_FFFF;

/// Element codes with a fixed meaning
pub const ELEMENT_PARAMETER: i32 = 0;
pub const ELEMENT_END_OF_SYNTAX: i32 = -2;

/// Attribute kinds in instance attribute blocks
pub const ATTRIBUTE_SCALAR: u32 = 0;
pub const ATTRIBUTE_SET: u32 = 1;
pub const ATTRIBUTE_STRING: u32 = 2;

const DICTIONARY_RECORD: usize = 6;
const SYNTAX_RECORD: usize = 2;
const ELEMENT_RECORD: usize = 3;
const INSTANCE_RECORD: usize = 8;
const ATTRIBUTE_RECORD: usize = 4;
const SET_INIT_RECORD: usize = 3;
const STRING_INIT_RECORD: usize = 4;
const VERB_RECORD: usize = 2;
const EXIT_RECORD: usize = 2;
const SCRIPT_RECORD: usize = 2;
const STEP_RECORD: usize = 3;

/// Action block bound to a verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerbEntry {
    pub code: i32,
    pub action: usize,
}

/// One step of an actor script. Block address 0 means no block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEntry {
    /// Evaluates the number of turns to wait before this step
    pub after: Option<usize>,
    /// Evaluates whether the step may run this turn
    pub condition: Option<usize>,
    pub statements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub code: i32,
    pub steps: Vec<StepEntry>,
}

pub struct Game {
    pub header: Header,
    pub dictionary: Dictionary,
    pub elements: ElementTable,
    pub syntaxes: Vec<SyntaxEntry>,
    /// Index 0 is a placeholder for "nowhere"
    pub instances: Vec<InstanceEntry>,
    /// Parent of class n at index n, index 0 is the root
    pub classes: Vec<i32>,
    pub exits: Vec<Exit>,
    pub scripts: Vec<ScriptEntry>,
    /// Initial attribute area, with initial set and string payloads
    pub attributes: Vec<AttributeEntry>,
    pub set_init: Vec<InitSlot>,
    pub string_init: Vec<InitSlot>,
    pub verbs: Vec<VerbEntry>,
    /// Code block of event n at index n-1
    pub events: Vec<usize>,
    pub scores: Vec<i32>,
    pub text: Vec<u8>,
    pub code: Code,
}

struct ImageReader<'a> {
    words: &'a [u32],
}

impl<'a> ImageReader<'a> {
    fn word(&self, address: usize) -> Result<u32, SysError> {
        self.words
            .get(address)
            .copied()
            .ok_or_else(|| SysError::Image(format!("address {} outside image", address)))
    }

    /// Records of `record_len` words starting at `address`, up to the EOF word.
    /// Address 0 is an empty table.
    fn records(
        &self,
        address: usize,
        record_len: usize,
        table: &'static str,
    ) -> Result<Vec<&'a [u32]>, SysError> {
        let mut records = Vec::new();
        if address == 0 {
            return Ok(records);
        }
        let mut position = address;
        loop {
            match self.words.get(position) {
                None => return Err(SysError::MissingTerminator(table)),
                Some(&EOF) => return Ok(records),
                Some(_) => {
                    let record = self
                        .words
                        .get(position..position + record_len)
                        .ok_or(SysError::MissingTerminator(table))?;
                    records.push(record);
                    position += record_len;
                }
            }
        }
    }

    fn word_list(&self, address: usize, table: &'static str) -> Result<Vec<u32>, SysError> {
        Ok(self
            .records(address, 1, table)?
            .into_iter()
            .map(|r| r[0])
            .collect())
    }
}

/// Unpack the text area: a byte count followed by bytes packed four to a word
fn load_text(reader: &ImageReader, address: usize) -> Result<Vec<u8>, SysError> {
    if address == 0 {
        return Ok(Vec::new());
    }
    let len = reader.word(address)? as usize;
    let mut text = Vec::with_capacity(len);
    for i in 0..(len + 3) / 4 {
        text.extend_from_slice(&reader.word(address + 1 + i)?.to_be_bytes());
    }
    text.truncate(len);
    Ok(text)
}

fn text_slice(text: &[u8], fpos: usize, len: usize) -> Result<String, SysError> {
    let bytes = text
        .get(fpos..fpos + len)
        .ok_or_else(|| SysError::Image(format!("text {}+{} outside text area", fpos, len)))?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

struct ElementLoader<'r, 'a> {
    reader: &'r ImageReader<'a>,
    table: ElementTable,
    loaded: IndexMap<usize, usize>,
}

impl<'r, 'a> ElementLoader<'r, 'a> {
    /// Copy the element list at `address` into the arena, returning its index
    fn load_list(&mut self, address: usize) -> Result<usize, SysError> {
        if let Some(&index) = self.loaded.get(&address) {
            return Ok(index);
        }
        let records = self.reader.records(address, ELEMENT_RECORD, "element")?;
        let start = self.table.reserve_list(records.len());
        self.loaded.insert(address, start);

        for (i, record) in records.iter().enumerate() {
            let code = record[0] as i32;
            let element = match code {
                ELEMENT_END_OF_SYNTAX => ElementEntry::EndOfSyntax {
                    verb: record[1] as i32,
                },
                ELEMENT_PARAMETER => ElementEntry::ParameterSlot {
                    flags: record[1],
                    next: self.load_list(record[2] as usize)?,
                },
                _ => ElementEntry::WordMatch {
                    code,
                    next: self.load_list(record[2] as usize)?,
                },
            };
            self.table.set(start + i, element);
        }
        Ok(start)
    }
}

fn find_attribute(
    instances: &[InstanceEntry],
    attributes: &[AttributeEntry],
    slot: &InitSlot,
) -> Result<usize, SysError> {
    let instance = instances
        .get(slot.instance)
        .filter(|_| slot.instance != 0)
        .ok_or_else(|| SysError::Image(format!("init table names instance {}", slot.instance)))?;
    instance
        .initial_attributes
        .range()
        .find(|&i| attributes[i].code == slot.attribute)
        .ok_or(SysError::AttributeNotFound(slot.instance as i32, slot.attribute))
}

impl Game {
    pub fn from_bytes(bytes: &[u8]) -> Result<Game, SysError> {
        if bytes.len() % 4 != 0 {
            return Err(SysError::Image(format!(
                "image size {} is not a whole number of words",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytes
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Game::from_words(&words)
    }

    pub fn from_words(words: &[u32]) -> Result<Game, SysError> {
        let header = Header::new(words)?;
        let reader = ImageReader { words };
        let text = load_text(&reader, header.text_area)?;

        let mut entries = Vec::new();
        for record in reader.records(header.dictionary, DICTIONARY_RECORD, "dictionary")? {
            let word = text_slice(&text, record[0] as usize, record[1] as usize)?;
            let mut entry = DictionaryEntry::new(&word, record[2] as i32, record[3]);
            entry.string_offset = record[0];
            entry.noun_refs = reader
                .word_list(record[4] as usize, "noun references")?
                .into_iter()
                .map(|r| r as usize)
                .collect();
            entry.adjective_refs = reader
                .word_list(record[5] as usize, "adjective references")?
                .into_iter()
                .map(|r| r as usize)
                .collect();
            entries.push(entry);
        }
        let dictionary = Dictionary::new(entries);

        let mut elements = ElementLoader {
            reader: &reader,
            table: ElementTable::new(),
            loaded: IndexMap::new(),
        };
        let mut syntaxes = Vec::new();
        for record in reader.records(header.syntax_table, SYNTAX_RECORD, "syntax")? {
            syntaxes.push(SyntaxEntry {
                code: record[0] as i32,
                elements: elements.load_list(record[1] as usize)?,
            });
        }
        let elements = elements.table;
        elements.verify()?;

        let mut instances = vec![InstanceEntry::default()];
        let mut attributes = Vec::new();
        let mut kinds = Vec::new();
        for id in 1..=header.instance_max {
            let base = header.instance_table + (id - 1) * INSTANCE_RECORD;
            let record = words.get(base..base + INSTANCE_RECORD).ok_or_else(|| {
                SysError::Image(format!("instance {} outside image", id))
            })?;
            let start = attributes.len();
            for attribute in reader.records(record[4] as usize, ATTRIBUTE_RECORD, "attribute")? {
                attributes.push(AttributeEntry {
                    code: attribute[0] as i32,
                    value: AttributeValue::Scalar(attribute[2] as i32),
                    name_address: attribute[3],
                });
                kinds.push(attribute[1]);
            }
            instances.push(InstanceEntry {
                name: text_slice(&text, record[0] as usize, record[1] as usize)?,
                parent: record[2] as i32,
                initial_location: record[3] as usize,
                initial_attributes: AttributeBlock {
                    start,
                    len: attributes.len() - start,
                },
                container: record[5] != 0,
                location: record[6] != 0,
                pronoun: record[7] as i32,
            });
        }
        for (id, instance) in instances.iter().enumerate().skip(1) {
            if instance.initial_location > header.instance_max {
                return Err(SysError::Image(format!(
                    "instance {} starts in unknown instance {}",
                    id, instance.initial_location
                )));
            }
        }

        let mut classes = vec![0];
        for (index, parent) in reader.word_list(header.class_table, "class")?.into_iter().enumerate() {
            if parent as usize > index {
                return Err(SysError::Image(format!(
                    "class {} has parent {}, which is not defined before it",
                    index + 1,
                    parent
                )));
            }
            classes.push(parent as i32);
        }
        for (id, instance) in instances.iter().enumerate().skip(1) {
            if instance.parent < 0 || instance.parent as usize >= classes.len() {
                return Err(SysError::Image(format!(
                    "instance {} has unknown class {}",
                    id, instance.parent
                )));
            }
        }

        let mut exits = Vec::new();
        for record in reader.records(header.exit_table, EXIT_RECORD, "exit")? {
            let exit = Exit {
                from: record[0] as usize,
                to: record[1] as usize,
            };
            for end in [exit.from, exit.to] {
                if end == 0 || !instances.get(end).map(|i| i.location).unwrap_or(false) {
                    return Err(SysError::Image(format!(
                        "exit from {} to {} does not join two locations",
                        exit.from, exit.to
                    )));
                }
            }
            exits.push(exit);
        }

        let mut set_init = Vec::new();
        for record in reader.records(header.set_init_table, SET_INIT_RECORD, "set init")? {
            let slot = InitSlot {
                instance: record[0] as usize,
                attribute: record[1] as i32,
            };
            let index = find_attribute(&instances, &attributes, &slot)?;
            if kinds[index] != ATTRIBUTE_SET {
                return Err(SysError::Image(format!(
                    "set init names attribute {} of instance {}, which is not a set",
                    slot.attribute, slot.instance
                )));
            }
            let members = reader.word_list(record[2] as usize, "set members")?;
            attributes[index].value = AttributeValue::Set(Set::from_members(&members));
            set_init.push(slot);
        }

        let mut string_init = Vec::new();
        for record in reader.records(header.string_init_table, STRING_INIT_RECORD, "string init")? {
            let slot = InitSlot {
                instance: record[0] as usize,
                attribute: record[1] as i32,
            };
            let index = find_attribute(&instances, &attributes, &slot)?;
            if kinds[index] != ATTRIBUTE_STRING {
                return Err(SysError::Image(format!(
                    "string init names attribute {} of instance {}, which is not a string",
                    slot.attribute, slot.instance
                )));
            }
            attributes[index].value =
                AttributeValue::Text(text_slice(&text, record[2] as usize, record[3] as usize)?);
            string_init.push(slot);
        }

        // Every dynamic attribute must have been initialised above
        for (index, kind) in kinds.iter().enumerate() {
            let listed = match (kind, &attributes[index].value) {
                (&ATTRIBUTE_SCALAR, AttributeValue::Scalar(_)) => true,
                (&ATTRIBUTE_SET, AttributeValue::Set(_)) => true,
                (&ATTRIBUTE_STRING, AttributeValue::Text(_)) => true,
                _ => false,
            };
            if !listed {
                return Err(SysError::Image(format!(
                    "attribute {} (kind {}) is missing from its init table",
                    attributes[index].code, kind
                )));
            }
        }

        let code_words = &words[header.code_start..header.code_start + header.code_size];
        let code = Code::new(code_words)?;
        let check_block = |address: usize, what: &str| -> Result<usize, SysError> {
            if address >= code.len() {
                return Err(SysError::Image(format!(
                    "{} block {} outside code area",
                    what, address
                )));
            }
            Ok(address)
        };

        let mut verbs = Vec::new();
        for record in reader.records(header.verb_table, VERB_RECORD, "verb")? {
            verbs.push(VerbEntry {
                code: record[0] as i32,
                action: check_block(record[1] as usize, "verb")?,
            });
        }
        let events = reader
            .word_list(header.event_table, "event")?
            .into_iter()
            .map(|address| check_block(address as usize, "event"))
            .collect::<Result<Vec<_>, _>>()?;
        let scores = reader
            .word_list(header.score_table, "score")?
            .into_iter()
            .map(|s| s as i32)
            .collect();
        let optional_block = |address: u32, what: &str| -> Result<Option<usize>, SysError> {
            match address {
                0 => Ok(None),
                address => check_block(address as usize, what).map(Some),
            }
        };
        let mut scripts = Vec::new();
        for record in reader.records(header.script_table, SCRIPT_RECORD, "script")? {
            let mut steps = Vec::new();
            for step in reader.records(record[1] as usize, STEP_RECORD, "step")? {
                steps.push(StepEntry {
                    after: optional_block(step[0], "step wait")?,
                    condition: optional_block(step[1], "step condition")?,
                    statements: check_block(step[2] as usize, "step")?,
                });
            }
            scripts.push(ScriptEntry {
                code: record[0] as i32,
                steps,
            });
        }
        check_block(header.start_block, "start")?;
        if header.hero == 0 || header.hero > header.instance_max {
            return Err(SysError::Image(format!("hero {} is not an instance", header.hero)));
        }

        info!(
            "Loaded image: {} words in dictionary, {} syntaxes, {} instances, {} code words",
            dictionary.len(),
            syntaxes.len(),
            header.instance_max,
            code.len()
        );
        debug!(
            "{} set and {} string attributes, {} classes, {} exits, {} scripts",
            set_init.len(),
            string_init.len(),
            classes.len() - 1,
            exits.len(),
            scripts.len()
        );

        Ok(Game {
            header,
            dictionary,
            elements,
            syntaxes,
            instances,
            classes,
            exits,
            scripts,
            attributes,
            set_init,
            string_init,
            verbs,
            events,
            scores,
            text,
            code,
        })
    }

    /// Text of the string at `fpos` in the text area
    pub fn string(&self, fpos: i32, len: i32) -> Result<String, SysError> {
        if fpos < 0 || len < 0 {
            return Err(SysError::IndexOutOfRange(format!("text {}+{}", fpos, len)));
        }
        text_slice(&self.text, fpos as usize, len as usize)
    }

    pub fn script(&self, code: i32) -> Option<&ScriptEntry> {
        self.scripts.iter().find(|s| s.code == code)
    }

    pub fn verb_action(&self, code: i32) -> Option<usize> {
        self.verbs.iter().find(|v| v.code == code).map(|v| v.action)
    }

    pub fn instance_max(&self) -> usize {
        self.instances.len() - 1
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.header)?;
        write!(f, "{}", self.dictionary)?;
        writeln!(f, "Syntaxes:")?;
        for syntax in &self.syntaxes {
            writeln!(f, "  verb {} -> element {}", syntax.code, syntax.elements)?;
        }
        write!(f, "{}", self.elements)?;
        writeln!(f, "Instances:")?;
        for (id, instance) in self.instances.iter().enumerate().skip(1) {
            writeln!(
                f,
                "{:4}: {:<16} class {:3} at {:4} attributes {}+{}{}{}",
                id,
                instance.name,
                instance.parent,
                instance.initial_location,
                instance.initial_attributes.start,
                instance.initial_attributes.len,
                if instance.container { " container" } else { "" },
                if instance.location { " location" } else { "" },
            )?;
        }
        writeln!(f, "Exits:")?;
        for exit in &self.exits {
            writeln!(f, "  {:4} -> {:4}", exit.from, exit.to)?;
        }
        writeln!(f, "Scripts:")?;
        for script in &self.scripts {
            writeln!(f, "  {:4}: {} steps", script.code, script.steps.len())?;
        }
        writeln!(f, "Verbs:")?;
        for verb in &self.verbs {
            writeln!(f, "  {:4} -> block {:#06x}", verb.code, verb.action)?;
        }
        Ok(())
    }
}
