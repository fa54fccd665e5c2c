//! Save and restore of the mutable game state
//!
//! The save file is an IFF `FORM` of type `LSAV` holding, in this order:
//! `HEAD` (table sizes), `ADMN`, `ATTR`, `SETS`, `STRS`, `SCOR` and `EVNT`.
//! Restore reads everything into fresh storage and validates it against the
//! loaded game before any live state is touched.

use crate::error::SaveError;
use crate::iff::{ChunkReader, ChunkWriter, IffFile};
use crate::set::Set;
use crate::world::{
    AdminEntry, AttributeBlock, AttributeEntry, AttributeValue, EventQueueEntry, InitSlot, World,
};
use log::{debug, info};
use std::io::{Read, Write};

pub const FORM_TYPE: [u8; 4] = *b"LSAV";

const CHUNK_ORDER: [&[u8; 4]; 7] = [b"HEAD", b"ADMN", b"ATTR", b"SETS", b"STRS", b"SCOR", b"EVNT"];

const TAG_SCALAR: u32 = 0;
const TAG_SET: u32 = 1;
const TAG_TEXT: u32 = 2;

/// Write the game state to `out`
pub fn save_game(
    world: &World,
    set_init: &[InitSlot],
    string_init: &[InitSlot],
    out: &mut dyn Write,
) -> Result<(), SaveError> {
    let mut iff = IffFile::new(FORM_TYPE);

    let mut head = ChunkWriter::new();
    head.word(world.instance_max() as u32)
        .word(world.attributes.len() as u32)
        .word(set_init.len() as u32)
        .word(string_init.len() as u32)
        .word(world.scores.len() as u32);
    iff.add_chunk(*b"HEAD", head.finish());

    let mut admin = ChunkWriter::new();
    for entry in world.admin.iter().skip(1) {
        admin
            .word(entry.location as u32)
            .int(entry.script)
            .int(entry.visits_count)
            .word(entry.already_described as u32)
            .int(entry.step)
            .int(entry.wait_count)
            .word(entry.attributes.start as u32)
            .word(entry.attributes.len as u32);
    }
    iff.add_chunk(*b"ADMN", admin.finish());

    let mut attributes = ChunkWriter::new();
    for entry in &world.attributes {
        let (tag, scalar) = match entry.value {
            AttributeValue::Scalar(v) => (TAG_SCALAR, v),
            AttributeValue::Set(_) => (TAG_SET, 0),
            AttributeValue::Text(_) => (TAG_TEXT, 0),
        };
        attributes
            .int(entry.code)
            .word(tag)
            .int(scalar)
            .word(entry.name_address);
    }
    iff.add_chunk(*b"ATTR", attributes.finish());

    let mut sets = ChunkWriter::new();
    for slot in set_init {
        let set = world
            .get_set_attribute(slot.instance as i32, slot.attribute)
            .map_err(|e| SaveError::Format(e.to_string()))?;
        sets.word(set.size() as u32);
        for member in set.members() {
            sets.word(*member);
        }
    }
    iff.add_chunk(*b"SETS", sets.finish());

    let mut strings = ChunkWriter::new();
    for slot in string_init {
        let text = world
            .get_string_attribute(slot.instance as i32, slot.attribute)
            .map_err(|e| SaveError::Format(e.to_string()))?;
        strings.text(&text);
    }
    iff.add_chunk(*b"STRS", strings.finish());

    iff.add_chunk(*b"SCOR", save_scores(world.score, &world.scores));

    let mut events = ChunkWriter::new();
    events.word(world.event_queue.len() as u32);
    for entry in &world.event_queue {
        events
            .int(entry.after)
            .int(entry.event)
            .word(entry.where_ as u32);
    }
    iff.add_chunk(*b"EVNT", events.finish());

    iff.write_to(out)?;
    info!(
        "Saved {} instances, {} attributes, {} events",
        world.instance_max(),
        world.attributes.len(),
        world.event_queue.len()
    );
    Ok(())
}

/// Body of the `SCOR` chunk: current score, then every score entry
pub fn save_scores(score: i32, scores: &[i32]) -> Vec<u8> {
    let mut writer = ChunkWriter::new();
    writer.int(score);
    for value in scores {
        writer.int(*value);
    }
    writer.finish()
}

/// Read a `SCOR` chunk body holding `expected` score entries
pub fn restore_scores(data: &[u8], expected: usize) -> Result<(i32, Vec<i32>), SaveError> {
    let mut reader = ChunkReader::new(data, "SCOR");
    let score = reader.int()?;
    let scores = (0..expected)
        .map(|_| reader.int())
        .collect::<Result<Vec<_>, _>>()?;
    if !reader.is_empty() {
        return Err(SaveError::Format("trailing data in SCOR chunk".to_string()));
    }
    Ok((score, scores))
}

fn expect_count(what: &'static str, expected: usize, found: usize) -> Result<(), SaveError> {
    if expected != found {
        return Err(SaveError::Mismatch(what, expected, found));
    }
    Ok(())
}

fn find_attribute(
    admin: &[AdminEntry],
    attributes: &[AttributeEntry],
    slot: &InitSlot,
) -> Result<usize, SaveError> {
    admin
        .get(slot.instance)
        .and_then(|entry| {
            entry
                .attributes
                .range()
                .find(|&i| attributes.get(i).map(|a| a.code) == Some(slot.attribute))
        })
        .ok_or_else(|| {
            SaveError::Format(format!(
                "attribute {} of instance {} is missing",
                slot.attribute, slot.instance
            ))
        })
}

/// Replace the game state with the one stored in `input`.
/// On error the live state is left untouched.
pub fn restore_game(
    world: &mut World,
    set_init: &[InitSlot],
    string_init: &[InitSlot],
    input: &mut dyn Read,
) -> Result<(), SaveError> {
    let iff = IffFile::read_from(input)?;
    if iff.form_type != FORM_TYPE {
        return Err(SaveError::Format(format!(
            "form type '{}' is not a saved game",
            String::from_utf8_lossy(&iff.form_type)
        )));
    }
    if iff.chunks.len() < CHUNK_ORDER.len() {
        return Err(SaveError::UnexpectedEof("chunk list"));
    }
    for (chunk, expected) in iff.chunks.iter().zip(CHUNK_ORDER.iter()) {
        if &chunk.chunk_type != *expected {
            return Err(SaveError::Format(format!(
                "expected chunk '{}', found '{}'",
                String::from_utf8_lossy(*expected),
                chunk.type_name()
            )));
        }
    }
    let chunks = &iff.chunks;

    let mut head = ChunkReader::new(&chunks[0].data, "HEAD");
    let instances = head.count()?;
    expect_count("instances", world.instance_max(), instances)?;
    let attribute_count = head.count()?;
    expect_count("attributes", world.attributes.len(), attribute_count)?;
    expect_count("set attributes", set_init.len(), head.count()?)?;
    expect_count("string attributes", string_init.len(), head.count()?)?;
    let score_count = head.count()?;
    expect_count("scores", world.scores.len(), score_count)?;

    let mut reader = ChunkReader::new(&chunks[1].data, "ADMN");
    let mut admin = Vec::with_capacity(instances + 1);
    admin.push(world.admin.first().cloned().unwrap_or_default());
    for _ in 0..instances {
        let entry = AdminEntry {
            location: reader.count()?,
            script: reader.int()?,
            visits_count: reader.int()?,
            already_described: reader.word()? != 0,
            step: reader.int()?,
            wait_count: reader.int()?,
            attributes: AttributeBlock {
                start: reader.count()?,
                len: reader.count()?,
            },
        };
        if entry.location > instances {
            return Err(SaveError::Format(format!(
                "instance {} located in unknown instance {}",
                admin.len(),
                entry.location
            )));
        }
        if entry.attributes.start + entry.attributes.len > attribute_count {
            return Err(SaveError::Format(format!(
                "attributes of instance {} outside the attribute area",
                admin.len()
            )));
        }
        admin.push(entry);
    }

    let mut reader = ChunkReader::new(&chunks[2].data, "ATTR");
    let mut attributes = Vec::with_capacity(attribute_count);
    for live in world.attributes.iter() {
        let code = reader.int()?;
        let tag = reader.word()?;
        let scalar = reader.int()?;
        let name_address = reader.word()?;
        let value = match (tag, &live.value) {
            (TAG_SCALAR, AttributeValue::Scalar(_)) => AttributeValue::Scalar(scalar),
            (TAG_SET, AttributeValue::Set(_)) => AttributeValue::Set(Set::new()),
            (TAG_TEXT, AttributeValue::Text(_)) => AttributeValue::Text(String::new()),
            _ => {
                return Err(SaveError::Format(format!(
                    "attribute {} has kind {} in the save file, {} in the game",
                    code,
                    tag,
                    live.value.type_name()
                )))
            }
        };
        attributes.push(AttributeEntry {
            code,
            value,
            name_address,
        });
    }

    let mut reader = ChunkReader::new(&chunks[3].data, "SETS");
    for slot in set_init {
        let size = reader.count()?;
        let mut set = Set::with_capacity(size);
        for _ in 0..size {
            set.add(reader.word()?);
        }
        let index = find_attribute(&admin, &attributes, slot)?;
        match &mut attributes[index].value {
            AttributeValue::Set(target) => *target = set,
            _ => return Err(SaveError::Format(format!("attribute {} is not a set", slot.attribute))),
        }
    }

    let mut reader = ChunkReader::new(&chunks[4].data, "STRS");
    for slot in string_init {
        let text = reader.text()?;
        let index = find_attribute(&admin, &attributes, slot)?;
        match &mut attributes[index].value {
            AttributeValue::Text(target) => *target = text,
            _ => {
                return Err(SaveError::Format(format!(
                    "attribute {} is not a string",
                    slot.attribute
                )))
            }
        }
    }

    let (score, scores) = restore_scores(&chunks[5].data, score_count)?;

    let mut reader = ChunkReader::new(&chunks[6].data, "EVNT");
    let event_count = reader.count()?;
    let mut event_queue = Vec::new();
    for _ in 0..event_count {
        let entry = EventQueueEntry {
            after: reader.int()?,
            event: reader.int()?,
            where_: reader.count()?,
        };
        if entry.where_ > instances {
            return Err(SaveError::Format(format!(
                "event {} scheduled at unknown instance {}",
                entry.event, entry.where_
            )));
        }
        event_queue.push(entry);
    }

    world.admin = admin;
    world.attributes = attributes;
    world.score = score;
    world.scores = scores;
    world.event_queue = event_queue;
    world.changed = true;
    debug!("Restored game state with {} pending events", world.event_queue.len());
    Ok(())
}
