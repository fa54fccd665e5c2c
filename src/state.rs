//! Game state snapshots for undo
//!
//! A snapshot is a deep copy of everything a command can change. Set and
//! string attribute payloads are not copied with the attribute area; they
//! are collected separately by walking the set and string init tables, so
//! the tables remain the only description of where dynamic payloads live.

use crate::error::SysError;
use crate::set::Set;
use crate::world::{
    AdminEntry, AttributeEntry, AttributeValue, EventQueueEntry, InitSlot, World,
};
use log::debug;

/// Longest player command remembered with a snapshot, in bytes
pub const MAX_PLAYER_COMMAND: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub admin: Vec<AdminEntry>,
    /// Attribute area with set and string payloads left empty
    pub attributes: Vec<AttributeEntry>,
    /// One per set init table entry, in table order
    pub sets: Vec<Set>,
    /// One per string init table entry, in table order
    pub strings: Vec<String>,
    pub event_queue: Vec<EventQueueEntry>,
    pub score: i32,
    pub scores: Vec<i32>,
    pub player_command: String,
}

fn bounded_command(command: &str) -> String {
    if command.len() <= MAX_PLAYER_COMMAND {
        return command.to_string();
    }
    let mut end = MAX_PLAYER_COMMAND;
    while !command.is_char_boundary(end) {
        end -= 1;
    }
    command[..end].to_string()
}

fn detached(attributes: &[AttributeEntry]) -> Vec<AttributeEntry> {
    attributes
        .iter()
        .map(|entry| AttributeEntry {
            code: entry.code,
            value: match &entry.value {
                AttributeValue::Scalar(v) => AttributeValue::Scalar(*v),
                AttributeValue::Set(_) => AttributeValue::Set(Set::new()),
                AttributeValue::Text(_) => AttributeValue::Text(String::new()),
            },
            name_address: entry.name_address,
        })
        .collect()
}

impl GameState {
    /// Deep copy the mutable parts of `world`
    pub fn capture(
        world: &World,
        set_init: &[InitSlot],
        string_init: &[InitSlot],
        player_command: &str,
    ) -> Result<GameState, SysError> {
        let sets = set_init
            .iter()
            .map(|slot| world.get_set_attribute(slot.instance as i32, slot.attribute))
            .collect::<Result<Vec<_>, _>>()?;
        let strings = string_init
            .iter()
            .map(|slot| world.get_string_attribute(slot.instance as i32, slot.attribute))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GameState {
            admin: world.admin.clone(),
            attributes: detached(&world.attributes),
            sets,
            strings,
            event_queue: world.event_queue.clone(),
            score: world.score,
            scores: world.scores.clone(),
            player_command: bounded_command(player_command),
        })
    }

    /// Move this snapshot into `world`, replacing its live state
    pub fn install(
        self,
        world: &mut World,
        set_init: &[InitSlot],
        string_init: &[InitSlot],
    ) -> Result<String, SysError> {
        if self.sets.len() != set_init.len() || self.strings.len() != string_init.len() {
            return Err(SysError::IndexOutOfRange(format!(
                "snapshot holds {} sets and {} strings, tables list {} and {}",
                self.sets.len(),
                self.strings.len(),
                set_init.len(),
                string_init.len()
            )));
        }

        world.admin = self.admin;
        world.attributes = self.attributes;
        world.event_queue = self.event_queue;
        world.score = self.score;
        world.scores = self.scores;

        for (slot, set) in set_init.iter().zip(self.sets) {
            *world.attribute_value_mut(slot.instance, slot.attribute)? = AttributeValue::Set(set);
        }
        for (slot, text) in string_init.iter().zip(self.strings) {
            *world.attribute_value_mut(slot.instance, slot.attribute)? =
                AttributeValue::Text(text);
        }
        Ok(self.player_command)
    }
}

/// LIFO stack of snapshots, one per undoable command
#[derive(Debug, Default)]
pub struct UndoStack {
    states: Vec<GameState>,
}

impl UndoStack {
    pub fn new() -> Self {
        UndoStack { states: Vec::new() }
    }

    /// Number of retained snapshots
    pub fn game_state_top(&self) -> usize {
        self.states.len()
    }

    /// Storage currently reserved for snapshots
    pub fn capacity(&self) -> usize {
        self.states.capacity()
    }

    /// Release every retained snapshot
    pub fn init_undo_stack(&mut self) {
        self.states = Vec::new();
        debug!("Undo stack cleared");
    }

    pub fn push_game_state(
        &mut self,
        world: &World,
        set_init: &[InitSlot],
        string_init: &[InitSlot],
        player_command: &str,
    ) -> Result<(), SysError> {
        let state = GameState::capture(world, set_init, string_init, player_command)?;
        self.states.push(state);
        debug!("Pushed game state {}", self.states.len());
        Ok(())
    }

    /// Restore the most recent snapshot. Returns the command it was taken
    /// for, or `None` when there is nothing to undo.
    pub fn pop_game_state(
        &mut self,
        world: &mut World,
        set_init: &[InitSlot],
        string_init: &[InitSlot],
    ) -> Result<Option<String>, SysError> {
        match self.states.pop() {
            Some(state) => {
                debug!("Popping game state {}", self.states.len() + 1);
                state.install(world, set_init, string_init).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Drop the most recent snapshot without restoring it
    pub fn forget_game_state(&mut self) {
        if self.states.pop().is_some() {
            debug!("Forgot game state {}", self.states.len() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{AttributeBlock, InstanceEntry};
    use test_log::test;

    // Three instances, each with a scalar, a set and a string attribute
    fn world() -> (World, Vec<InitSlot>, Vec<InitSlot>) {
        let mut instances = vec![InstanceEntry::default()];
        let mut attributes = Vec::new();
        let mut set_init = Vec::new();
        let mut string_init = Vec::new();
        for id in 1..=3usize {
            let start = attributes.len();
            attributes.push(AttributeEntry {
                code: 1,
                value: AttributeValue::Scalar(id as i32),
                name_address: 0,
            });
            attributes.push(AttributeEntry {
                code: 2,
                value: AttributeValue::Set(Set::from_members(&[id as u32])),
                name_address: 0,
            });
            attributes.push(AttributeEntry {
                code: 3,
                value: AttributeValue::Text(format!("text {}", id)),
                name_address: 0,
            });
            instances.push(InstanceEntry {
                initial_attributes: AttributeBlock { start, len: 3 },
                ..InstanceEntry::default()
            });
            set_init.push(InitSlot {
                instance: id,
                attribute: 2,
            });
            string_init.push(InitSlot {
                instance: id,
                attribute: 3,
            });
        }
        (World::new(instances, attributes, vec![1, 2], 1), set_init, string_init)
    }

    #[test]
    fn test_nested_push_pop_restores_exactly() {
        let (mut world, sets, strings) = world();
        let mut undo = UndoStack::new();
        let original_admin = world.admin.clone();
        let original_attributes = world.attributes.clone();

        undo.push_game_state(&world, &sets, &strings, "first").unwrap();
        world.admin[2].wait_count = 38869878;
        undo.push_game_state(&world, &sets, &strings, "second").unwrap();
        world.admin[3].location = 1;
        world
            .set_attribute(1, 3, AttributeValue::Text("changed".to_string()))
            .unwrap();
        assert_eq!(undo.game_state_top(), 2);

        let command = undo.pop_game_state(&mut world, &sets, &strings).unwrap();
        assert_eq!(command.as_deref(), Some("second"));
        assert_eq!(world.admin[2].wait_count, 38869878);
        assert_eq!(world.admin[3].location, 0);
        assert_eq!(world.get_string_attribute(1, 3), Ok("text 1".to_string()));

        let command = undo.pop_game_state(&mut world, &sets, &strings).unwrap();
        assert_eq!(command.as_deref(), Some("first"));
        assert_eq!(world.admin, original_admin);
        assert_eq!(world.attributes, original_attributes);
        assert_eq!(undo.game_state_top(), 0);
    }

    #[test]
    fn test_set_mutation_does_not_reach_snapshot() {
        let (mut world, sets, strings) = world();
        let mut undo = UndoStack::new();
        undo.push_game_state(&world, &sets, &strings, "take").unwrap();

        if let AttributeValue::Set(set) = world.attribute_value_mut(2, 2).unwrap() {
            set.add(99);
        }
        assert_eq!(world.get_set_attribute(2, 2).unwrap().size(), 2);

        undo.pop_game_state(&mut world, &sets, &strings).unwrap();
        assert_eq!(world.get_set_attribute(2, 2), Ok(Set::from_members(&[2])));
    }

    #[test]
    fn test_push_then_pop_is_a_no_op() {
        let (mut world, sets, strings) = world();
        world.schedule(4, 2, 3).unwrap();
        let admin = world.admin.clone();
        let attributes = world.attributes.clone();
        let queue = world.event_queue.clone();

        let mut undo = UndoStack::new();
        undo.push_game_state(&world, &sets, &strings, "").unwrap();
        undo.pop_game_state(&mut world, &sets, &strings).unwrap();

        assert_eq!(world.admin, admin);
        assert_eq!(world.attributes, attributes);
        assert_eq!(world.event_queue, queue);
    }

    #[test]
    fn test_init_undo_stack_releases_storage() {
        let (world, sets, strings) = world();
        let mut undo = UndoStack::new();
        for _ in 0..5 {
            undo.push_game_state(&world, &sets, &strings, "wait").unwrap();
        }
        undo.init_undo_stack();
        assert_eq!(undo.game_state_top(), 0);
        assert_eq!(undo.capacity(), 0);
    }

    #[test]
    fn test_forget_and_empty_pop() {
        let (mut world, sets, strings) = world();
        let mut undo = UndoStack::new();
        undo.push_game_state(&world, &sets, &strings, "look").unwrap();
        world.admin[1].step = 5;
        undo.forget_game_state();
        assert_eq!(undo.game_state_top(), 0);
        assert_eq!(undo.pop_game_state(&mut world, &sets, &strings), Ok(None));
        assert_eq!(world.admin[1].step, 5);
    }

    #[test]
    fn test_player_command_is_bounded() {
        let long = "é".repeat(MAX_PLAYER_COMMAND);
        let bounded = bounded_command(&long);
        assert!(bounded.len() <= MAX_PLAYER_COMMAND);
        assert!(long.starts_with(&bounded));
    }
}
