//! The mutable object model
//!
//! Instances are numbered from 1; instance 0 means nowhere. Every instance
//! owns a contiguous block of the shared attribute area. Literal parameters
//! of the current command are addressed as instances above `instance_max`.

use crate::error::SysError;
use crate::parser::Literal;
use crate::set::Set;
use log::debug;

/// Handle of an instance's attribute block in the attribute area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeBlock {
    pub start: usize,
    pub len: usize,
}

impl AttributeBlock {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Scalar(i32),
    Set(Set),
    Text(String),
}

impl AttributeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Scalar(_) => "integer",
            AttributeValue::Set(_) => "set",
            AttributeValue::Text(_) => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    pub code: i32,
    pub value: AttributeValue,
    pub name_address: u32,
}

/// Static template data of one instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceEntry {
    pub name: String,
    pub parent: i32,
    pub initial_location: usize,
    pub initial_attributes: AttributeBlock,
    pub container: bool,
    pub location: bool,
    pub pronoun: i32,
}

/// Mutable per-instance state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdminEntry {
    pub location: usize,
    pub script: i32,
    pub visits_count: i32,
    pub already_described: bool,
    pub step: i32,
    pub wait_count: i32,
    pub attributes: AttributeBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQueueEntry {
    pub after: i32,
    pub event: i32,
    pub where_: usize,
}

/// A way out of one location into another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    pub from: usize,
    pub to: usize,
}

/// One variable-length attribute slot: set or string valued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitSlot {
    pub instance: usize,
    pub attribute: i32,
}

pub struct World {
    /// Index 0 is a placeholder for "nowhere"
    pub instances: Vec<InstanceEntry>,
    pub admin: Vec<AdminEntry>,
    /// Parent of every class, index 0 is the root
    pub classes: Vec<i32>,
    pub exits: Vec<Exit>,
    pub attributes: Vec<AttributeEntry>,
    pub event_queue: Vec<EventQueueEntry>,
    pub scores: Vec<i32>,
    pub score: i32,
    pub hero: usize,
    /// Literals of the command being executed
    pub literals: Vec<Literal>,
    /// Set by every mutation, cleared by the interpreter before each command
    pub changed: bool,
}

impl World {
    /// Build the initial world from the image templates.
    /// `instances` and the attribute area are indexed as in the image.
    pub fn new(
        instances: Vec<InstanceEntry>,
        attributes: Vec<AttributeEntry>,
        scores: Vec<i32>,
        hero: usize,
    ) -> World {
        let admin = instances
            .iter()
            .map(|instance| AdminEntry {
                location: instance.initial_location,
                attributes: instance.initial_attributes,
                ..AdminEntry::default()
            })
            .collect();
        World {
            instances,
            admin,
            classes: vec![0],
            exits: Vec::new(),
            attributes,
            event_queue: Vec::new(),
            scores,
            score: 0,
            hero,
            literals: Vec::new(),
            changed: false,
        }
    }

    /// Add the class hierarchy and the exits between locations
    pub fn with_map(mut self, classes: Vec<i32>, exits: Vec<Exit>) -> World {
        self.classes = classes;
        self.exits = exits;
        self
    }

    pub fn instance_max(&self) -> usize {
        self.instances.len().saturating_sub(1)
    }

    pub fn verify_instance(&self, id: i32, action: &'static str) -> Result<usize, SysError> {
        if id < 1 || id as usize > self.instance_max() {
            return Err(SysError::IllegalInstance(id, action));
        }
        Ok(id as usize)
    }

    pub fn is_literal(&self, id: i32) -> bool {
        id as i64 > self.instance_max() as i64
            && (id as i64) <= (self.instance_max() + self.literals.len()) as i64
    }

    fn literal(&self, id: i32) -> Option<&Literal> {
        if !self.is_literal(id) {
            return None;
        }
        self.literals.get(id as usize - self.instance_max() - 1)
    }

    /// Instance id given to the n-th literal of the current command
    pub fn literal_instance(&self, index: usize) -> i32 {
        (self.instance_max() + index + 1) as i32
    }

    pub fn is_location(&self, id: usize) -> bool {
        self.instances.get(id).map(|i| i.location).unwrap_or(false)
    }

    pub fn is_container(&self, id: usize) -> bool {
        id != 0 && self.instances.get(id).map(|i| i.container).unwrap_or(false)
    }

    fn attribute_index(&self, id: usize, code: i32) -> Result<usize, SysError> {
        let block = self.admin[id].attributes;
        block
            .range()
            .find(|&i| self.attributes.get(i).map(|a| a.code) == Some(code))
            .ok_or(SysError::AttributeNotFound(id as i32, code))
    }

    /// Live value of an attribute slot, for snapshot and restore code
    pub fn attribute_value_mut(
        &mut self,
        id: usize,
        code: i32,
    ) -> Result<&mut AttributeValue, SysError> {
        if id == 0 || id >= self.admin.len() {
            return Err(SysError::IllegalInstance(id as i32, "access attributes of"));
        }
        let index = self.attribute_index(id, code)?;
        Ok(&mut self.attributes[index].value)
    }

    pub fn get_attribute(&self, id: i32, code: i32) -> Result<i32, SysError> {
        if let Some(literal) = self.literal(id) {
            return match (code, literal) {
                (1, Literal::Number(n)) => Ok(*n),
                (1, Literal::Text(_)) => Err(SysError::TypeMismatch("integer", "string")),
                _ => Err(SysError::AttributeNotFound(id, code)),
            };
        }
        let id = self.verify_instance(id, "get ATTRIBUTE of")?;
        match &self.attributes[self.attribute_index(id, code)?].value {
            AttributeValue::Scalar(v) => Ok(*v),
            other => Err(SysError::TypeMismatch("integer", other.type_name())),
        }
    }

    pub fn get_string_attribute(&self, id: i32, code: i32) -> Result<String, SysError> {
        if let Some(literal) = self.literal(id) {
            return match (code, literal) {
                (1, Literal::Text(s)) => Ok(s.clone()),
                (1, Literal::Number(_)) => Err(SysError::TypeMismatch("string", "integer")),
                _ => Err(SysError::AttributeNotFound(id, code)),
            };
        }
        let id = self.verify_instance(id, "get string ATTRIBUTE of")?;
        match &self.attributes[self.attribute_index(id, code)?].value {
            AttributeValue::Text(s) => Ok(s.clone()),
            other => Err(SysError::TypeMismatch("string", other.type_name())),
        }
    }

    pub fn get_set_attribute(&self, id: i32, code: i32) -> Result<Set, SysError> {
        let id = self.verify_instance(id, "get set ATTRIBUTE of")?;
        match &self.attributes[self.attribute_index(id, code)?].value {
            AttributeValue::Set(s) => Ok(s.clone()),
            other => Err(SysError::TypeMismatch("set", other.type_name())),
        }
    }

    /// Replace an attribute value, keeping its kind
    pub fn set_attribute(
        &mut self,
        id: i32,
        code: i32,
        value: AttributeValue,
    ) -> Result<(), SysError> {
        let id = self.verify_instance(id, "SET ATTRIBUTE of")?;
        let index = self.attribute_index(id, code)?;
        let slot = &mut self.attributes[index].value;
        if std::mem::discriminant(slot) != std::mem::discriminant(&value) {
            return Err(SysError::TypeMismatch(slot.type_name(), value.type_name()));
        }
        *slot = value;
        self.changed = true;
        Ok(())
    }

    /// Direct location, or 0 for locations and instances that are nowhere
    pub fn where_(&self, id: i32, direct: bool) -> Result<i32, SysError> {
        let id = self.verify_instance(id, "WHERE")?;
        if self.is_location(id) {
            Ok(0)
        } else if direct {
            Ok(self.admin[id].location as i32)
        } else {
            Ok(self.location_of(id as i32)?)
        }
    }

    /// The location an instance is in, looking through containers
    pub fn location_of(&self, id: i32) -> Result<i32, SysError> {
        let id = self.verify_instance(id, "get LOCATION of")?;
        let mut position = self.admin[id].location;
        let mut steps = 0;
        while position != 0 && !self.is_location(position) {
            position = self.admin.get(position).map(|a| a.location).unwrap_or(0);
            steps += 1;
            if steps > self.admin.len() {
                return Err(SysError::ContainmentLoop(id as i32, position as i32));
            }
        }
        Ok(position as i32)
    }

    /// Is `instance` in `container`, directly or through nested containers
    pub fn is_in(&self, instance: i32, container: i32, direct: bool) -> Result<bool, SysError> {
        let instance = self.verify_instance(instance, "check IN for")?;
        let container = self.verify_instance(container, "check IN of")?;
        if !self.is_container(container) {
            return Err(SysError::IllegalInstance(container as i32, "use as container"));
        }
        Ok(self.contained_in(instance, container, direct))
    }

    fn contained_in(&self, instance: usize, container: usize, direct: bool) -> bool {
        let mut location = self.admin[instance].location;
        if direct {
            return location == container;
        }
        let mut steps = 0;
        while location != 0 && steps <= self.admin.len() {
            if location == container {
                return true;
            }
            location = self.admin.get(location).map(|a| a.location).unwrap_or(0);
            steps += 1;
        }
        false
    }

    fn contents(&self, container: i32, direct: bool) -> Result<Vec<usize>, SysError> {
        let container = self.verify_instance(container, "count contents of")?;
        if !self.is_container(container) {
            return Err(SysError::IllegalInstance(container as i32, "use as container"));
        }
        Ok((1..=self.instance_max())
            .filter(|&i| self.contained_in(i, container, direct))
            .collect())
    }

    /// Number of instances in a container, directly or transitively
    pub fn container_size(&self, container: i32, direct: bool) -> Result<i32, SysError> {
        Ok(self.contents(container, direct)?.len() as i32)
    }

    /// The `index`-th (1-based) instance in a container, in instance order
    pub fn container_member(&self, container: i32, index: i32, direct: bool) -> Result<i32, SysError> {
        let contents = self.contents(container, direct)?;
        if index < 1 || index as usize > contents.len() {
            return Err(SysError::IndexOutOfRange(format!(
                "member {} of container {} holding {}",
                index,
                container,
                contents.len()
            )));
        }
        Ok(contents[index as usize - 1] as i32)
    }

    /// Does the instance belong to `class` or one of its subclasses.
    /// Literals belong to no class.
    pub fn is_a(&self, id: i32, class: i32) -> Result<bool, SysError> {
        if self.is_literal(id) {
            return Ok(false);
        }
        let id = self.verify_instance(id, "check ISA for")?;
        let mut parent = self.instances[id].parent;
        let mut steps = 0;
        while parent > 0 && parent != class && steps < self.classes.len() {
            parent = self.classes.get(parent as usize).copied().unwrap_or(0);
            steps += 1;
        }
        Ok(parent > 0 && parent == class)
    }

    /// Is `location`, or a location it is nested in, `other`
    fn within(&self, location: usize, other: usize) -> bool {
        let mut position = location;
        let mut steps = 0;
        while position != 0 && steps <= self.admin.len() {
            if position == other {
                return true;
            }
            position = self.admin.get(position).map(|a| a.location).unwrap_or(0);
            steps += 1;
        }
        false
    }

    /// Is `instance` at `other`. Directly means in the same place without
    /// looking through containers or nested locations.
    pub fn is_at(&self, instance: i32, other: i32, direct: bool) -> Result<bool, SysError> {
        if instance == 0 || other == 0 {
            return Ok(false);
        }
        let id = self.verify_instance(instance, "check AT for")?;
        let other_id = self.verify_instance(other, "check AT of")?;
        let position = self.admin[id].location;
        if self.is_location(id) {
            return Ok(if direct {
                position == other_id
            } else {
                self.within(position, other_id)
            });
        }
        if self.is_location(other_id) {
            return Ok(if direct {
                position == other_id
            } else {
                self.within(self.location_of(instance)? as usize, other_id)
            });
        }
        if direct {
            Ok(position == self.admin[other_id].location)
        } else {
            let location = self.location_of(instance)? as usize;
            let other_location = self.location_of(other)? as usize;
            Ok(self.within(location, other_location))
        }
    }

    /// The location itself for locations, otherwise where the instance is
    fn place(&self, id: i32, direct: bool) -> Result<usize, SysError> {
        let index = self.verify_instance(id, "find place of")?;
        if self.is_location(index) {
            Ok(index)
        } else {
            Ok(self.where_(id, direct)? as usize)
        }
    }

    pub fn exit_to(&self, from: usize, to: usize) -> bool {
        from != 0 && self.exits.iter().any(|e| e.from == from && e.to == to)
    }

    /// Can `here` be reached in one move from the place of `id`
    pub fn is_nearby(&self, id: i32, here: i32, direct: bool) -> Result<bool, SysError> {
        let place = self.place(id, direct)?;
        Ok(here > 0 && self.exit_to(place, here as usize))
    }

    /// Is there an exit from the place of `id` to the place of `other`
    pub fn is_near(&self, id: i32, other: i32, direct: bool) -> Result<bool, SysError> {
        let from = self.place(id, direct)?;
        let to = self.place(other, direct)?;
        Ok(self.exit_to(from, to))
    }

    /// Move everything directly in `container` to `whr`
    pub fn empty(&mut self, container: i32, whr: i32) -> Result<(), SysError> {
        let contents = self.contents(container, true)?;
        for id in contents {
            self.locate(id as i32, whr)?;
        }
        Ok(())
    }

    /// Start an actor on step 1 of a script
    pub fn start_script(&mut self, actor: i32, script: i32, wait: i32) -> Result<(), SysError> {
        let actor = self.verify_instance(actor, "USE script for")?;
        let admin = &mut self.admin[actor];
        admin.script = script;
        admin.step = 0;
        admin.wait_count = wait;
        self.changed = true;
        debug!("Actor {} uses script {}", actor, script);
        Ok(())
    }

    pub fn stop_script(&mut self, actor: i32) -> Result<(), SysError> {
        let actor = self.verify_instance(actor, "STOP")?;
        let admin = &mut self.admin[actor];
        admin.script = 0;
        admin.step = 0;
        self.changed = true;
        Ok(())
    }

    pub fn locate(&mut self, id: i32, whr: i32) -> Result<(), SysError> {
        let instance = self.verify_instance(id, "LOCATE")?;
        let destination = self.verify_instance(whr, "LOCATE AT")?;
        if instance == destination
            || (self.is_container(instance) && self.contained_in(destination, instance, false))
        {
            return Err(SysError::ContainmentLoop(id, whr));
        }
        self.admin[instance].location = destination;
        if instance == self.hero && self.is_location(destination) {
            self.admin[destination].visits_count += 1;
        }
        self.changed = true;
        debug!("Located {} at {}", instance, destination);
        Ok(())
    }

    /// Schedule an event, replacing any pending entry for the same event.
    /// The queue is ordered so the next due event is last.
    pub fn schedule(&mut self, event: i32, where_: i32, after: i32) -> Result<(), SysError> {
        if event == 0 {
            return Err(SysError::NoSuchEvent(event));
        }
        let where_ = self.verify_instance(where_, "SCHEDULE at")?;
        self.cancel(event);
        let position = self
            .event_queue
            .iter()
            .position(|e| e.after <= after)
            .unwrap_or(self.event_queue.len());
        self.event_queue.insert(
            position,
            EventQueueEntry {
                after,
                event,
                where_,
            },
        );
        self.changed = true;
        Ok(())
    }

    pub fn cancel(&mut self, event: i32) {
        if let Some(index) = self.event_queue.iter().rposition(|e| e.event == event) {
            self.event_queue.remove(index);
            self.changed = true;
        }
    }

    /// Remove and return the next event that is due now
    pub fn take_due_event(&mut self) -> Option<EventQueueEntry> {
        match self.event_queue.last() {
            Some(entry) if entry.after <= 0 => self.event_queue.pop(),
            _ => None,
        }
    }

    /// Count every remaining event one tick closer
    pub fn tick_events(&mut self) {
        for entry in self.event_queue.iter_mut() {
            entry.after -= 1;
        }
    }

    /// Award score entry `n` (1-based); each entry can only be earned once
    pub fn add_score(&mut self, n: i32) -> Result<(), SysError> {
        if n < 1 || n as usize > self.scores.len() {
            return Err(SysError::NoSuchScore(n));
        }
        let index = n as usize - 1;
        self.score += self.scores[index];
        self.scores[index] = 0;
        self.changed = true;
        Ok(())
    }
}
