//! Operand stack with frame-addressed locals
//!
//! A frame is a saved frame pointer followed by its zero-initialised locals.
//! Locals are numbered from 1 and may be addressed in enclosing frames by
//! walking the chain of saved pointers.

use crate::error::SysError;
use crate::set::Set;
use std::fmt;

pub const STACK_SIZE: usize = 1000;

const NO_FRAME: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Set(Set),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Set(_) => "set",
            Value::Text(_) => "string",
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Int(value as i32)
    }
}

impl From<Set> for Value {
    fn from(value: Set) -> Self {
        Value::Set(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Set(s) => write!(f, "{}", s),
            Value::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stack {
    values: Vec<Value>,
    frame: Option<usize>,
}

impl Stack {
    pub fn new() -> Self {
        Stack {
            values: Vec::with_capacity(64),
            frame: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.frame = None;
    }

    pub fn push<V: Into<Value>>(&mut self, value: V) -> Result<(), SysError> {
        if self.values.len() >= STACK_SIZE {
            return Err(SysError::StackOverflow(STACK_SIZE));
        }
        self.values.push(value.into());
        Ok(())
    }

    /// The current frame's saved pointer is never an operand
    fn check_floor(&self) -> Result<(), SysError> {
        match self.frame {
            Some(frame) if self.values.len() <= frame + 1 => Err(SysError::StackUnderflow),
            _ => Ok(()),
        }
    }

    pub fn pop(&mut self) -> Result<Value, SysError> {
        self.check_floor()?;
        self.values.pop().ok_or(SysError::StackUnderflow)
    }

    pub fn top(&self) -> Result<&Value, SysError> {
        self.check_floor()?;
        self.values.last().ok_or(SysError::StackUnderflow)
    }

    pub fn top_mut(&mut self) -> Result<&mut Value, SysError> {
        self.check_floor()?;
        self.values.last_mut().ok_or(SysError::StackUnderflow)
    }

    pub fn pop_int(&mut self) -> Result<i32, SysError> {
        match self.pop()? {
            Value::Int(i) => Ok(i),
            other => Err(SysError::TypeMismatch("integer", other.type_name())),
        }
    }

    pub fn pop_bool(&mut self) -> Result<bool, SysError> {
        Ok(self.pop_int()? != 0)
    }

    pub fn pop_set(&mut self) -> Result<Set, SysError> {
        match self.pop()? {
            Value::Set(s) => Ok(s),
            other => Err(SysError::TypeMismatch("set", other.type_name())),
        }
    }

    pub fn pop_text(&mut self) -> Result<String, SysError> {
        match self.pop()? {
            Value::Text(s) => Ok(s),
            other => Err(SysError::TypeMismatch("string", other.type_name())),
        }
    }

    /// Open a frame with `locals` zeroed local variables
    pub fn new_frame(&mut self, locals: usize) -> Result<(), SysError> {
        let saved = match self.frame {
            Some(frame) => frame as i32,
            None => NO_FRAME,
        };
        self.push(saved)?;
        self.frame = Some(self.values.len() - 1);
        for _ in 0..locals {
            self.push(0)?;
        }
        Ok(())
    }

    /// Drop the current frame and everything above it
    pub fn end_frame(&mut self) -> Result<(), SysError> {
        let frame = self
            .frame
            .ok_or_else(|| SysError::FrameCorrupt("ENDFRAME without a frame".to_string()))?;
        let saved = self.saved_pointer(frame)?;
        self.values.truncate(frame);
        self.frame = saved;
        Ok(())
    }

    fn saved_pointer(&self, frame: usize) -> Result<Option<usize>, SysError> {
        match self.values.get(frame) {
            Some(Value::Int(NO_FRAME)) => Ok(None),
            Some(Value::Int(p)) if *p >= 0 && (*p as usize) < frame => Ok(Some(*p as usize)),
            Some(other) => Err(SysError::FrameCorrupt(format!(
                "bad saved frame pointer {} at {}",
                other, frame
            ))),
            None => Err(SysError::FrameCorrupt(format!(
                "frame pointer {} outside stack",
                frame
            ))),
        }
    }

    fn local_index(&self, blocks_down: i32, slot: i32) -> Result<usize, SysError> {
        let mut frame = self
            .frame
            .ok_or_else(|| SysError::FrameCorrupt("local access without a frame".to_string()))?;
        for _ in 0..blocks_down {
            frame = self.saved_pointer(frame)?.ok_or_else(|| {
                SysError::FrameCorrupt(format!("no frame {} blocks down", blocks_down))
            })?;
        }
        let index = frame + slot.max(0) as usize;
        if slot < 1 || index >= self.values.len() {
            return Err(SysError::FrameCorrupt(format!("no local {} in frame", slot)));
        }
        Ok(index)
    }

    pub fn get_local(&self, blocks_down: i32, slot: i32) -> Result<i32, SysError> {
        match &self.values[self.local_index(blocks_down, slot)?] {
            Value::Int(i) => Ok(*i),
            other => Err(SysError::TypeMismatch("integer", other.type_name())),
        }
    }

    pub fn set_local(&mut self, blocks_down: i32, slot: i32, value: i32) -> Result<(), SysError> {
        let index = self.local_index(blocks_down, slot)?;
        self.values[index] = Value::Int(value);
        Ok(())
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if Some(i) == self.frame {
                write!(f, "|")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}
