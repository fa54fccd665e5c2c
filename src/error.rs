// Interpreter Error Handling

use crate::host::HostError;
use std::fmt;
use std::io;

/// Fatal interpreter errors.
///
/// These indicate malformed bytecode or a broken game image, never something
/// the player did. They are reported once through the interpreter's
/// system-error hook and abort the command being executed.
#[derive(Debug, Clone, PartialEq)]
pub enum SysError {
    // Bytecode errors
    UnknownInstruction(u32, usize), // raw word, address
    UnknownVariable(u32, usize),
    OutsideProgram(usize),
    Recursion(usize),
    CallStackTooDeep(usize),

    // Stack errors
    StackUnderflow,
    StackOverflow(usize),
    TypeMismatch(&'static str, &'static str), // expected, found
    FrameCorrupt(String),

    // World errors
    IllegalInstance(i32, &'static str), // instance, action
    AttributeNotFound(i32, i32),        // instance, attribute
    ContainmentLoop(i32, i32), // instance, destination
    DivisionByZero,
    NoSuchEvent(i32),
    NoSuchScore(i32),
    NoSuchScript(i32),
    IndexOutOfRange(String),

    // Image errors
    MissingTerminator(&'static str),
    UnbalancedBlock(&'static str, usize),
    Image(String),

    // Output to the host failed
    Host(String),
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SysError::UnknownInstruction(word, addr) => {
                write!(f, "Unknown instruction 0x{:08x} at address {}", word, addr)
            }
            SysError::UnknownVariable(var, addr) => {
                write!(f, "Unknown CURVAR instruction {} at address {}", var, addr)
            }
            SysError::OutsideProgram(addr) => {
                write!(f, "Interpreting outside program at address {}", addr)
            }
            SysError::Recursion(addr) => {
                write!(f, "Interpreter recursion at address {}", addr)
            }
            SysError::CallStackTooDeep(depth) => {
                write!(f, "Interpreter call stack too deep ({})", depth)
            }
            SysError::StackUnderflow => write!(f, "Stack underflow"),
            SysError::StackOverflow(size) => write!(f, "Stack overflow ({} values)", size),
            SysError::TypeMismatch(expected, found) => {
                write!(f, "Stack type mismatch: expected {}, found {}", expected, found)
            }
            SysError::FrameCorrupt(msg) => write!(f, "Corrupt frame linkage: {}", msg),
            SysError::IllegalInstance(id, action) => {
                write!(f, "Can't {} instance ({})", action, id)
            }
            SysError::AttributeNotFound(id, atr) => {
                write!(f, "Attribute {} not found for instance {}", atr, id)
            }
            SysError::ContainmentLoop(id, whr) => write!(
                f,
                "Locating instance {} in {} would create a containment loop",
                id, whr
            ),
            SysError::DivisionByZero => write!(f, "Division by zero"),
            SysError::NoSuchEvent(event) => write!(f, "No such event ({})", event),
            SysError::NoSuchScore(score) => write!(f, "No such score entry ({})", score),
            SysError::NoSuchScript(script) => write!(f, "Unknown actor script ({})", script),
            SysError::IndexOutOfRange(msg) => write!(f, "Index out of range: {}", msg),
            SysError::MissingTerminator(table) => {
                write!(f, "Table '{}' is missing its end-of-table marker", table)
            }
            SysError::UnbalancedBlock(kind, addr) => {
                write!(f, "Unbalanced {} block at address {}", kind, addr)
            }
            SysError::Image(msg) => write!(f, "Game image error: {}", msg),
            SysError::Host(msg) => write!(f, "Host failure: {}", msg),
        }
    }
}

impl std::error::Error for SysError {}

impl From<HostError> for SysError {
    fn from(error: HostError) -> Self {
        SysError::Host(error.message)
    }
}

/// Save and restore failures. The game continues after one of these.
#[derive(Debug)]
pub enum SaveError {
    Io(io::Error),
    UnexpectedEof(&'static str),
    Format(String),
    Mismatch(&'static str, usize, usize), // what, expected, found
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {}", e),
            SaveError::UnexpectedEof(section) => {
                write!(f, "Unexpected end of file while reading {}", section)
            }
            SaveError::Format(msg) => write!(f, "Not a valid save file: {}", msg),
            SaveError::Mismatch(what, expected, found) => write!(
                f,
                "Save file does not match this game: expected {} {}, found {}",
                expected, what, found
            ),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<io::Error> for SaveError {
    fn from(error: io::Error) -> Self {
        SaveError::Io(error)
    }
}

impl From<SaveError> for String {
    fn from(error: SaveError) -> String {
        error.to_string()
    }
}
