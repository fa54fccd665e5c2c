//! Host capability used by the interpreter for all outside I/O
//!
//! The interpreter never touches the terminal or the filesystem directly.
//! Line input, output, MORE pauses and save files all go through this trait.

use std::fmt;
use std::io::{Read, Write};

pub trait Host {
    /// Read one command line. `None` means end of input.
    fn read_line(&mut self) -> Result<Option<String>, HostError>;

    /// Print text; `\n` ends a line
    fn print(&mut self, text: &str) -> Result<(), HostError>;

    /// Pause output until the player has seen it
    fn more(&mut self) -> Result<(), HostError>;

    /// Open a save file for writing, replacing any previous content
    fn create_save(&mut self, name: &str) -> Result<Box<dyn Write + '_>, HostError>;

    /// Open an existing save file for reading
    fn open_save(&mut self, name: &str) -> Result<Box<dyn Read + '_>, HostError>;
}

/// Host error type
#[derive(Debug, Clone)]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host error: {}", self.message)
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", error))
    }
}

impl From<HostError> for String {
    fn from(error: HostError) -> String {
        error.message
    }
}
