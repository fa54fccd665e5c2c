//! Messages printed to the player by the interpreter itself

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    NotUnderstood,
    UnknownWord(String),
    UnterminatedString,
    CantUndo,
    Undone(String),
    NoUndo,
    Saved(String),
    SaveFailed(String),
    Restored(String),
    RestoreFailed(String),
    Score(i32, i32),
    SystemError(String),
    Goodbye,
}

impl fmt::Display for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Msg::NotUnderstood => write!(f, "I don't understand."),
            Msg::UnknownWord(word) => write!(f, "I don't know the word '{}'.", word),
            Msg::UnterminatedString => write!(f, "The quoted text has no closing quote."),
            Msg::CantUndo => write!(f, "There is nothing to undo."),
            Msg::Undone(command) => write!(f, "'{}' undone.", command),
            Msg::NoUndo => write!(f, "Undo is turned off."),
            Msg::Saved(name) => write!(f, "Game saved to '{}'.", name),
            Msg::SaveFailed(reason) => write!(f, "Save failed: {}", reason),
            Msg::Restored(name) => write!(f, "Game restored from '{}'.", name),
            Msg::RestoreFailed(reason) => write!(f, "Restore failed: {}", reason),
            Msg::Score(score, max) => {
                write!(f, "You have scored {} points out of {}.", score, max)
            }
            Msg::SystemError(message) => write!(f, "SYSTEM ERROR: {}", message),
            Msg::Goodbye => write!(f, "Goodbye."),
        }
    }
}
