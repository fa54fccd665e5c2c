#![crate_name = "lantern"]

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod dictionary;
pub mod error;
pub mod game;
pub mod header;
pub mod host;
pub mod host_headless;
pub mod host_stdio;
pub mod iff;
pub mod instruction;
pub mod interpreter;
pub mod msg;
pub mod opcode_tables;
pub mod parser;
pub mod save;
pub mod set;
pub mod stack;
pub mod state;
pub mod syntax;
pub mod text;
pub mod vm;
pub mod world;
pub mod zrand;

/*
Layout of a game image, in words
        0       header (17 words)
                dictionary records and reference lists
                grammar: syntaxes and element lists
                instances and their attribute blocks
                set and string init tables
                verbs, events, scores
                text area
                code area
*/
