//! Headless host for testing and scripted runs
//!
//! Input comes from a script of lines, output is collected in memory and
//! save files live in a map keyed by file name.

use crate::host::{Host, HostError};
use indexmap::IndexMap;
use log::debug;
use std::collections::VecDeque;
use std::io::{Read, Write};

#[derive(Debug, Default)]
pub struct HeadlessHost {
    input: VecDeque<String>,
    buffer: Vec<String>,
    current_line: String,
    files: IndexMap<String, Vec<u8>>,
    more_count: usize,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that will answer `read_line` with these lines, in order
    pub fn with_script(lines: &[&str]) -> Self {
        let mut host = Self::new();
        for line in lines {
            host.push_input(line);
        }
        host
    }

    pub fn push_input(&mut self, line: &str) {
        self.input.push_back(line.to_string());
    }

    /// Completed output lines
    pub fn get_buffer(&self) -> &[String] {
        &self.buffer
    }

    /// All output as a single string
    pub fn get_output(&self) -> String {
        let mut output = self.buffer.join("\n");
        if !self.current_line.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.current_line);
        }
        output
    }

    pub fn clear_output(&mut self) {
        self.buffer.clear();
        self.current_line.clear();
    }

    pub fn more_count(&self) -> usize {
        self.more_count
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(|f| f.as_slice())
    }

    pub fn put_file(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(name.to_string(), data);
    }

    fn flush_line(&mut self) {
        self.buffer.push(std::mem::take(&mut self.current_line));
    }
}

impl Host for HeadlessHost {
    fn read_line(&mut self) -> Result<Option<String>, HostError> {
        let line = self.input.pop_front();
        if let Some(ref text) = line {
            debug!("Headless: read_line -> '{}'", text);
        }
        Ok(line)
    }

    fn print(&mut self, text: &str) -> Result<(), HostError> {
        let lines: Vec<&str> = text.split('\n').collect();
        for (i, line) in lines.iter().enumerate() {
            self.current_line.push_str(line);
            if i < lines.len() - 1 {
                self.flush_line();
            }
        }
        Ok(())
    }

    fn more(&mut self) -> Result<(), HostError> {
        self.more_count += 1;
        Ok(())
    }

    fn create_save(&mut self, name: &str) -> Result<Box<dyn Write + '_>, HostError> {
        debug!("Headless: create_save('{}')", name);
        let file = self.files.entry(name.to_string()).or_default();
        file.clear();
        Ok(Box::new(file))
    }

    fn open_save(&mut self, name: &str) -> Result<Box<dyn Read + '_>, HostError> {
        debug!("Headless: open_save('{}')", name);
        match self.files.get(name) {
            Some(file) => Ok(Box::new(file.as_slice())),
            None => Err(HostError::new(format!("No such file: {}", name))),
        }
    }
}
