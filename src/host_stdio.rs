//! Terminal and filesystem host

use crate::host::{Host, HostError};
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

pub struct StdioHost {
    interactive: bool,
}

impl StdioHost {
    pub fn new() -> Self {
        StdioHost {
            interactive: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

impl Default for StdioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StdioHost {
    fn read_line(&mut self) -> Result<Option<String>, HostError> {
        let mut out = io::stdout();
        out.write_all(b"\n> ")?;
        out.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !self.interactive {
            // Echo piped input so transcripts read naturally
            out.write_all(line.as_bytes())?;
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn print(&mut self, text: &str) -> Result<(), HostError> {
        let mut out = io::stdout();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn more(&mut self) -> Result<(), HostError> {
        if !self.interactive {
            return Ok(());
        }
        self.print("<More>")?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }

    fn create_save(&mut self, name: &str) -> Result<Box<dyn Write + '_>, HostError> {
        debug!("Creating save file {}", name);
        let file = File::create(name)
            .map_err(|e| HostError::new(format!("Cannot create '{}': {}", name, e)))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn open_save(&mut self, name: &str) -> Result<Box<dyn Read + '_>, HostError> {
        debug!("Opening save file {}", name);
        let file = File::open(name)
            .map_err(|e| HostError::new(format!("Cannot open '{}': {}", name, e)))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
