use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::SysError;

/// "LNTN"
pub const MAGIC: u32 = 0x4C4E_544E;
pub const VERSION: u32 = 1;
/// Number of words in the image header
pub const HEADER_WORDS: usize = 20;

/// Image header. Table fields are word addresses into the image; block
/// fields are addresses relative to the start of the code area.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub version: u32,
    pub instance_max: usize,
    pub dictionary: usize,
    pub syntax_table: usize,
    pub instance_table: usize,
    pub set_init_table: usize,
    pub string_init_table: usize,
    pub verb_table: usize,
    pub event_table: usize,
    pub score_table: usize,
    pub maximum_score: i32,
    pub text_area: usize,
    pub code_start: usize,
    pub code_size: usize,
    pub start_block: usize,
    pub hero: usize,
    pub class_table: usize,
    pub exit_table: usize,
    pub script_table: usize,
}

impl Header {
    pub fn new(words: &[u32]) -> Result<Header, SysError> {
        if words.len() < HEADER_WORDS {
            return Err(SysError::Image(format!(
                "image of {} words is too short for a header",
                words.len()
            )));
        }
        if words[0] != MAGIC {
            return Err(SysError::Image(format!(
                "bad magic 0x{:08x}, not a game image",
                words[0]
            )));
        }
        if words[1] != VERSION {
            return Err(SysError::Image(format!(
                "unsupported image version {}",
                words[1]
            )));
        }
        let header = Header {
            version: words[1],
            instance_max: words[2] as usize,
            dictionary: words[3] as usize,
            syntax_table: words[4] as usize,
            instance_table: words[5] as usize,
            set_init_table: words[6] as usize,
            string_init_table: words[7] as usize,
            verb_table: words[8] as usize,
            event_table: words[9] as usize,
            score_table: words[10] as usize,
            maximum_score: words[11] as i32,
            text_area: words[12] as usize,
            code_start: words[13] as usize,
            code_size: words[14] as usize,
            start_block: words[15] as usize,
            hero: words[16] as usize,
            class_table: words[17] as usize,
            exit_table: words[18] as usize,
            script_table: words[19] as usize,
        };
        if header.code_start + header.code_size > words.len() {
            return Err(SysError::Image(format!(
                "code area {}+{} outside image of {} words",
                header.code_start,
                header.code_size,
                words.len()
            )));
        }
        Ok(header)
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Image version:            {}
Instances:                {}
Hero:                     {}
Maximum score:            {}
Dictionary address:       {:#06x}
Syntax table address:     {:#06x}
Instance table address:   {:#06x}
Set init address:         {:#06x}
String init address:      {:#06x}
Verb table address:       {:#06x}
Event table address:      {:#06x}
Score table address:      {:#06x}
Class table address:      {:#06x}
Exit table address:       {:#06x}
Script table address:     {:#06x}
Text area address:        {:#06x}
Code area:                {:#06x} ({} words)
Start block:              {:#06x}
",
            self.version,
            self.instance_max,
            self.hero,
            self.maximum_score,
            self.dictionary,
            self.syntax_table,
            self.instance_table,
            self.set_init_table,
            self.string_init_table,
            self.verb_table,
            self.event_table,
            self.score_table,
            self.class_table,
            self.exit_table,
            self.script_table,
            self.text_area,
            self.code_start,
            self.code_size,
            self.start_block,
        )
    }
}
