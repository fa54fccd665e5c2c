use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Interpreter options, read from a TOML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Log every executed instruction at trace level
    pub trace_instructions: bool,
    /// Log the operand stack after every instruction
    pub trace_stack: bool,
    /// Keep snapshots so commands can be undone
    pub undo: bool,
    /// Seed for a predictable random generator
    pub random_seed: Option<u64>,
    pub save_extension: String,
    /// Lines printed between MORE pauses, 0 for never
    pub more_lines: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            trace_instructions: false,
            trace_stack: false,
            undo: true,
            random_seed: None,
            save_extension: default_save_extension(),
            more_lines: 0,
        }
    }
}

fn default_save_extension() -> String {
    "sav".to_string()
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Invalid configuration: {}", e))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read configuration '{}': {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_missing_keys_take_defaults() {
        let options = Options::from_toml_str("more_lines = 20\n").unwrap();
        assert_eq!(options.more_lines, 20);
        assert!(options.undo);
        assert_eq!(options.save_extension, "sav");
        assert_eq!(options.random_seed, None);
        assert_eq!(Options::from_toml_str("").unwrap(), Options::default());
    }

    #[test]
    fn test_all_keys() {
        let options = Options::from_toml_str(
            r#"
trace_instructions = true
trace_stack = true
undo = false
random_seed = 42
save_extension = "a3s"
more_lines = 0
"#,
        )
        .unwrap();
        assert!(options.trace_instructions);
        assert!(options.trace_stack);
        assert!(!options.undo);
        assert_eq!(options.random_seed, Some(42));
        assert_eq!(options.save_extension, "a3s");
    }

    #[test]
    fn test_bad_value_is_an_error() {
        assert!(Options::from_toml_str("undo = \"yes\"").is_err());
        assert!(Options::load("/nonexistent/lantern.toml").is_err());
    }
}
