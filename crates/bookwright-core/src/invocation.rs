//! The interpreter command line for an example.
//!
//! The validator, both packaged runner scripts and the text page all build
//! their command lines from [`Invocation`], so an example is always run the
//! same way it was validated.

use std::fmt;

use crate::example::Example;

/// File name of the packaged script document.
pub const SCRIPT_FILE: &str = "script.json";
/// File name of the packaged input document.
pub const INPUT_FILE: &str = "input.json";
/// File name of the packaged expected-output document.
pub const EXPECTED_FILE: &str = "expected.json";
/// File name of the packaged metadata document.
pub const METADATA_FILE: &str = "metadata.json";

/// `program [flags...] script [input]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub flags: Vec<String>,
    pub script: String,
    pub input: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, flags: &[String], script: impl Into<String>, input: Option<String>) -> Self {
        Self {
            program: program.into(),
            flags: flags.to_vec(),
            script: script.into(),
            input,
        }
    }

    /// Invocation against the packaged files of an example directory.
    pub fn packaged(program: &str, example: &Example) -> Self {
        Self::new(
            program,
            &example.cli_flags,
            SCRIPT_FILE,
            example.has_input().then(|| INPUT_FILE.to_string()),
        )
    }

    /// Arguments after the program, in order.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        args.push(self.script.clone());
        if let Some(input) = &self.input {
            args.push(input.clone());
        }
        args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
