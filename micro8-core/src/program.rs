use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("cannot open program {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProgramError>;

// The built-in demonstration program.
const DEMO: [u8; 6] = [
    0b1000_0010, // LDI R0,8
    0b0000_0000,
    0b0000_1000,
    0b0100_0111, // PRN R0
    0b0000_0000,
    0b0000_0001, // HLT
];

/// A program image, ready to be placed in memory at address 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    /// The fallback when no source file is named: load 8 into R0, print it,
    /// halt.
    pub fn demo() -> Self {
        Program {
            bytes: DEMO.to_vec(),
        }
    }

    /// Loads a line-oriented text source: one binary literal per line,
    /// everything from `#` to end of line stripped, blank lines skipped.
    /// Lines that do not parse as a binary literal are skipped, not fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| ProgramError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_source(&source))
    }

    pub fn from_source(source: &str) -> Self {
        let mut bytes = Vec::new();
        for (line_no, line) in source.lines().enumerate() {
            let text = match line.split_once('#') {
                Some((code, _comment)) => code,
                None => line,
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match u8::from_str_radix(text, 2) {
                Ok(byte) => bytes.push(byte),
                Err(_) => {
                    tracing::warn!("line {}: not a binary literal, skipped: {text:?}", line_no + 1);
                }
            }
        }
        Program { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
