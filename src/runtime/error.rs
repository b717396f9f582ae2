//! Error types of the host engine.

use crate::runtime::unit::UnitId;
use thiserror::Error;

/// Error raised while lexing, parsing or compiling source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("name '{0}' is not defined")]
    Name(String),

    #[error("local variable '{0}' referenced before assignment")]
    UnboundLocal(String),

    #[error("{0}")]
    Type(String),

    #[error("division by zero")]
    ZeroDivision,

    #[error("integer overflow")]
    Overflow,

    #[error("index {index} out of range for length {len}")]
    Index { index: i64, len: usize },

    #[error("{name}() takes {expected} argument(s) but {given} were given")]
    Arity {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("sequence of {len} items exceeds the limit of {limit}")]
    TooLarge { len: usize, limit: usize },

    #[error("maximum call depth of {0} exceeded")]
    Recursion(usize),

    #[error("malformed unit '{unit}': {detail}")]
    Malformed { unit: String, detail: String },

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("execution halted")]
    Halted,
}

/// One entry of a traceback, root frame first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub unit: UnitId,
    pub name: String,
    pub filename: String,
    pub offset: usize,
    /// Line reported by the instruction at `offset`.
    pub line: u32,
}

/// Error that unwound out of the engine, with the frames it crossed.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub traceback: Vec<TraceEntry>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            traceback: Vec::new(),
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.kind, ErrorKind::Halted)
    }

    /// Render the traceback, mapping each entry's line through `resolve`.
    pub fn render_traceback(&self, resolve: impl Fn(&TraceEntry) -> u32) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for entry in &self.traceback {
            out.push_str(&format!(
                "  File \"{}\", line {}, in {}\n",
                entry.filename,
                resolve(entry),
                entry.name
            ));
        }
        out.push_str(&format!("Error: {}", self.kind));
        out
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
