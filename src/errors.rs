//! Structured compiler diagnostics.
//!
//! [`CompileError`] is the typed error surfaced at the CLI boundary,
//! grouped into four kinds: lexical, syntax, semantic, and I/O.

use std::fmt;
use std::path::PathBuf;

/// A single line (1-indexed) in the source file, with an optional column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: Option<usize>,
}

impl SourceLocation {
    pub fn new(line: usize) -> Self {
        SourceLocation { line, column: None }
    }

    pub fn with_column(line: usize, column: usize) -> Self {
        SourceLocation {
            line,
            column: Some(column),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "line {}, col {}", self.line, col),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[derive(Debug)]
pub enum CompileError {
    Lexical {
        message: String,
        location: Option<SourceLocation>,
    },
    Syntax {
        message: String,
        location: Option<SourceLocation>,
    },
    Semantic {
        message: String,
        location: Option<SourceLocation>,
    },
    Io {
        message: String,
        path: Option<PathBuf>,
    },
}

impl CompileError {
    pub fn lexical(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        CompileError::Lexical {
            message: message.into(),
            location,
        }
    }

    pub fn syntax(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        CompileError::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn semantic(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        CompileError::Semantic {
            message: message.into(),
            location,
        }
    }

    pub fn io(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        CompileError::Io {
            message: message.into(),
            path,
        }
    }

    /// Promote a semantic-pass string error (the convention used internally
    /// by the memory manager, analyzer, and code generator) into a located
    /// `CompileError::Semantic`.
    pub fn from_semantic_str(message: String, location: Option<SourceLocation>) -> Self {
        CompileError::semantic(message, location)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lexical { message, location } => {
                write_located(f, location, "Lexical", message)
            }
            CompileError::Syntax { message, location } => {
                write_located(f, location, "Syntax", message)
            }
            CompileError::Semantic { message, location } => {
                write_located(f, location, "Semantic", message)
            }
            CompileError::Io { message, path } => match path {
                Some(p) => write!(f, "Io: {} ({})", message, p.display()),
                None => write!(f, "Io: {}", message),
            },
        }
    }
}

fn write_located(
    f: &mut fmt::Formatter<'_>,
    location: &Option<SourceLocation>,
    kind: &str,
    message: &str,
) -> fmt::Result {
    match location {
        Some(loc) => write!(f, "{}: {}: {}", loc, kind, message),
        None => write!(f, "{}: {}", kind, message),
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::io(e.to_string(), None)
    }
}
