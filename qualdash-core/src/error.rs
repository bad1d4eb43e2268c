//! Engine error taxonomy
//!
//! Errors raised by the pure transforms. Missing files and I/O failures are
//! reported by the store layer through `anyhow` with the offending path as
//! context; everything here is about the data itself.

/// Data-integrity and request errors produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Component string without the `<project>:<path>` separator
    #[error("malformed component {component:?}: missing ':' separator")]
    MalformedComponent { component: String },

    /// Issue or flow location pointing outside the analysed file
    #[error("line {line} is outside the file (0..{line_count})")]
    LineOutOfRange { line: u32, line_count: usize },

    /// Upstream record that does not have the shape of an issue
    #[error("malformed issue record: {0}")]
    MalformedIssue(String),

    /// Issue without an anchor line and without flows to place it by
    #[error("issue has no line and no flow locations")]
    MissingAnchorLine,

    /// Adjacent version pair with no entry in the version-diff table
    #[error("no issue diff recorded for adjacent versions {key:?}")]
    DiffEntryMissing { key: String },

    /// Version with no entry in the tag collection
    #[error("no tag collection recorded for version {version:?}")]
    TagEntryMissing { version: String },

    /// Caller-supplied identifier that cannot address the data directory
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
