//! Error types for the logic simulator.
//!
//! This module provides a unified error type [`LogicSimError`] that covers
//! all error conditions that can occur during block-language parsing,
//! translation, netlist decoding, compilation and simulation.

use thiserror::Error;

use crate::circuit::ElementId;

/// Result type alias using [`LogicSimError`].
pub type Result<T> = std::result::Result<T, LogicSimError>;

/// Unified error type for all logic simulator operations.
#[derive(Error, Debug)]
pub enum LogicSimError {
    // ============ Block Language Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    // ============ Translation Errors ============
    /// Block name not recognized by the translator
    #[error("Unknown block kind '{kind}' at line {line}")]
    UnknownBlockKind { kind: String, line: usize },

    /// Block definition that cannot be translated
    #[error("Invalid block '{name}' at line {line}: {message}")]
    InvalidBlock {
        name: String,
        line: usize,
        message: String,
    },

    /// Reference to a tag that was never declared
    #[error("Undefined tag '{tag}' referenced by '{block}'")]
    UndefinedTag { tag: String, block: String },

    /// Wire endpoint that names no block or relay pin
    #[error("Undefined connection point '{point}' at line {line}")]
    UndefinedPoint { point: String, line: usize },

    /// Duplicate block name within a context
    #[error("Duplicate block name '{name}'")]
    DuplicateBlock { name: String },

    /// Duplicate tag name within a solution
    #[error("Duplicate tag name '{name}'")]
    DuplicateTag { name: String },

    // ============ Graph Errors ============
    /// Handle not present in the element arena
    #[error("Element {id} not found")]
    ElementNotFound { id: ElementId },

    /// Element has the wrong kind for the requested operation
    #[error("Element {id} is not a {expected}")]
    WrongElementKind { id: ElementId, expected: &'static str },

    /// Structural inconsistency in the graph
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Netlist Codec Errors ============
    /// Command id not understood by the decoder
    #[error("Unsupported netlist command {command} at byte offset {offset}")]
    UnsupportedCommand { command: u16, offset: u64 },

    /// Stream ended in the middle of a record or is otherwise malformed
    #[error("Malformed netlist: {message}")]
    MalformedNetlist { message: String },

    /// Record references a sequence id that was not assigned earlier
    #[error("Netlist record {record} references unknown id {reference}")]
    UnknownReference { record: u32, reference: u32 },

    // ============ Compile / Simulation Errors ============
    /// Clock resolution must be positive
    #[error("Invalid clock resolution {resolution_ms} ms (must be > 0)")]
    InvalidResolution { resolution_ms: u32 },

    /// A strategy found no usable binding at compile time
    #[error("Element {element} has no valid binding: {message}")]
    Unbound { element: ElementId, message: String },

    /// Strategy kind without an implementation
    #[error("Element {element}: {operation} is not supported for {kind}")]
    Unsupported {
        element: ElementId,
        kind: &'static str,
        operation: &'static str,
    },

    /// Tag lookup by name failed
    #[error("Tag '{name}' not found")]
    TagNotFound { name: String },

    /// Runtime misuse (start twice, lock poisoned, ...)
    #[error("Runtime error: {message}")]
    RuntimeError { message: String },

    // ============ Configuration / I/O Errors ============
    /// Error parsing a configuration file
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Error reading a circuit file
    #[error("Failed to read circuit file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error while encoding or decoding
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogicSimError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid block error
    pub fn invalid_block(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidBlock {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an unbound-strategy error
    pub fn unbound(element: ElementId, message: impl Into<String>) -> Self {
        Self::Unbound {
            element,
            message: message.into(),
        }
    }

    /// Create a malformed netlist error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedNetlist {
            message: message.into(),
        }
    }

    /// Create a topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }
}
