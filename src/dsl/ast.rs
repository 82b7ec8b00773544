//! Abstract Syntax Tree types for the block language.

use std::collections::{BTreeMap, HashMap};

use crate::circuit::TriState;

/// Complete AST representation of a parsed block diagram.
#[derive(Debug, Clone)]
pub struct CircuitAst {
    /// Solution name (from `.solution`)
    pub solution: Option<String>,
    /// Tag declarations
    pub tags: Vec<TagDef>,
    /// Contexts, each holding blocks and wires
    pub contexts: Vec<ContextDef>,
}

impl CircuitAst {
    /// Create a new empty AST.
    pub fn new() -> Self {
        Self {
            solution: None,
            tags: Vec::new(),
            contexts: Vec::new(),
        }
    }

    /// Total number of blocks across all contexts.
    pub fn block_count(&self) -> usize {
        self.contexts.iter().map(|c| c.blocks.len()).sum()
    }
}

impl Default for CircuitAst {
    fn default() -> Self {
        Self::new()
    }
}

/// A `.tag` declaration.
#[derive(Debug, Clone)]
pub struct TagDef {
    pub name: String,
    /// Initial cell value
    pub initial: TriState,
    /// `key=value` properties
    pub properties: BTreeMap<String, String>,
    pub line: usize,
}

/// A context and its content.
#[derive(Debug, Clone)]
pub struct ContextDef {
    /// Owning project name
    pub project: String,
    pub name: String,
    pub blocks: Vec<BlockDef>,
    pub wires: Vec<WireDef>,
    pub line: usize,
}

impl ContextDef {
    pub fn new(project: impl Into<String>, name: impl Into<String>, line: usize) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            blocks: Vec::new(),
            wires: Vec::new(),
            line,
        }
    }
}

/// A diagram block, kept with its raw kind name; the translator decides
/// whether the kind is known.
#[derive(Debug, Clone)]
pub struct BlockDef {
    /// Kind name as written (`SIGNAL`, `AND`, `TIMER-ON`, ...)
    pub kind: String,
    /// Unique block name within its context
    pub name: String,
    /// Positional numeric value (timer delay in seconds)
    pub value: Option<f64>,
    /// Positional identifier (signal tag)
    pub tag_ref: Option<String>,
    /// `key=value` parameters
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

/// A wire between two connection points.
#[derive(Debug, Clone)]
pub struct WireDef {
    pub start: PointRef,
    pub end: PointRef,
    pub line: usize,
}

/// Reference to a connection point: `block:point`, or a bare relay pin name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRef {
    pub block: String,
    pub point: Option<String>,
    /// Endpoint carries an inversion marker
    pub inverted: bool,
}
