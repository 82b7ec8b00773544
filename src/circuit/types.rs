//! Core types for circuit representation.

use std::fmt;
use std::ops::Not;

/// A stable handle to an element in the circuit arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Direction of a pin, inferred during compilation for most pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Not yet inferred (or unreachable from any signal)
    #[default]
    Undefined,
    /// Consumes a value
    Input,
    /// Produces a value
    Output,
}

/// Three-valued boolean used for every simulated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriState {
    True,
    False,
    /// Undriven or indeterminate
    #[default]
    Unknown,
}

impl TriState {
    /// Whether the value is defined (not [`TriState::Unknown`]).
    pub fn is_known(self) -> bool {
        !matches!(self, TriState::Unknown)
    }

    /// Convert to an optional boolean.
    pub fn to_option(self) -> Option<bool> {
        match self {
            TriState::True => Some(true),
            TriState::False => Some(false),
            TriState::Unknown => None,
        }
    }

    /// Apply an inversion flag; unknown stays unknown.
    pub fn invert_if(self, inverted: bool) -> Self {
        if inverted {
            !self
        } else {
            self
        }
    }

    /// Kleene conjunction: false dominates, otherwise unknown is contagious.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, TriState::True) => TriState::True,
            _ => TriState::Unknown,
        }
    }

    /// Kleene disjunction: true dominates, otherwise unknown is contagious.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Unknown,
        }
    }

    /// Parse `true`/`false`/`unknown` (also `1`/`0`/`x`), case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(TriState::True),
            "false" | "0" | "off" => Some(TriState::False),
            "unknown" | "x" | "?" => Some(TriState::Unknown),
            _ => None,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(TriState::from).unwrap_or(TriState::Unknown)
    }
}

impl Not for TriState {
    type Output = TriState;

    fn not(self) -> TriState {
        match self {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::True => write!(f, "true"),
            TriState::False => write!(f, "false"),
            TriState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reference back to the diagram block an element was translated from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockRef {
    /// Block name as written in the diagram
    pub name: String,
    /// Source line (0 when the element did not come from text)
    pub line: usize,
}

impl BlockRef {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}@{}", self.name, self.line)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Diagram position of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Fixed-order connection points of gates and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePoint {
    Left = 0,
    Right = 1,
    Top = 2,
    Bottom = 3,
}

impl GatePoint {
    pub const ALL: [GatePoint; 4] = [
        GatePoint::Left,
        GatePoint::Right,
        GatePoint::Top,
        GatePoint::Bottom,
    ];

    /// Parse a point name or index (`left`, `0`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "l" | "0" => Some(GatePoint::Left),
            "right" | "r" | "1" => Some(GatePoint::Right),
            "top" | "t" | "2" => Some(GatePoint::Top),
            "bottom" | "b" | "3" => Some(GatePoint::Bottom),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Connection points of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalPoint {
    Input = 0,
    Output = 1,
}

impl SignalPoint {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "in" | "input" | "0" => Some(SignalPoint::Input),
            "out" | "output" | "1" => Some(SignalPoint::Output),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}
