//! Circuit element graph, block translation and validation.
//!
//! This module provides the in-memory model every other part of the crate
//! works on. A [`Circuit`] is an arena of elements (pins, wires, signals,
//! tags, gates, timers and containers) addressed by [`ElementId`] handles.

mod graph;
mod translate;
mod types;
mod validate;

pub use graph::{
    Circuit, Connection, Element, ElementKind, GateKind, MemoryKind, PinData, SignalData,
    TagData, TimerData, TimerKind, WireData,
};
pub use translate::{translate, BlockType, DEFAULT_SOLUTION};
pub use types::*;
pub use validate::validate_circuit;
