//! # LogicSim Core
//!
//! A cycle-based simulator for relay-logic circuit diagrams.
//!
//! This library provides:
//! - A line-oriented block language for describing diagrams
//! - An element graph of signals, tags, gates, timers, relay pins and wires
//! - A compiler that infers pin directions, collapses relay chains and
//!   orders evaluation by dependency
//! - Three-valued (true / false / unknown) evaluation, stepped
//!   synchronously or driven in real time from a background thread
//! - A compact binary netlist format
//!
//! ## Architecture
//!
//! - [`dsl`] - Lexer and parser for the block language
//! - [`circuit`] - Element graph, block translation and validation
//! - [`components`] - Evaluation strategies (pass-through, gates, timers)
//! - [`compiler`] - Direction and connection resolution, ordering
//! - [`sim`] - Clock, synchronous simulator and real-time runtime
//! - [`codec`] - Binary netlist reader and writer
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! logicsim plant.lgc --set Start=true --cycles 200
//! logicsim plant.lgc --emit-netlist plant.lgn
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use logicsim_core::{load_circuit, Simulator, TriState};
//!
//! let circuit = load_circuit("plant.lgc")?;
//! let mut sim = Simulator::new(circuit);
//! sim.set_tag("Start", TriState::True)?;
//! for change in sim.run(100)? {
//!     println!("{:?} = {}", change.block, change.value);
//! }
//! # Ok::<(), logicsim_core::LogicSimError>(())
//! ```
//!
//! ## Evaluation
//!
//! Each cycle advances the clock by one resolution step and calculates every
//! compiled strategy once, upstream before downstream. Values are Kleene
//! tri-state: unknown inputs yield unknown outputs unless the result is
//! already decided (`false ∧ x = false`, `true ∨ x = true`).

use std::path::Path;

pub mod circuit;
pub mod codec;
pub mod compiler;
pub mod components;
pub mod dsl;
pub mod error;
pub mod sim;

// Re-export main types for convenience
pub use circuit::{Circuit, ElementId, TriState};
pub use compiler::{Compiler, Plan};
pub use error::{LogicSimError, Result};
pub use sim::{Runtime, Simulator, SimulatorConfig, StateChange, DEFAULT_RESOLUTION_MS};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmLogicSim;

/// File extension of binary netlists.
pub const NETLIST_EXTENSION: &str = "lgn";

/// Load a circuit from a block-language file, or from a binary netlist if
/// the extension is [`NETLIST_EXTENSION`].
pub fn load_circuit<P: AsRef<Path>>(path: P) -> Result<Circuit> {
    let path = path.as_ref();
    let is_netlist = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(NETLIST_EXTENSION))
        .unwrap_or(false);
    if is_netlist {
        codec::read_file(path)
    } else {
        circuit::translate(&dsl::parse_file(path)?)
    }
}
