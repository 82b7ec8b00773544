//! Cycle-based simulation.
//!
//! [`Simulator`] steps a compiled circuit synchronously; [`Runtime`] drives
//! one from a background thread in real time.

mod clock;
mod runtime;
mod simulator;

pub use clock::Clock;
pub use runtime::{Runtime, StateSink};
pub use simulator::{Simulator, SimulatorConfig, StateChange};

/// Default cycle length in milliseconds.
pub const DEFAULT_RESOLUTION_MS: u32 = 10;
