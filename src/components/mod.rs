//! Simulation strategies, one per element kind.
//!
//! This module provides the evaluation models for every simulation-capable
//! element:
//! - Pass-through: Tag, tag-less Signal
//! - Combinational: AND, OR gates
//! - Timers: on-delay, off-delay, pulse
//! - Memory latches (declared, not implemented)
//!
//! Each strategy follows the same lifecycle: [`Strategy::reset`] clears
//! bindings and state, [`Strategy::compile`] binds the upstream outputs
//! reachable from the element's input pins, and [`Strategy::calculate`]
//! produces the element's tri-state value for one cycle.

mod gate;
mod memory;
mod tag;
mod timer;

pub use gate::{Gate, GateOp};
pub use memory::MemoryLatch;
pub use tag::PassThrough;
pub use timer::{OffDelay, OnDelay, Pulse};

use std::collections::HashMap;

use crate::circuit::{Circuit, Direction, Element, ElementId, ElementKind, MemoryKind, TriState};
use crate::error::Result;
use crate::sim::Clock;

/// An upstream value a strategy reads each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Slot of the strategy producing the value
    pub source: usize,
    /// Whether the value is inverted before use
    pub inverted: bool,
}

impl Binding {
    /// Read the bound value from the plan's state cells.
    pub fn read(&self, states: &[TriState]) -> TriState {
        states
            .get(self.source)
            .copied()
            .unwrap_or(TriState::Unknown)
            .invert_if(self.inverted)
    }
}

/// Everything a strategy may look at while compiling.
pub struct CompileContext<'a> {
    /// Circuit with resolved directions and per-pin connections
    pub circuit: &'a Circuit,
    /// Element → strategy slot
    pub slots: &'a HashMap<ElementId, usize>,
    /// Element → pins it evaluates (own pins or pins mapped onto it)
    pub pins_by_owner: &'a HashMap<ElementId, Vec<ElementId>>,
    /// Shared clock
    pub clock: &'a Clock,
}

impl<'a> CompileContext<'a> {
    /// Bind every Output connection reachable from the Input pins `element`
    /// evaluates.
    pub fn input_bindings(&self, element: ElementId) -> Vec<Binding> {
        let mut bindings = Vec::new();
        let pins = match self.pins_by_owner.get(&element) {
            Some(pins) => pins,
            None => return bindings,
        };
        for &pin in pins {
            let data = match self.circuit.pin(pin) {
                Ok(data) if data.direction == Direction::Input => data,
                _ => continue,
            };
            for conn in &data.connections {
                if self.circuit.direction(conn.pin) != Direction::Output {
                    continue;
                }
                let source = self
                    .circuit
                    .sim_owner(conn.pin)
                    .and_then(|owner| self.slots.get(&owner));
                if let Some(&source) = source {
                    bindings.push(Binding {
                        source,
                        inverted: conn.inverted,
                    });
                }
            }
        }
        bindings
    }
}

/// A simulation strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    Tag(PassThrough),
    Signal(PassThrough),
    And(Gate),
    Or(Gate),
    TimerOn(OnDelay),
    TimerOff(OffDelay),
    TimerPulse(Pulse),
    Memory(MemoryLatch),
}

impl Strategy {
    /// Instantiate the strategy for an element, if it is simulation-capable.
    ///
    /// Signals mapped onto a tag get no strategy of their own; the tag
    /// evaluates for them.
    pub fn for_element(element: &Element) -> Option<Self> {
        let id = element.id;
        match &element.kind {
            ElementKind::Tag(t) => Some(Strategy::Tag(PassThrough::new(id, t.initial))),
            ElementKind::Signal(s) if s.tag.is_none() => {
                Some(Strategy::Signal(PassThrough::new(id, TriState::Unknown)))
            }
            ElementKind::AndGate => Some(Strategy::And(Gate::new(id, GateOp::And))),
            ElementKind::OrGate => Some(Strategy::Or(Gate::new(id, GateOp::Or))),
            ElementKind::TimerOn(t) => Some(Strategy::TimerOn(OnDelay::new(id, t.delay))),
            ElementKind::TimerOff(t) => Some(Strategy::TimerOff(OffDelay::new(id, t.delay))),
            ElementKind::TimerPulse(t) => Some(Strategy::TimerPulse(Pulse::new(id, t.delay))),
            ElementKind::MemoryResetPriority => Some(Strategy::Memory(MemoryLatch::new(
                id,
                MemoryKind::ResetPriority,
            ))),
            ElementKind::MemorySetPriority => Some(Strategy::Memory(MemoryLatch::new(
                id,
                MemoryKind::SetPriority,
            ))),
            _ => None,
        }
    }

    /// Element this strategy evaluates.
    pub fn element(&self) -> ElementId {
        match self {
            Strategy::Tag(s) | Strategy::Signal(s) => s.element,
            Strategy::And(g) | Strategy::Or(g) => g.element,
            Strategy::TimerOn(t) => t.element,
            Strategy::TimerOff(t) => t.element,
            Strategy::TimerPulse(t) => t.element,
            Strategy::Memory(m) => m.element,
        }
    }

    /// Value of the state cell when a plan is created.
    pub fn initial(&self) -> TriState {
        match self {
            Strategy::Tag(s) | Strategy::Signal(s) => s.initial,
            Strategy::And(_) | Strategy::Or(_) | Strategy::Memory(_) => TriState::Unknown,
            Strategy::TimerOn(_) | Strategy::TimerOff(_) | Strategy::TimerPulse(_) => {
                TriState::False
            }
        }
    }

    /// Clear bindings and internal state.
    pub fn reset(&mut self) -> Result<()> {
        match self {
            Strategy::Tag(s) | Strategy::Signal(s) => s.reset(),
            Strategy::And(g) | Strategy::Or(g) => g.reset(),
            Strategy::TimerOn(t) => t.reset(),
            Strategy::TimerOff(t) => t.reset(),
            Strategy::TimerPulse(t) => t.reset(),
            Strategy::Memory(m) => return m.reset(),
        }
        Ok(())
    }

    /// Bind upstream outputs. An error leaves the element unevaluated.
    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        match self {
            Strategy::Tag(s) | Strategy::Signal(s) => s.compile(ctx),
            Strategy::And(g) | Strategy::Or(g) => g.compile(ctx),
            Strategy::TimerOn(t) => t.compile(ctx),
            Strategy::TimerOff(t) => t.compile(ctx),
            Strategy::TimerPulse(t) => t.compile(ctx),
            Strategy::Memory(m) => m.compile(ctx),
        }
    }

    /// Evaluate one cycle.
    pub fn calculate(&mut self, states: &[TriState], clock: &Clock) -> Result<TriState> {
        match self {
            Strategy::Tag(s) | Strategy::Signal(s) => Ok(s.calculate(states)),
            Strategy::And(g) | Strategy::Or(g) => Ok(g.calculate(states)),
            Strategy::TimerOn(t) => Ok(t.calculate(states, clock)),
            Strategy::TimerOff(t) => Ok(t.calculate(states, clock)),
            Strategy::TimerPulse(t) => Ok(t.calculate(states, clock)),
            Strategy::Memory(m) => m.calculate(states),
        }
    }

    /// Slots this strategy reads, deduplicated, in binding order.
    pub fn dependencies(&self) -> Vec<usize> {
        let bindings: &[Binding] = match self {
            Strategy::Tag(s) | Strategy::Signal(s) => &s.bindings,
            Strategy::And(g) | Strategy::Or(g) => &g.bindings,
            Strategy::TimerOn(t) => &t.enable.bindings,
            Strategy::TimerOff(t) => &t.enable.bindings,
            Strategy::TimerPulse(t) => &t.enable.bindings,
            Strategy::Memory(_) => &[],
        };
        let mut deps = Vec::with_capacity(bindings.len());
        for b in bindings {
            if !deps.contains(&b.source) {
                deps.push(b.source);
            }
        }
        deps
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Strategy::Tag(_) => "tag",
            Strategy::Signal(_) => "signal",
            Strategy::And(_) => "and",
            Strategy::Or(_) => "or",
            Strategy::TimerOn(_) => "timer-on",
            Strategy::TimerOff(_) => "timer-off",
            Strategy::TimerPulse(_) => "timer-pulse",
            Strategy::Memory(_) => "memory",
        }
    }
}
