//! Circuit compiler.
//!
//! Turns a circuit into a [`Plan`]:
//! 1. Clear transient pin state and simulation parents
//! 2. Map tagged signals onto their tags and instantiate strategies
//! 3. Infer pin directions
//! 4. Resolve connections through relay pins
//! 5. Initialise state cells
//! 6. Compile (bind) every strategy
//! 7. Order strategies by dependency
//! 8. Drop per-pin connection data

mod connection;
mod direction;
mod plan;
mod sort;

pub use connection::{attach_connections, build_adjacency, resolve_connections, Adjacency};
pub use direction::resolve_directions;
pub use plan::{BoundTag, Plan};
pub use sort::{topological_order, Ordering};

use std::collections::HashMap;

use crate::circuit::{Circuit, ElementId, ElementKind, SignalData};
use crate::components::{CompileContext, Strategy};
use crate::error::{LogicSimError, Result};
use crate::sim::{Clock, SimulatorConfig};

/// Compiles circuits with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: SimulatorConfig,
}

impl Compiler {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Compile a circuit. Pin directions stay resolved on the circuit
    /// afterwards; connections do not.
    pub fn compile(&self, circuit: &mut Circuit) -> Result<Plan> {
        if self.config.resolution_ms == 0 {
            return Err(LogicSimError::InvalidResolution { resolution_ms: 0 });
        }
        let clock = Clock::new(self.config.resolution_ms);

        circuit.clear_transient();
        map_signals_onto_tags(circuit)?;

        let mut strategies: Vec<Strategy> = circuit.iter().filter_map(Strategy::for_element).collect();
        let slots: HashMap<ElementId, usize> = strategies
            .iter()
            .enumerate()
            .map(|(slot, s)| (s.element(), slot))
            .collect();

        let adj = build_adjacency(circuit);
        let resolved = resolve_directions(circuit, &adj);
        let attached = attach_connections(circuit, &adj);
        if self.config.trace {
            clilog::debug!(
                "compile: {} strategies, {} pin directions, {} connected inputs",
                strategies.len(),
                resolved,
                attached
            );
        }

        let states = strategies.iter().map(Strategy::initial).collect();

        let pins_by_owner = pins_by_sim_owner(circuit);
        let ctx = CompileContext {
            circuit: &*circuit,
            slots: &slots,
            pins_by_owner: &pins_by_owner,
            clock: &clock,
        };
        let mut evaluable = Vec::with_capacity(strategies.len());
        for strategy in &mut strategies {
            let ok = match strategy.reset().and_then(|_| strategy.compile(&ctx)) {
                Ok(()) => true,
                Err(e @ LogicSimError::Unsupported { .. }) => {
                    clilog::warn!("{}", e);
                    false
                }
                Err(e) => {
                    clilog::debug!("{} {} left unevaluated: {}", strategy.kind_name(), strategy.element(), e);
                    false
                }
            };
            evaluable.push(ok);
        }

        let dependencies: Vec<Vec<usize>> = strategies.iter().map(Strategy::dependencies).collect();
        let ordering = topological_order(&dependencies, &evaluable);
        if self.config.trace {
            clilog::debug!(
                "compile: {} of {} strategies evaluable, {} feedback edges",
                ordering.order.len(),
                strategies.len(),
                ordering.cycles
            );
        }

        let bound_tags = collect_bound_tags(circuit, &slots);
        circuit.clear_connections();

        Ok(Plan {
            strategies,
            evaluable,
            order: ordering.order,
            slots,
            states,
            bound_tags,
            clock,
            cycles_detected: ordering.cycles,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

/// Point the pins of every tagged signal at the tag.
fn map_signals_onto_tags(circuit: &mut Circuit) -> Result<()> {
    let mapped: Vec<(ElementId, ElementId)> = circuit
        .iter()
        .filter_map(|e| match e.kind {
            ElementKind::Signal(SignalData { tag: Some(tag) }) => Some((e.id, tag)),
            _ => None,
        })
        .collect();
    for (signal, tag) in mapped {
        for pin in circuit.pins_of(signal) {
            circuit.set_sim_parent(pin, Some(tag))?;
        }
    }
    Ok(())
}

fn pins_by_sim_owner(circuit: &Circuit) -> HashMap<ElementId, Vec<ElementId>> {
    let mut map: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
    for element in circuit.iter() {
        if !matches!(element.kind, ElementKind::Pin(_)) {
            continue;
        }
        if let Some(owner) = circuit.sim_owner(element.id) {
            map.entry(owner).or_default().push(element.id);
        }
    }
    map
}

fn collect_bound_tags(circuit: &Circuit, slots: &HashMap<ElementId, usize>) -> Vec<BoundTag> {
    let mut bound = Vec::new();
    for (tag, _) in circuit.tags() {
        let signals = circuit.signals_of_tag(tag);
        let slot = match slots.get(&tag) {
            Some(&slot) if !signals.is_empty() => slot,
            _ => continue,
        };
        let name = circuit.get(tag).map(|e| e.name.clone()).unwrap_or_default();
        let signals = signals
            .into_iter()
            .map(|s| (s, circuit.get(s).and_then(|e| e.block.clone())))
            .collect();
        bound.push(BoundTag {
            tag,
            name,
            slot,
            signals,
        });
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{GateKind, TriState};

    struct AndCircuit {
        circuit: Circuit,
        start: ElementId,
        stop: ElementId,
        lamp: ElementId,
        gate: ElementId,
    }

    /// Start ∧ ¬Stop → Lamp
    fn and_circuit() -> AndCircuit {
        let mut c = Circuit::new("S");
        let p = c.add_project("P");
        let ctx = c.add_context(p, "C").unwrap();
        let start = c.add_tag("Start", TriState::False);
        let stop = c.add_tag("Stop", TriState::False);
        let lamp = c.add_tag("Lamp", TriState::Unknown);
        let s1 = c.add_signal(ctx, "S1", Some(start)).unwrap();
        let s2 = c.add_signal(ctx, "S2", Some(stop)).unwrap();
        let s3 = c.add_signal(ctx, "S3", Some(lamp)).unwrap();
        let gate = c.add_gate(ctx, GateKind::And, "A1").unwrap();
        let gp = c.pins_of(gate);
        c.add_wire(ctx, c.pins_of(s1)[1], gp[0], false, false).unwrap();
        c.add_wire(ctx, c.pins_of(s2)[1], gp[1], true, false).unwrap();
        c.add_wire(ctx, gp[3], c.pins_of(s3)[0], false, false).unwrap();
        AndCircuit {
            circuit: c,
            start,
            stop,
            lamp,
            gate,
        }
    }

    #[test]
    fn test_compile_and_evaluate() {
        let mut f = and_circuit();
        let mut plan = Compiler::default().compile(&mut f.circuit).unwrap();

        assert!(plan.is_evaluable(f.gate));
        assert!(plan.is_evaluable(f.lamp));
        assert!(!plan.is_evaluable(f.start));
        assert_eq!(plan.value(f.lamp), Some(TriState::Unknown));

        plan.evaluate();
        assert_eq!(plan.value(f.lamp), Some(TriState::False));

        plan.set_value(f.start, TriState::True).unwrap();
        plan.evaluate();
        assert_eq!(plan.value(f.lamp), Some(TriState::True));

        plan.set_value(f.stop, TriState::True).unwrap();
        plan.evaluate();
        assert_eq!(plan.value(f.lamp), Some(TriState::False));
    }

    #[test]
    fn test_order_places_gate_before_lamp() {
        let mut f = and_circuit();
        let plan = Compiler::default().compile(&mut f.circuit).unwrap();
        let order = plan.order();
        let gate = order.iter().position(|e| *e == f.gate).unwrap();
        let lamp = order.iter().position(|e| *e == f.lamp).unwrap();
        assert!(gate < lamp);
        assert_eq!(plan.cycles_detected(), 0);
    }

    #[test]
    fn test_connections_are_dropped_after_compile() {
        let mut f = and_circuit();
        Compiler::default().compile(&mut f.circuit).unwrap();
        assert!(f
            .circuit
            .iter()
            .filter_map(|e| f.circuit.pin(e.id).ok())
            .all(|p| p.connections.is_empty()));
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let mut f = and_circuit();
        let compiler = Compiler::new(SimulatorConfig::default().with_resolution_ms(0));
        assert!(matches!(
            compiler.compile(&mut f.circuit),
            Err(LogicSimError::InvalidResolution { resolution_ms: 0 })
        ));
    }

    #[test]
    fn test_bound_tags_carry_signal_blocks() {
        let mut f = and_circuit();
        let plan = Compiler::default().compile(&mut f.circuit).unwrap();
        let names: Vec<&str> = plan.bound_tags().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Start", "Stop", "Lamp"]);
        assert!(plan.bound_tags().iter().all(|t| t.signals.len() == 1));
    }

    #[test]
    fn test_recompile_is_stable() {
        let mut f = and_circuit();
        let first = Compiler::default().compile(&mut f.circuit).unwrap();
        let second = Compiler::default().compile(&mut f.circuit).unwrap();
        assert_eq!(first.order(), second.order());
        assert_eq!(first.evaluable, second.evaluable);
    }
}
