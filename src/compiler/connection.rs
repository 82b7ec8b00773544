//! Connection resolution through relay chains.

use std::collections::{HashMap, HashSet};

use crate::circuit::{Circuit, Connection, Direction, ElementId};

/// Pin → (neighbour pin, wire inverted) for every wire, both directions.
pub type Adjacency = HashMap<ElementId, Vec<(ElementId, bool)>>;

/// Build the wire adjacency map.
pub fn build_adjacency(circuit: &Circuit) -> Adjacency {
    let mut adj: Adjacency = HashMap::new();
    for (_, wire) in circuit.wires() {
        let inverted = wire.inverted();
        adj.entry(wire.start).or_default().push((wire.end, inverted));
        adj.entry(wire.end).or_default().push((wire.start, inverted));
    }
    adj
}

/// Every pin reachable from `root`, walking through neighbours whose
/// direction is still undefined and stopping at resolved pins.
///
/// Inversions along a relay chain cancel pairwise.
pub fn resolve_connections(circuit: &Circuit, adj: &Adjacency, root: ElementId) -> Vec<Connection> {
    let mut found = Vec::new();
    let mut visited: HashSet<ElementId> = HashSet::new();
    visited.insert(root);
    let mut stack = vec![(root, false)];

    while let Some((pin, inverted)) = stack.pop() {
        let neighbours = match adj.get(&pin) {
            Some(n) => n,
            None => continue,
        };
        for &(next, wire_inverted) in neighbours {
            if !visited.insert(next) {
                continue;
            }
            let inverted = inverted ^ wire_inverted;
            found.push(Connection { pin: next, inverted });
            if circuit.direction(next) == Direction::Undefined {
                stack.push((next, inverted));
            }
        }
    }

    found
}

/// Non-relay pins reachable from `root` through relay pins only.
pub(crate) fn reachable_endpoints(circuit: &Circuit, adj: &Adjacency, root: ElementId) -> Vec<ElementId> {
    let mut found = Vec::new();
    let mut visited: HashSet<ElementId> = HashSet::new();
    visited.insert(root);
    let mut stack = vec![root];

    while let Some(pin) = stack.pop() {
        let neighbours = match adj.get(&pin) {
            Some(n) => n,
            None => continue,
        };
        for &(next, _) in neighbours {
            if !visited.insert(next) {
                continue;
            }
            if circuit.is_relay_pin(next) {
                stack.push(next);
            } else {
                found.push(next);
            }
        }
    }

    found
}

/// Store resolved connections on every input pin. Returns how many pins
/// received at least one connection.
pub fn attach_connections(circuit: &mut Circuit, adj: &Adjacency) -> usize {
    let inputs: Vec<ElementId> = circuit
        .iter()
        .filter(|e| circuit.direction(e.id) == Direction::Input)
        .map(|e| e.id)
        .collect();

    let mut attached = 0;
    for pin in inputs {
        let connections = resolve_connections(circuit, adj, pin);
        if connections.is_empty() {
            continue;
        }
        if let Ok(data) = circuit.pin_mut(pin) {
            data.connections = connections;
            attached += 1;
        }
    }
    attached
}
