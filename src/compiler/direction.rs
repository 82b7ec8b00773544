//! Pin-direction inference.
//!
//! Signal pins have fixed directions. Starting from every input pin, the
//! resolver walks wires (through relay pins) to the pins of gates and
//! timers. A reached pin that is still undefined becomes that element's
//! output and every other undefined pin of the element becomes an input,
//! which in turn is followed across its own wires.

use std::collections::VecDeque;

use super::connection::{reachable_endpoints, Adjacency};
use crate::circuit::{Circuit, Direction, ElementId};

/// Resolve pin directions in place. Returns the number of pins whose
/// direction changed.
///
/// Pins unreachable from any signal stay [`Direction::Undefined`].
pub fn resolve_directions(circuit: &mut Circuit, adj: &Adjacency) -> usize {
    let mut queue: VecDeque<ElementId> = circuit
        .iter()
        .filter(|e| circuit.direction(e.id) == Direction::Input)
        .map(|e| e.id)
        .collect();
    let mut changed = 0;

    while let Some(pin) = queue.pop_front() {
        for neighbour in reachable_endpoints(circuit, adj, pin) {
            if circuit.direction(neighbour) != Direction::Undefined || circuit.is_signal_pin(neighbour) {
                continue;
            }
            if set_direction(circuit, neighbour, Direction::Output) {
                changed += 1;
            }

            let owner = match circuit.owner(neighbour) {
                Some(owner) => owner,
                None => continue,
            };
            for sibling in circuit.pins_of(owner) {
                if sibling == neighbour || circuit.direction(sibling) != Direction::Undefined {
                    continue;
                }
                if set_direction(circuit, sibling, Direction::Input) {
                    changed += 1;
                }
                if adj.contains_key(&sibling) {
                    queue.push_back(sibling);
                }
            }
        }
    }

    changed
}

fn set_direction(circuit: &mut Circuit, pin: ElementId, direction: Direction) -> bool {
    match circuit.pin_mut(pin) {
        Ok(data) if data.direction != direction => {
            data.direction = direction;
            true
        }
        _ => false,
    }
}
