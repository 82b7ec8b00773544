//! Circuit validation.

use crate::error::{LogicSimError, Result};

use super::{Circuit, Direction, ElementKind};

/// Validate a circuit before compilation.
///
/// Checks:
/// - Every child lists its owner as parent
/// - Wires connect two distinct pins
/// - Signals own exactly one input and one output pin
/// - Gates, timers and memories own exactly four pins
/// - Timer delays are finite and non-negative
/// - Signal tag references point at tags
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    for element in circuit.iter() {
        for &child in &element.children {
            let owner = circuit.element(child)?.parent;
            if owner != Some(element.id) {
                return Err(LogicSimError::topology(format!(
                    "{} lists {} as child but it is owned by {:?}",
                    element.id, child, owner
                )));
            }
        }

        match &element.kind {
            ElementKind::Wire(w) => {
                circuit.pin(w.start)?;
                circuit.pin(w.end)?;
                if w.start == w.end {
                    return Err(LogicSimError::topology(format!(
                        "wire {} connects {} to itself",
                        element.id, w.start
                    )));
                }
            }
            ElementKind::Signal(s) => {
                let pins = circuit.pins_of(element.id);
                let fixed = pins.len() == 2
                    && circuit.direction(pins[0]) == Direction::Input
                    && circuit.direction(pins[1]) == Direction::Output;
                if !fixed {
                    return Err(LogicSimError::topology(format!(
                        "signal '{}' must own one input and one output pin",
                        element.name
                    )));
                }
                if let Some(tag) = s.tag {
                    if !matches!(circuit.element(tag)?.kind, ElementKind::Tag(_)) {
                        return Err(LogicSimError::WrongElementKind {
                            id: tag,
                            expected: "tag",
                        });
                    }
                }
            }
            kind if kind.is_logic() => {
                let count = circuit.pins_of(element.id).len();
                if count != 4 {
                    return Err(LogicSimError::topology(format!(
                        "{} '{}' owns {} pins, expected 4",
                        kind.name(),
                        element.name,
                        count
                    )));
                }
                if let Some(timer) = kind.timer() {
                    if !timer.delay.is_finite() || timer.delay < 0.0 {
                        return Err(LogicSimError::topology(format!(
                            "timer '{}' has invalid delay {}",
                            element.name, timer.delay
                        )));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}
