//! AND / OR gate strategies.

use super::{Binding, CompileContext};
use crate::circuit::{ElementId, TriState};
use crate::error::{LogicSimError, Result};

/// Gate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOp {
    And,
    Or,
}

impl GateOp {
    fn apply(self, a: TriState, b: TriState) -> TriState {
        match self {
            GateOp::And => a.and(b),
            GateOp::Or => a.or(b),
        }
    }
}

/// A combinational gate over every bound input.
#[derive(Debug, Clone)]
pub struct Gate {
    pub element: ElementId,
    pub op: GateOp,
    pub bindings: Vec<Binding>,
}

impl Gate {
    pub fn new(element: ElementId, op: GateOp) -> Self {
        Self {
            element,
            op,
            bindings: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.bindings.clear();
    }

    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        self.bindings = ctx.input_bindings(self.element);
        if self.bindings.is_empty() {
            return Err(LogicSimError::unbound(self.element, "gate has no bound inputs"));
        }
        Ok(())
    }

    /// Fold all inputs. A gate needs two operands; with one it reads unknown.
    pub fn calculate(&self, states: &[TriState]) -> TriState {
        if self.bindings.len() < 2 {
            return TriState::Unknown;
        }
        let mut inputs = self.bindings.iter().map(|b| b.read(states));
        let first = inputs.next().unwrap_or(TriState::Unknown);
        inputs.fold(first, |acc, v| self.op.apply(acc, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(op: GateOp, inverted: &[bool]) -> Gate {
        let mut g = Gate::new(ElementId(9), op);
        g.bindings = inverted
            .iter()
            .enumerate()
            .map(|(source, &inverted)| Binding { source, inverted })
            .collect();
        g
    }

    #[test]
    fn test_and_or_truth_tables() {
        use TriState::*;
        let and = gate(GateOp::And, &[false, false]);
        let or = gate(GateOp::Or, &[false, false]);
        assert_eq!(and.calculate(&[True, True]), True);
        assert_eq!(and.calculate(&[True, False]), False);
        assert_eq!(or.calculate(&[True, False]), True);
        assert_eq!(or.calculate(&[False, False]), False);
        assert_eq!(and.calculate(&[Unknown, False]), False);
        assert_eq!(or.calculate(&[Unknown, False]), Unknown);
    }

    #[test]
    fn test_de_morgan_duality() {
        use TriState::*;
        let and_inv = gate(GateOp::And, &[true, true, true]);
        let or = gate(GateOp::Or, &[false, false, false]);
        let values = [True, False];
        for &a in &values {
            for &b in &values {
                for &c in &values {
                    let states = [a, b, c];
                    assert_eq!(and_inv.calculate(&states), !or.calculate(&states));
                }
            }
        }
    }

    #[test]
    fn test_single_input_is_unknown() {
        let and = gate(GateOp::And, &[false]);
        let or = gate(GateOp::Or, &[true]);
        for v in [TriState::True, TriState::False] {
            assert_eq!(and.calculate(&[v]), TriState::Unknown);
            assert_eq!(or.calculate(&[v]), TriState::Unknown);
        }
    }
}
