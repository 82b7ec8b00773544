//! Pass-through strategy for tags and tag-less signals.

use super::{Binding, CompileContext};
use crate::circuit::{ElementId, TriState};
use crate::error::{LogicSimError, Result};

/// Copies its single upstream value, honouring inversion.
///
/// A tag with no upstream driver fails to compile and is never calculated,
/// so its cell keeps whatever value was written from outside.
#[derive(Debug, Clone)]
pub struct PassThrough {
    pub element: ElementId,
    pub initial: TriState,
    pub bindings: Vec<Binding>,
}

impl PassThrough {
    pub fn new(element: ElementId, initial: TriState) -> Self {
        Self {
            element,
            initial,
            bindings: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.bindings.clear();
    }

    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        self.bindings = ctx.input_bindings(self.element);
        if self.bindings.is_empty() {
            return Err(LogicSimError::unbound(self.element, "no upstream driver"));
        }
        Ok(())
    }

    /// More than one driver is a conflict and reads as unknown.
    pub fn calculate(&self, states: &[TriState]) -> TriState {
        match self.bindings.as_slice() {
            [only] => only.read(states),
            _ => TriState::Unknown,
        }
    }
}
