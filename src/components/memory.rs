//! Memory latch placeholders.
//!
//! Reset- and set-priority latches exist in the element model so diagrams
//! containing them load and round-trip, but they have no evaluation
//! semantics: every lifecycle call fails and the compiler leaves them
//! unevaluated.

use super::CompileContext;
use crate::circuit::{ElementId, MemoryKind, TriState};
use crate::error::{LogicSimError, Result};

#[derive(Debug, Clone)]
pub struct MemoryLatch {
    pub element: ElementId,
    pub kind: MemoryKind,
}

impl MemoryLatch {
    pub fn new(element: ElementId, kind: MemoryKind) -> Self {
        Self { element, kind }
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            MemoryKind::ResetPriority => "reset-priority memory",
            MemoryKind::SetPriority => "set-priority memory",
        }
    }

    fn unsupported(&self, operation: &'static str) -> LogicSimError {
        LogicSimError::Unsupported {
            element: self.element,
            kind: self.kind_name(),
            operation,
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        Err(self.unsupported("reset"))
    }

    pub fn compile(&mut self, _ctx: &CompileContext<'_>) -> Result<()> {
        Err(self.unsupported("compile"))
    }

    pub fn calculate(&self, _states: &[TriState]) -> Result<TriState> {
        Err(self.unsupported("calculate"))
    }
}
