//! Compiled evaluation plan.

use std::collections::HashMap;

use crate::circuit::{BlockRef, ElementId, TriState};
use crate::components::Strategy;
use crate::error::{LogicSimError, Result};
use crate::sim::Clock;

/// A tag with at least one signal mapped onto it.
#[derive(Debug, Clone)]
pub struct BoundTag {
    pub tag: ElementId,
    pub name: String,
    /// State cell of the tag
    pub slot: usize,
    /// Mapped signals and the blocks they came from
    pub signals: Vec<(ElementId, Option<BlockRef>)>,
}

/// Strategies, their state cells and the order to evaluate them in.
///
/// Slot `i` holds both `strategies[i]` and `states[i]`. Strategies that
/// failed to compile keep their cell but are never calculated.
#[derive(Debug, Clone)]
pub struct Plan {
    pub(crate) strategies: Vec<Strategy>,
    pub(crate) evaluable: Vec<bool>,
    pub(crate) order: Vec<usize>,
    pub(crate) slots: HashMap<ElementId, usize>,
    pub(crate) states: Vec<TriState>,
    pub(crate) bound_tags: Vec<BoundTag>,
    pub(crate) clock: Clock,
    pub(crate) cycles_detected: usize,
}

impl Plan {
    /// Advance the clock and calculate every evaluable strategy in order.
    ///
    /// A strategy that fails at runtime sets its cell to unknown.
    pub fn evaluate(&mut self) {
        self.clock.advance();
        for &slot in &self.order {
            let value = match self.strategies[slot].calculate(&self.states, &self.clock) {
                Ok(value) => value,
                Err(e) => {
                    clilog::warn!("{} at slot {} failed: {}", self.strategies[slot].kind_name(), slot, e);
                    TriState::Unknown
                }
            };
            self.states[slot] = value;
        }
    }

    /// Number of strategies (including unevaluated ones).
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Number of strategies that compiled.
    pub fn evaluable_count(&self) -> usize {
        self.evaluable.iter().filter(|e| **e).count()
    }

    /// Whether the element's strategy compiled.
    pub fn is_evaluable(&self, element: ElementId) -> bool {
        self.slots
            .get(&element)
            .map(|&slot| self.evaluable[slot])
            .unwrap_or(false)
    }

    /// Evaluation order, as elements.
    pub fn order(&self) -> Vec<ElementId> {
        self.order
            .iter()
            .map(|&slot| self.strategies[slot].element())
            .collect()
    }

    /// Slot of an element's strategy.
    pub fn slot(&self, element: ElementId) -> Option<usize> {
        self.slots.get(&element).copied()
    }

    /// Current value of an element's cell.
    pub fn value(&self, element: ElementId) -> Option<TriState> {
        self.slot(element).map(|slot| self.states[slot])
    }

    /// Write an element's cell from outside.
    ///
    /// If the element's strategy is evaluable the next cycle overwrites the
    /// value.
    pub fn set_value(&mut self, element: ElementId, value: TriState) -> Result<()> {
        let slot = self
            .slot(element)
            .ok_or(LogicSimError::ElementNotFound { id: element })?;
        self.states[slot] = value;
        Ok(())
    }

    /// Tags observed by signals.
    pub fn bound_tags(&self) -> &[BoundTag] {
        &self.bound_tags
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Back edges found while ordering.
    pub fn cycles_detected(&self) -> usize {
        self.cycles_detected
    }
}
