//! Circuit element graph.
//!
//! Elements live in an arena and refer to each other through [`ElementId`]
//! handles. Ownership is expressed by `parent`/`children`; wires and the
//! simulation parent are non-owning overlays on top of that tree.

use std::collections::BTreeMap;

use super::types::{BlockRef, Direction, ElementId, GatePoint, Point, SignalPoint, TriState};
use crate::error::{LogicSimError, Result};

/// One resolved upstream connection of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Upstream pin
    pub pin: ElementId,
    /// Whether the value is inverted on the way
    pub inverted: bool,
}

/// Pin state.
#[derive(Debug, Clone, Default)]
pub struct PinData {
    /// Current direction
    pub direction: Direction,
    /// Whether the direction is reset to `Undefined` before each compile
    pub resets_direction: bool,
    /// Connections found by the last compile (cleared afterwards)
    pub connections: Vec<Connection>,
}

impl PinData {
    fn floating() -> Self {
        Self {
            direction: Direction::Undefined,
            resets_direction: true,
            connections: Vec::new(),
        }
    }

    fn fixed(direction: Direction) -> Self {
        Self {
            direction,
            resets_direction: false,
            connections: Vec::new(),
        }
    }
}

/// A wire between two pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireData {
    pub start: ElementId,
    pub end: ElementId,
    pub invert_start: bool,
    pub invert_end: bool,
}

impl WireData {
    /// Whether a value crossing this wire is inverted.
    pub fn inverted(&self) -> bool {
        self.invert_start || self.invert_end
    }
}

/// A signal: one input and one output pin, optionally backed by a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalData {
    pub tag: Option<ElementId>,
}

/// An addressable memory cell a signal is mapped onto.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagData {
    /// Free-form properties (designation, description, ...)
    pub properties: BTreeMap<String, String>,
    /// Value the tag's cell holds when a plan is created
    pub initial: TriState,
}

/// Timer parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerData {
    /// Delay (or pulse width) in seconds
    pub delay: f32,
}

/// Gate flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
}

/// Timer flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    On,
    Off,
    Pulse,
}

/// Memory latch flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    ResetPriority,
    SetPriority,
}

/// Element variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Pin(PinData),
    Wire(WireData),
    Signal(SignalData),
    Tag(TagData),
    AndGate,
    OrGate,
    TimerOn(TimerData),
    TimerOff(TimerData),
    TimerPulse(TimerData),
    MemoryResetPriority,
    MemorySetPriority,
    Context,
    Project,
    Solution,
}

impl PartialEq for PinData {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction && self.resets_direction == other.resets_direction
    }
}

impl ElementKind {
    /// Human readable kind name.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Pin(_) => "pin",
            ElementKind::Wire(_) => "wire",
            ElementKind::Signal(_) => "signal",
            ElementKind::Tag(_) => "tag",
            ElementKind::AndGate => "and gate",
            ElementKind::OrGate => "or gate",
            ElementKind::TimerOn(_) => "on-delay timer",
            ElementKind::TimerOff(_) => "off-delay timer",
            ElementKind::TimerPulse(_) => "pulse timer",
            ElementKind::MemoryResetPriority => "reset-priority memory",
            ElementKind::MemorySetPriority => "set-priority memory",
            ElementKind::Context => "context",
            ElementKind::Project => "project",
            ElementKind::Solution => "solution",
        }
    }

    /// Containers only group other elements.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ElementKind::Context | ElementKind::Project | ElementKind::Solution
        )
    }

    /// Gates, timers and memories: elements whose pins get inferred directions.
    pub fn is_logic(&self) -> bool {
        matches!(
            self,
            ElementKind::AndGate
                | ElementKind::OrGate
                | ElementKind::TimerOn(_)
                | ElementKind::TimerOff(_)
                | ElementKind::TimerPulse(_)
                | ElementKind::MemoryResetPriority
                | ElementKind::MemorySetPriority
        )
    }

    /// Timer parameters, if this is a timer.
    pub fn timer(&self) -> Option<&TimerData> {
        match self {
            ElementKind::TimerOn(t) | ElementKind::TimerOff(t) | ElementKind::TimerPulse(t) => {
                Some(t)
            }
            _ => None,
        }
    }
}

/// A node of the circuit tree.
#[derive(Debug, Clone)]
pub struct Element {
    /// Arena handle (stable for the lifetime of the circuit)
    pub id: ElementId,
    /// Display name
    pub name: String,
    /// Diagram position
    pub position: Point,
    /// Owning element
    pub parent: Option<ElementId>,
    /// Element whose strategy evaluates on behalf of this one
    pub sim_parent: Option<ElementId>,
    /// Owned children, in creation order
    pub children: Vec<ElementId>,
    /// Originating diagram block
    pub block: Option<BlockRef>,
    /// Variant payload
    pub kind: ElementKind,
}

/// A complete circuit: the element arena rooted at a solution.
#[derive(Debug, Clone)]
pub struct Circuit {
    elements: Vec<Element>,
    solution: ElementId,
}

impl Circuit {
    /// Create an empty circuit with a root solution.
    pub fn new(solution_name: impl Into<String>) -> Self {
        let mut circuit = Self {
            elements: Vec::new(),
            solution: ElementId(0),
        };
        circuit.solution = circuit.push(None, solution_name.into(), ElementKind::Solution);
        circuit
    }

    fn push(&mut self, parent: Option<ElementId>, name: String, kind: ElementKind) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            id,
            name,
            position: Point::default(),
            parent,
            sim_parent: None,
            children: Vec::new(),
            block: None,
            kind,
        });
        if let Some(p) = parent {
            self.elements[p.0].children.push(id);
        }
        id
    }

    fn expect_kind(&self, id: ElementId, expected: &'static str, ok: bool) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(LogicSimError::WrongElementKind { id, expected })
        }
    }

    fn expect_container(&self, id: ElementId) -> Result<()> {
        let ok = self.element(id)?.kind.is_container();
        self.expect_kind(id, "container", ok)
    }

    fn expect_pins(&self, pins: &[ElementId]) -> Result<()> {
        for &pin in pins {
            self.pin(pin)?;
        }
        Ok(())
    }

    /// Root solution handle.
    pub fn solution(&self) -> ElementId {
        self.solution
    }

    /// Number of elements in the arena.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Look up an element, failing with [`LogicSimError::ElementNotFound`].
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements
            .get(id.0)
            .ok_or(LogicSimError::ElementNotFound { id })
    }

    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements
            .get_mut(id.0)
            .ok_or(LogicSimError::ElementNotFound { id })
    }

    /// All elements in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    // ============ Construction ============

    /// Add a project under the solution.
    pub fn add_project(&mut self, name: impl Into<String>) -> ElementId {
        self.push(Some(self.solution), name.into(), ElementKind::Project)
    }

    /// Add a context under a project.
    pub fn add_context(&mut self, project: ElementId, name: impl Into<String>) -> Result<ElementId> {
        let ok = matches!(self.element(project)?.kind, ElementKind::Project);
        self.expect_kind(project, "project", ok)?;
        Ok(self.push(Some(project), name.into(), ElementKind::Context))
    }

    /// Add a tag to the solution's tag set.
    pub fn add_tag(&mut self, name: impl Into<String>, initial: TriState) -> ElementId {
        self.push(
            Some(self.solution),
            name.into(),
            ElementKind::Tag(TagData {
                properties: BTreeMap::new(),
                initial,
            }),
        )
    }

    /// Add a relay (junction) pin to a container.
    pub fn add_pin(&mut self, container: ElementId, name: impl Into<String>) -> Result<ElementId> {
        self.expect_container(container)?;
        Ok(self.push(
            Some(container),
            name.into(),
            ElementKind::Pin(PinData::floating()),
        ))
    }

    /// Add a signal with its fixed input and output pins.
    pub fn add_signal(
        &mut self,
        context: ElementId,
        name: impl Into<String>,
        tag: Option<ElementId>,
    ) -> Result<ElementId> {
        if let Some(t) = tag {
            let ok = matches!(self.element(t)?.kind, ElementKind::Tag(_));
            self.expect_kind(t, "tag", ok)?;
        }
        let name = name.into();
        let input = self.add_pin(context, format!("{}.in", name))?;
        let output = self.add_pin(context, format!("{}.out", name))?;
        self.signal_from_pins(context, name, tag, [input, output])
    }

    /// Build a signal around two existing pins (input, output).
    pub fn signal_from_pins(
        &mut self,
        context: ElementId,
        name: impl Into<String>,
        tag: Option<ElementId>,
        pins: [ElementId; 2],
    ) -> Result<ElementId> {
        self.expect_container(context)?;
        self.expect_pins(&pins)?;
        let signal = self.push(
            Some(context),
            name.into(),
            ElementKind::Signal(SignalData { tag }),
        );
        self.adopt(signal, &pins)?;
        *self.pin_mut(pins[SignalPoint::Input.index()])? = PinData::fixed(Direction::Input);
        *self.pin_mut(pins[SignalPoint::Output.index()])? = PinData::fixed(Direction::Output);
        Ok(signal)
    }

    /// Add an AND or OR gate with its four pins.
    pub fn add_gate(&mut self, context: ElementId, kind: GateKind, name: impl Into<String>) -> Result<ElementId> {
        let kind = match kind {
            GateKind::And => ElementKind::AndGate,
            GateKind::Or => ElementKind::OrGate,
        };
        self.add_logic(context, kind, name.into())
    }

    /// Add a timer with its four pins.
    pub fn add_timer(
        &mut self,
        context: ElementId,
        kind: TimerKind,
        name: impl Into<String>,
        delay: f32,
    ) -> Result<ElementId> {
        let data = TimerData { delay };
        let kind = match kind {
            TimerKind::On => ElementKind::TimerOn(data),
            TimerKind::Off => ElementKind::TimerOff(data),
            TimerKind::Pulse => ElementKind::TimerPulse(data),
        };
        self.add_logic(context, kind, name.into())
    }

    /// Add a memory latch with its four pins.
    pub fn add_memory(&mut self, context: ElementId, kind: MemoryKind, name: impl Into<String>) -> Result<ElementId> {
        let kind = match kind {
            MemoryKind::ResetPriority => ElementKind::MemoryResetPriority,
            MemoryKind::SetPriority => ElementKind::MemorySetPriority,
        };
        self.add_logic(context, kind, name.into())
    }

    fn add_logic(&mut self, context: ElementId, kind: ElementKind, name: String) -> Result<ElementId> {
        let mut pins = [ElementId(0); 4];
        for point in GatePoint::ALL {
            let point_name = format!("{:?}", point).to_lowercase();
            pins[point.index()] = self.add_pin(context, format!("{}.{}", name, point_name))?;
        }
        self.logic_from_pins(context, kind, name, pins)
    }

    /// Build a gate, timer or memory around four existing pins.
    pub fn logic_from_pins(
        &mut self,
        context: ElementId,
        kind: ElementKind,
        name: impl Into<String>,
        pins: [ElementId; 4],
    ) -> Result<ElementId> {
        if !kind.is_logic() {
            return Err(LogicSimError::topology(format!(
                "{} cannot own gate pins",
                kind.name()
            )));
        }
        self.expect_container(context)?;
        self.expect_pins(&pins)?;
        let element = self.push(Some(context), name.into(), kind);
        self.adopt(element, &pins)?;
        Ok(element)
    }

    /// Add a wire between two existing pins.
    pub fn add_wire(
        &mut self,
        context: ElementId,
        start: ElementId,
        end: ElementId,
        invert_start: bool,
        invert_end: bool,
    ) -> Result<ElementId> {
        self.expect_container(context)?;
        self.pin(start)?;
        self.pin(end)?;
        if start == end {
            return Err(LogicSimError::topology(format!(
                "wire from {} to itself",
                start
            )));
        }
        let name = format!("{}-{}", self.elements[start.0].name, self.elements[end.0].name);
        Ok(self.push(
            Some(context),
            name,
            ElementKind::Wire(WireData {
                start,
                end,
                invert_start,
                invert_end,
            }),
        ))
    }

    /// Move existing children under a new owner, keeping their order.
    pub fn adopt(&mut self, owner: ElementId, children: &[ElementId]) -> Result<()> {
        self.element(owner)?;
        for &child in children {
            let old = self.element(child)?.parent;
            if let Some(old) = old {
                self.elements[old.0].children.retain(|c| *c != child);
            }
            self.elements[child.0].parent = Some(owner);
            self.elements[owner.0].children.push(child);
        }
        Ok(())
    }

    /// Bind a signal to a tag.
    pub fn bind_tag(&mut self, signal: ElementId, tag: ElementId) -> Result<()> {
        let ok = matches!(self.element(tag)?.kind, ElementKind::Tag(_));
        self.expect_kind(tag, "tag", ok)?;
        match &mut self.element_mut(signal)?.kind {
            ElementKind::Signal(s) => {
                s.tag = Some(tag);
                Ok(())
            }
            _ => Err(LogicSimError::WrongElementKind {
                id: signal,
                expected: "signal",
            }),
        }
    }

    /// Set the diagram block an element came from.
    pub fn set_block(&mut self, id: ElementId, block: BlockRef) -> Result<()> {
        self.element_mut(id)?.block = Some(block);
        Ok(())
    }

    // ============ Queries ============

    /// Pin payload of `id`.
    pub fn pin(&self, id: ElementId) -> Result<&PinData> {
        match &self.element(id)?.kind {
            ElementKind::Pin(p) => Ok(p),
            _ => Err(LogicSimError::WrongElementKind { id, expected: "pin" }),
        }
    }

    pub fn pin_mut(&mut self, id: ElementId) -> Result<&mut PinData> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Pin(p) => Ok(p),
            _ => Err(LogicSimError::WrongElementKind { id, expected: "pin" }),
        }
    }

    /// Direction of a pin (`Undefined` for non-pins).
    pub fn direction(&self, id: ElementId) -> Direction {
        self.pin(id).map(|p| p.direction).unwrap_or_default()
    }

    /// Pins owned by an element, in connection-point order.
    pub fn pins_of(&self, owner: ElementId) -> Vec<ElementId> {
        self.get(owner)
            .map(|e| {
                e.children
                    .iter()
                    .copied()
                    .filter(|c| matches!(self.elements[c.0].kind, ElementKind::Pin(_)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Owning element of a pin.
    pub fn owner(&self, pin: ElementId) -> Option<ElementId> {
        self.get(pin).and_then(|e| e.parent)
    }

    /// Element that evaluates on behalf of a pin: its simulation parent if
    /// mapped, else its owner.
    pub fn sim_owner(&self, pin: ElementId) -> Option<ElementId> {
        let element = self.get(pin)?;
        element.sim_parent.or(element.parent)
    }

    /// A relay pin is a plain pin owned directly by a container.
    pub fn is_relay_pin(&self, pin: ElementId) -> bool {
        if self.pin(pin).is_err() {
            return false;
        }
        match self.owner(pin).and_then(|o| self.get(o)) {
            Some(owner) => owner.kind.is_container(),
            None => true,
        }
    }

    /// Whether the pin is owned (directly or through simulation) by a tag or signal.
    pub fn is_signal_pin(&self, pin: ElementId) -> bool {
        let owned_by = |id: Option<ElementId>| {
            id.and_then(|o| self.get(o))
                .map(|e| matches!(e.kind, ElementKind::Signal(_) | ElementKind::Tag(_)))
                .unwrap_or(false)
        };
        owned_by(self.owner(pin)) || owned_by(self.get(pin).and_then(|e| e.sim_parent))
    }

    /// All wires in the circuit.
    pub fn wires(&self) -> impl Iterator<Item = (ElementId, &WireData)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Wire(w) => Some((e.id, w)),
            _ => None,
        })
    }

    /// All tags of the solution.
    pub fn tags(&self) -> impl Iterator<Item = (ElementId, &TagData)> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Tag(t) => Some((e.id, t)),
            _ => None,
        })
    }

    /// Find a tag by name (case-sensitive).
    pub fn find_tag(&self, name: &str) -> Option<ElementId> {
        self.tags()
            .find(|(id, _)| self.elements[id.0].name == name)
            .map(|(id, _)| id)
    }

    /// All contexts, in creation order.
    pub fn contexts(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Context))
            .map(|e| e.id)
            .collect()
    }

    /// All elements below `root` (excluding `root`), depth first.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = match self.get(root) {
            Some(e) => e.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.elements[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Signals mapped onto `tag`.
    pub fn signals_of_tag(&self, tag: ElementId) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Signal(SignalData { tag: Some(t) }) if t == tag))
            .map(|e| e.id)
            .collect()
    }

    // ============ Compile-time transient state ============

    /// Reset directions of non-fixed pins, drop connections and simulation
    /// parents.
    pub fn clear_transient(&mut self) {
        for element in &mut self.elements {
            element.sim_parent = None;
            if let ElementKind::Pin(p) = &mut element.kind {
                if p.resets_direction {
                    p.direction = Direction::Undefined;
                }
                p.connections.clear();
            }
        }
    }

    /// Drop per-pin connection lists only.
    pub fn clear_connections(&mut self) {
        for element in &mut self.elements {
            if let ElementKind::Pin(p) = &mut element.kind {
                p.connections.clear();
            }
        }
    }

    /// Redirect evaluation of `element` to `sim_parent`.
    pub fn set_sim_parent(&mut self, element: ElementId, sim_parent: Option<ElementId>) -> Result<()> {
        self.element_mut(element)?.sim_parent = sim_parent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(circuit: &mut Circuit) -> ElementId {
        let project = circuit.add_project("P");
        circuit.add_context(project, "C").unwrap()
    }

    #[test]
    fn test_signal_has_fixed_pins() {
        let mut c = Circuit::new("S");
        let ctx = context(&mut c);
        let tag = c.add_tag("T", TriState::Unknown);
        let s = c.add_signal(ctx, "S1", Some(tag)).unwrap();
        let pins = c.pins_of(s);
        assert_eq!(pins.len(), 2);
        assert_eq!(c.direction(pins[0]), Direction::Input);
        assert_eq!(c.direction(pins[1]), Direction::Output);
        assert!(!c.pin(pins[0]).unwrap().resets_direction);
        assert_eq!(c.signals_of_tag(tag), vec![s]);
    }

    #[test]
    fn test_gate_pins_are_owned_by_gate() {
        let mut c = Circuit::new("S");
        let ctx = context(&mut c);
        let g = c.add_gate(ctx, GateKind::And, "A1").unwrap();
        let pins = c.pins_of(g);
        assert_eq!(pins.len(), 4);
        for p in &pins {
            assert_eq!(c.owner(*p), Some(g));
            assert!(!c.is_relay_pin(*p));
            assert!(!c.element(ctx).unwrap().children.contains(p));
        }
    }

    #[test]
    fn test_wire_requires_existing_pins() {
        let mut c = Circuit::new("S");
        let ctx = context(&mut c);
        let j = c.add_pin(ctx, "J").unwrap();
        assert!(c.add_wire(ctx, j, ElementId(999), false, false).is_err());
        assert!(c.add_wire(ctx, j, ctx, false, false).is_err());
        let k = c.add_pin(ctx, "K").unwrap();
        let w = c.add_wire(ctx, j, k, true, false).unwrap();
        let (_, data) = c.wires().find(|(id, _)| *id == w).unwrap();
        assert!(data.inverted());
    }

    #[test]
    fn test_bad_context_handle_is_an_error() {
        let mut c = Circuit::new("S");
        let ctx = context(&mut c);
        let a = c.add_pin(ctx, "A").unwrap();
        let b = c.add_pin(ctx, "B").unwrap();
        let len = c.len();

        assert!(matches!(
            c.add_wire(ElementId(999), a, b, false, false),
            Err(LogicSimError::ElementNotFound { .. })
        ));
        assert!(matches!(
            c.signal_from_pins(ElementId(999), "S1", None, [a, b]),
            Err(LogicSimError::ElementNotFound { .. })
        ));
        assert!(matches!(
            c.logic_from_pins(a, ElementKind::AndGate, "A1", [a, b, a, b]),
            Err(LogicSimError::WrongElementKind { expected: "container", .. })
        ));
        assert!(matches!(
            c.signal_from_pins(ctx, "S1", None, [a, ElementId(999)]),
            Err(LogicSimError::ElementNotFound { .. })
        ));
        assert_eq!(c.len(), len);
    }

    #[test]
    fn test_clear_transient_keeps_fixed_directions() {
        let mut c = Circuit::new("S");
        let ctx = context(&mut c);
        let s = c.add_signal(ctx, "S1", None).unwrap();
        let g = c.add_gate(ctx, GateKind::Or, "O1").unwrap();
        let gp = c.pins_of(g)[0];
        c.pin_mut(gp).unwrap().direction = Direction::Output;
        c.clear_transient();
        assert_eq!(c.direction(gp), Direction::Undefined);
        assert_eq!(c.direction(c.pins_of(s)[1]), Direction::Output);
    }
}
