//! Block → circuit translation.
//!
//! Maps named diagram blocks and their fixed-order connection points onto
//! signals, gates, timers, relay pins and wires.

use std::collections::HashMap;

use super::graph::{Circuit, ElementKind, GateKind, TimerKind};
use super::types::{BlockRef, ElementId, GatePoint, SignalPoint};
use super::validate::validate_circuit;
use crate::dsl::{BlockDef, CircuitAst, PointRef};
use crate::error::{LogicSimError, Result};

/// Solution name used when the diagram does not declare one.
pub const DEFAULT_SOLUTION: &str = "Solution";

/// Block kinds understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Signal,
    And,
    Or,
    TimerOn,
    TimerOff,
    TimerPulse,
    /// Relay junction
    Pin,
}

impl BlockType {
    /// Resolve a block kind name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SIGNAL" => Some(Self::Signal),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "TIMER-ON" => Some(Self::TimerOn),
            "TIMER-OFF" => Some(Self::TimerOff),
            "TIMER-PULSE" => Some(Self::TimerPulse),
            "PIN" => Some(Self::Pin),
            _ => None,
        }
    }
}

/// Translate a parsed diagram into a validated circuit.
///
/// Unknown block kinds abort the whole translation.
pub fn translate(ast: &CircuitAst) -> Result<Circuit> {
    let mut circuit = Circuit::new(ast.solution.as_deref().unwrap_or(DEFAULT_SOLUTION));

    let mut tags: HashMap<&str, ElementId> = HashMap::new();
    for def in &ast.tags {
        if tags.contains_key(def.name.as_str()) {
            return Err(LogicSimError::DuplicateTag {
                name: def.name.clone(),
            });
        }
        let tag = circuit.add_tag(def.name.clone(), def.initial);
        if let ElementKind::Tag(data) = &mut circuit.element_mut(tag)?.kind {
            data.properties = def.properties.clone();
        }
        circuit.set_block(tag, BlockRef::new(def.name.clone(), def.line))?;
        tags.insert(def.name.as_str(), tag);
    }

    let mut projects: HashMap<&str, ElementId> = HashMap::new();
    for ctx_def in &ast.contexts {
        let project = match projects.get(ctx_def.project.as_str()) {
            Some(&p) => p,
            None => {
                let p = circuit.add_project(ctx_def.project.clone());
                projects.insert(ctx_def.project.as_str(), p);
                p
            }
        };
        let context = circuit.add_context(project, ctx_def.name.clone())?;

        let mut blocks: HashMap<&str, ElementId> = HashMap::new();
        for block in &ctx_def.blocks {
            if blocks.contains_key(block.name.as_str()) {
                return Err(LogicSimError::DuplicateBlock {
                    name: block.name.clone(),
                });
            }
            let element = add_block(&mut circuit, context, block, &tags)?;
            circuit.set_block(element, BlockRef::new(block.name.clone(), block.line))?;
            blocks.insert(block.name.as_str(), element);
        }

        for wire in &ctx_def.wires {
            let start = resolve_point(&circuit, &blocks, &wire.start, wire.line)?;
            let end = resolve_point(&circuit, &blocks, &wire.end, wire.line)?;
            let id = circuit.add_wire(context, start, end, wire.start.inverted, wire.end.inverted)?;
            circuit.set_block(id, BlockRef::new("WIRE", wire.line))?;
        }

        clilog::debug!(
            "translated context '{}': {} blocks, {} wires",
            ctx_def.name,
            ctx_def.blocks.len(),
            ctx_def.wires.len()
        );
    }

    validate_circuit(&circuit)?;
    Ok(circuit)
}

fn add_block(
    circuit: &mut Circuit,
    context: ElementId,
    block: &BlockDef,
    tags: &HashMap<&str, ElementId>,
) -> Result<ElementId> {
    let block_type = BlockType::from_name(&block.kind).ok_or_else(|| LogicSimError::UnknownBlockKind {
        kind: block.kind.clone(),
        line: block.line,
    })?;

    match block_type {
        BlockType::Signal => {
            let tag = match &block.tag_ref {
                Some(name) => Some(*tags.get(name.as_str()).ok_or_else(|| LogicSimError::UndefinedTag {
                    tag: name.clone(),
                    block: block.name.clone(),
                })?),
                None => None,
            };
            circuit.add_signal(context, block.name.clone(), tag)
        }
        BlockType::And => circuit.add_gate(context, GateKind::And, block.name.clone()),
        BlockType::Or => circuit.add_gate(context, GateKind::Or, block.name.clone()),
        BlockType::TimerOn | BlockType::TimerOff | BlockType::TimerPulse => {
            let delay = block
                .value
                .or_else(|| block.params.get("delay").copied())
                .ok_or_else(|| {
                    LogicSimError::invalid_block(&block.name, block.line, "timer requires a delay")
                })?;
            let kind = match block_type {
                BlockType::TimerOn => TimerKind::On,
                BlockType::TimerOff => TimerKind::Off,
                _ => TimerKind::Pulse,
            };
            circuit.add_timer(context, kind, block.name.clone(), delay as f32)
        }
        BlockType::Pin => circuit.add_pin(context, block.name.clone()),
    }
}

fn resolve_point(
    circuit: &Circuit,
    blocks: &HashMap<&str, ElementId>,
    point: &PointRef,
    line: usize,
) -> Result<ElementId> {
    let undefined = || LogicSimError::UndefinedPoint {
        point: match &point.point {
            Some(p) => format!("{}:{}", point.block, p),
            None => point.block.clone(),
        },
        line,
    };

    let element = *blocks.get(point.block.as_str()).ok_or_else(undefined)?;
    let kind = &circuit.element(element)?.kind;

    let index = match (kind, point.point.as_deref()) {
        (ElementKind::Pin(_), None) => return Ok(element),
        (ElementKind::Signal(_), Some(name)) => SignalPoint::from_name(name).map(SignalPoint::index),
        (k, Some(name)) if k.is_logic() => GatePoint::from_name(name).map(GatePoint::index),
        _ => None,
    }
    .ok_or_else(undefined)?;

    circuit
        .pins_of(element)
        .get(index)
        .copied()
        .ok_or_else(undefined)
}
