//! Binary netlist format.
//!
//! A netlist is a sequence of records followed by a trailing little-endian
//! `u32` record count. Every record starts with a `u16` command and a `u32`
//! sequence id; references inside a payload are sequence ids of earlier
//! records. All integers are little-endian.
//!
//! Hierarchy is implied by order: a Project opens a project under the
//! solution, a Context opens a context under the latest project, and pins,
//! signals, gates, timers and connections land in the latest context. Pins
//! are written before the element that owns them.
//!
//! Only tag names are stored; other elements get generated names on decode.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::circuit::{
    validate_circuit, Circuit, ElementId, ElementKind, TimerData, TriState, DEFAULT_SOLUTION,
};
use crate::error::{LogicSimError, Result};

/// Record commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    Solution = 0,
    Project = 1,
    Context = 2,
    Pin = 3,
    Signal = 4,
    AndGate = 5,
    OrGate = 6,
    TimerOn = 7,
    TimerOff = 8,
    TimerPulse = 9,
    Connect = 10,
    Tag = 11,
    BindTag = 12,
}

impl Command {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Command::Solution,
            1 => Command::Project,
            2 => Command::Context,
            3 => Command::Pin,
            4 => Command::Signal,
            5 => Command::AndGate,
            6 => Command::OrGate,
            7 => Command::TimerOn,
            8 => Command::TimerOff,
            9 => Command::TimerPulse,
            10 => Command::Connect,
            11 => Command::Tag,
            12 => Command::BindTag,
            _ => return None,
        })
    }
}

fn tri_to_u8(value: TriState) -> u8 {
    match value {
        TriState::False => 0,
        TriState::True => 1,
        TriState::Unknown => 2,
    }
}

fn tri_from_u8(value: u8) -> Result<TriState> {
    match value {
        0 => Ok(TriState::False),
        1 => Ok(TriState::True),
        2 => Ok(TriState::Unknown),
        other => Err(LogicSimError::malformed(format!("invalid tag initial value {}", other))),
    }
}

// ============ Writer ============

/// Serialises a circuit into the netlist format.
pub struct NetlistWriter<W: Write> {
    out: W,
    ids: HashMap<ElementId, u32>,
    records: u32,
}

impl<W: Write> NetlistWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            ids: HashMap::new(),
            records: 0,
        }
    }

    fn begin(&mut self, command: Command, element: Option<ElementId>) -> Result<()> {
        let seq = self.records;
        self.out.write_all(&(command as u16).to_le_bytes())?;
        self.out.write_all(&seq.to_le_bytes())?;
        if let Some(element) = element {
            self.ids.insert(element, seq);
        }
        self.records += 1;
        Ok(())
    }

    fn u8(&mut self, value: u8) -> Result<()> {
        self.out.write_all(&[value])?;
        Ok(())
    }

    fn u32(&mut self, value: u32) -> Result<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn f32(&mut self, value: f32) -> Result<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn reference(&mut self, element: ElementId) -> Result<()> {
        let seq = *self.ids.get(&element).ok_or_else(|| {
            LogicSimError::malformed(format!("{} referenced before it was written", element))
        })?;
        self.u32(seq)
    }

    /// Write the whole circuit plus the trailing record count.
    ///
    /// Records follow the tree's child order. Tag bindings go last, since a
    /// signal may be bound to a tag declared after it.
    pub fn write_circuit(mut self, circuit: &Circuit) -> Result<W> {
        self.begin(Command::Solution, Some(circuit.solution()))?;

        let mut bindings = Vec::new();
        for &child in &circuit.element(circuit.solution())?.children {
            let element = circuit.element(child)?;
            match &element.kind {
                ElementKind::Tag(data) => {
                    let name = element.name.as_bytes();
                    self.begin(Command::Tag, Some(child))?;
                    self.u32(name.len() as u32)?;
                    self.out.write_all(name)?;
                    self.u8(tri_to_u8(data.initial))?;
                }
                ElementKind::Project => {
                    self.begin(Command::Project, Some(child))?;
                    for &context in &element.children {
                        if matches!(circuit.element(context)?.kind, ElementKind::Context) {
                            self.write_context(circuit, context, &mut bindings)?;
                        }
                    }
                }
                _ => {}
            }
        }

        for (signal, tag) in bindings {
            self.begin(Command::BindTag, None)?;
            self.reference(signal)?;
            self.reference(tag)?;
        }

        self.out.write_all(&self.records.to_le_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_context(
        &mut self,
        circuit: &Circuit,
        context: ElementId,
        bindings: &mut Vec<(ElementId, ElementId)>,
    ) -> Result<()> {
        self.begin(Command::Context, Some(context))?;

        for &child in &circuit.element(context)?.children {
            let element = circuit.element(child)?;
            let command = match &element.kind {
                ElementKind::Pin(_) => {
                    self.begin(Command::Pin, Some(child))?;
                    continue;
                }
                ElementKind::Wire(data) => {
                    self.begin(Command::Connect, Some(child))?;
                    self.reference(data.start)?;
                    self.reference(data.end)?;
                    self.u8(data.invert_start as u8)?;
                    self.u8(data.invert_end as u8)?;
                    continue;
                }
                ElementKind::Signal(s) => {
                    if let Some(tag) = s.tag {
                        bindings.push((child, tag));
                    }
                    Command::Signal
                }
                ElementKind::AndGate => Command::AndGate,
                ElementKind::OrGate => Command::OrGate,
                ElementKind::TimerOn(_) => Command::TimerOn,
                ElementKind::TimerOff(_) => Command::TimerOff,
                ElementKind::TimerPulse(_) => Command::TimerPulse,
                other => {
                    return Err(LogicSimError::Unsupported {
                        element: child,
                        kind: other.name(),
                        operation: "encode",
                    })
                }
            };

            let pins = circuit.pins_of(child);
            for &pin in &pins {
                self.begin(Command::Pin, Some(pin))?;
            }
            self.begin(command, Some(child))?;
            for &pin in &pins {
                self.reference(pin)?;
            }
            if let Some(timer) = element.kind.timer() {
                self.f32(timer.delay)?;
            }
        }

        Ok(())
    }
}

// ============ Reader ============

/// Rebuilds a circuit from the netlist format.
pub struct NetlistReader<R: Read + Seek> {
    input: R,
    offset: u64,
    /// Offset of the trailing record count
    body_end: u64,
    ids: HashMap<u32, ElementId>,
}

impl<R: Read + Seek> NetlistReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            offset: 0,
            body_end: 0,
            ids: HashMap::new(),
        }
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.input.read_exact(&mut buf).map_err(|e| {
            LogicSimError::malformed(format!("truncated record at byte {}: {}", self.offset, e))
        })?;
        self.offset += N as u64;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.bytes()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.bytes()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }

    fn string(&mut self) -> Result<String> {
        let len = u64::from(self.u32()?);
        let remaining = self.body_end.saturating_sub(self.offset);
        if len > remaining {
            return Err(LogicSimError::malformed(format!(
                "string of {} bytes at byte {} overruns the body",
                len, self.offset
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.input
            .read_exact(&mut buf)
            .map_err(|e| LogicSimError::malformed(format!("truncated string: {}", e)))?;
        self.offset += len;
        String::from_utf8(buf).map_err(|e| LogicSimError::malformed(e.to_string()))
    }

    fn reference(&mut self, record: u32) -> Result<ElementId> {
        let seq = self.u32()?;
        self.ids
            .get(&seq)
            .copied()
            .ok_or(LogicSimError::UnknownReference {
                record,
                reference: seq,
            })
    }

    fn pins<const N: usize>(&mut self, record: u32) -> Result<[ElementId; N]> {
        let mut pins = [ElementId(0); N];
        for pin in pins.iter_mut() {
            *pin = self.reference(record)?;
        }
        Ok(pins)
    }

    /// Read every record and validate the resulting circuit.
    pub fn read_circuit(mut self) -> Result<Circuit> {
        let end = self.input.seek(SeekFrom::End(0))?;
        if end < 4 {
            return Err(LogicSimError::malformed("missing record count"));
        }
        self.body_end = end - 4;
        self.input.seek(SeekFrom::Start(self.body_end))?;
        let count = self.u32()?;
        self.input.seek(SeekFrom::Start(0))?;
        self.offset = 0;

        let mut circuit: Option<Circuit> = None;
        let mut project: Option<ElementId> = None;
        let mut context: Option<ElementId> = None;

        for _ in 0..count {
            let at = self.offset;
            let raw = self.u16()?;
            let seq = self.u32()?;
            let command = Command::from_u16(raw).ok_or(LogicSimError::UnsupportedCommand {
                command: raw,
                offset: at,
            })?;

            if circuit.is_none() {
                if command != Command::Solution {
                    return Err(LogicSimError::malformed("record before solution"));
                }
                let c = Circuit::new(DEFAULT_SOLUTION);
                self.ids.insert(seq, c.solution());
                circuit = Some(c);
                continue;
            }
            let c = circuit
                .as_mut()
                .ok_or_else(|| LogicSimError::malformed("record before solution"))?;

            let id = match command {
                Command::Solution => return Err(LogicSimError::malformed("second solution record")),
                Command::Project => {
                    let id = c.add_project(format!("Project{}", seq));
                    project = Some(id);
                    context = None;
                    id
                }
                Command::Context => {
                    let p = project.ok_or_else(|| LogicSimError::malformed("context outside a project"))?;
                    let id = c.add_context(p, format!("Context{}", seq))?;
                    context = Some(id);
                    id
                }
                Command::Pin => c.add_pin(current(context, command)?, format!("P{}", seq))?,
                Command::Signal => {
                    let pins = self.pins::<2>(seq)?;
                    c.signal_from_pins(current(context, command)?, format!("S{}", seq), None, pins)?
                }
                Command::AndGate | Command::OrGate => {
                    let pins = self.pins::<4>(seq)?;
                    let kind = if command == Command::AndGate {
                        ElementKind::AndGate
                    } else {
                        ElementKind::OrGate
                    };
                    c.logic_from_pins(current(context, command)?, kind, format!("G{}", seq), pins)?
                }
                Command::TimerOn | Command::TimerOff | Command::TimerPulse => {
                    let pins = self.pins::<4>(seq)?;
                    let data = TimerData { delay: self.f32()? };
                    let kind = match command {
                        Command::TimerOn => ElementKind::TimerOn(data),
                        Command::TimerOff => ElementKind::TimerOff(data),
                        _ => ElementKind::TimerPulse(data),
                    };
                    c.logic_from_pins(current(context, command)?, kind, format!("T{}", seq), pins)?
                }
                Command::Connect => {
                    let [start, end] = self.pins::<2>(seq)?;
                    let invert_start = self.u8()? != 0;
                    let invert_end = self.u8()? != 0;
                    c.add_wire(current(context, command)?, start, end, invert_start, invert_end)?
                }
                Command::Tag => {
                    let name = self.string()?;
                    let initial = tri_from_u8(self.u8()?)?;
                    c.add_tag(name, initial)
                }
                Command::BindTag => {
                    let [signal, tag] = self.pins::<2>(seq)?;
                    c.bind_tag(signal, tag)?;
                    continue;
                }
            };
            self.ids.insert(seq, id);
        }

        if self.offset != self.body_end {
            return Err(LogicSimError::malformed(format!(
                "{} records end at byte {}, body ends at byte {}",
                count, self.offset, self.body_end
            )));
        }
        let circuit = circuit.ok_or_else(|| LogicSimError::malformed("no solution record"))?;
        validate_circuit(&circuit)?;
        Ok(circuit)
    }
}

fn current(context: Option<ElementId>, command: Command) -> Result<ElementId> {
    context.ok_or_else(|| LogicSimError::malformed(format!("{:?} outside a context", command)))
}

// ============ Convenience ============

/// Encode a circuit to a writer.
pub fn encode<W: Write>(circuit: &Circuit, out: W) -> Result<W> {
    NetlistWriter::new(out).write_circuit(circuit)
}

pub fn encode_to_vec(circuit: &Circuit) -> Result<Vec<u8>> {
    encode(circuit, Vec::new())
}

/// Decode a circuit from a seekable reader.
pub fn decode<R: Read + Seek>(input: R) -> Result<Circuit> {
    NetlistReader::new(input).read_circuit()
}

pub fn decode_slice(bytes: &[u8]) -> Result<Circuit> {
    decode(Cursor::new(bytes))
}

/// Write a netlist file.
pub fn write_file<P: AsRef<Path>>(circuit: &Circuit, path: P) -> Result<()> {
    let file = File::create(path)?;
    encode(circuit, BufWriter::new(file))?;
    Ok(())
}

/// Read a netlist file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Circuit> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| LogicSimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    decode(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::translate;
    use crate::dsl;
    use approx::assert_relative_eq;

    const SOURCE: &str = r#"
.tag Start true
.tag Lamp
SIGNAL S1 Start
SIGNAL S2
SIGNAL S3 Lamp
PIN J1
AND A1
TIMER-OFF T1 0.25
WIRE S1:out J1
WIRE J1 A1:left
WIRE !S2:out A1:right
WIRE A1:bottom T1:left
WIRE T1:right S3:in
"#;

    fn circuit() -> Circuit {
        translate(&dsl::parse(SOURCE).unwrap()).unwrap()
    }

    /// Kind, parent and children of every element.
    fn shape(c: &Circuit) -> Vec<(&'static str, Option<ElementId>, Vec<ElementId>)> {
        c.iter()
            .map(|e| (e.kind.name(), e.parent, e.children.clone()))
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let original = circuit();
        let bytes = encode_to_vec(&original).unwrap();
        let decoded = decode_slice(&bytes).unwrap();

        assert_eq!(shape(&original), shape(&decoded));
        let wires = |c: &Circuit| c.wires().map(|(_, w)| *w).collect::<Vec<_>>();
        assert_eq!(wires(&original), wires(&decoded));

        let tags = |c: &Circuit| {
            c.tags()
                .map(|(id, t)| (c.get(id).unwrap().name.clone(), t.initial))
                .collect::<Vec<_>>()
        };
        assert_eq!(tags(&original), tags(&decoded));

        let delay = decoded
            .iter()
            .find_map(|e| e.kind.timer().map(|t| t.delay))
            .unwrap();
        assert_relative_eq!(delay, 0.25f32);
    }

    /// Kind names in tree order, children after their parent.
    fn tree_kinds(c: &Circuit) -> Vec<&'static str> {
        fn walk(c: &Circuit, id: ElementId, out: &mut Vec<&'static str>) {
            let element = c.get(id).unwrap();
            out.push(element.kind.name());
            for &child in &element.children {
                walk(c, child, out);
            }
        }
        let mut out = Vec::new();
        walk(c, c.solution(), &mut out);
        out
    }

    #[test]
    fn test_round_trip_keeps_interleaved_order() {
        use crate::circuit::GateKind;

        let mut c = Circuit::new("S");
        let p1 = c.add_project("P1");
        let ctx = c.add_context(p1, "C1").unwrap();
        let s1 = c.add_signal(ctx, "S1", None).unwrap();
        let j = c.add_pin(ctx, "J").unwrap();
        c.add_wire(ctx, c.pins_of(s1)[1], j, false, true).unwrap();
        let g = c.add_gate(ctx, GateKind::And, "A1").unwrap();
        c.add_wire(ctx, j, c.pins_of(g)[0], true, false).unwrap();
        let tag = c.add_tag("Lamp", TriState::False);
        let p2 = c.add_project("P2");
        let ctx2 = c.add_context(p2, "C2").unwrap();
        c.add_signal(ctx2, "S2", Some(tag)).unwrap();
        c.bind_tag(s1, tag).unwrap();

        let decoded = decode_slice(&encode_to_vec(&c).unwrap()).unwrap();
        assert_eq!(tree_kinds(&c), tree_kinds(&decoded));
        assert_eq!(shape(&c), shape(&decoded));
        let wires = |c: &Circuit| c.wires().map(|(_, w)| *w).collect::<Vec<_>>();
        assert_eq!(wires(&c), wires(&decoded));
        let decoded_tag = decoded.find_tag("Lamp").unwrap();
        assert_eq!(decoded.signals_of_tag(decoded_tag).len(), 2);
    }

    #[test]
    fn test_short_record_count_is_rejected() {
        let mut bytes = encode_to_vec(&circuit()).unwrap();
        let n = bytes.len();
        let count = u32::from_le_bytes([bytes[n - 4], bytes[n - 3], bytes[n - 2], bytes[n - 1]]);
        bytes[n - 4..].copy_from_slice(&(count - 1).to_le_bytes());
        assert!(matches!(
            decode_slice(&bytes),
            Err(LogicSimError::MalformedNetlist { .. })
        ));
    }

    #[test]
    fn test_oversized_string_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&11u16.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            decode_slice(&bytes),
            Err(LogicSimError::MalformedNetlist { .. })
        ));
    }

    #[test]
    fn test_trailing_count_matches_records() {
        let bytes = encode_to_vec(&circuit()).unwrap();
        let n = bytes.len();
        let count = u32::from_le_bytes([bytes[n - 4], bytes[n - 3], bytes[n - 2], bytes[n - 1]]);
        // solution, 2 tags, project, context, 3 signals (+6 pins), junction,
        // gate (+4 pins), timer (+4 pins), 2 bindings, 5 wires
        assert_eq!(count, 1 + 2 + 1 + 1 + 9 + 1 + 5 + 5 + 2 + 5);
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), Command::Solution as u16);
    }

    #[test]
    fn test_unsupported_command_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&42u16.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            decode_slice(&bytes),
            Err(LogicSimError::UnsupportedCommand { command: 42, offset: 6 })
        ));
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let mut bytes = Vec::new();
        for (cmd, seq) in [(0u16, 0u32), (1, 1), (2, 2)] {
            bytes.extend_from_slice(&cmd.to_le_bytes());
            bytes.extend_from_slice(&seq.to_le_bytes());
        }
        bytes.extend_from_slice(&4u16.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        assert!(matches!(
            decode_slice(&bytes),
            Err(LogicSimError::UnknownReference { record: 3, reference: 7 })
        ));
    }

    #[test]
    fn test_memory_latch_cannot_be_encoded() {
        let mut c = Circuit::new("S");
        let p = c.add_project("P");
        let ctx = c.add_context(p, "C").unwrap();
        c.add_memory(ctx, crate::circuit::MemoryKind::SetPriority, "M1").unwrap();
        assert!(matches!(
            encode_to_vec(&c),
            Err(LogicSimError::Unsupported { operation: "encode", .. })
        ));
    }
}
