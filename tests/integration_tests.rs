//! End-to-end tests: block language → circuit → plan → cycles.

use logicsim_core::circuit::{translate, Circuit, Direction};
use logicsim_core::codec;
use logicsim_core::dsl;
use logicsim_core::{Compiler, LogicSimError, Simulator, SimulatorConfig, TriState};

fn load(src: &str) -> Circuit {
    translate(&dsl::parse(src).unwrap()).unwrap()
}

fn simulator(src: &str) -> Simulator {
    Simulator::with_config(load(src), SimulatorConfig::default().with_resolution_ms(10))
}

fn element(circuit: &Circuit, name: &str) -> logicsim_core::ElementId {
    circuit.iter().find(|e| e.name == name).unwrap().id
}

const START_STOP: &str = r#"
.solution Plant
.project Line1
.context Main
.tag Start false
.tag Stop false
.tag Lamp

SIGNAL S1 Start
SIGNAL S2 Stop
SIGNAL S3 Lamp
PIN J1
AND A1
WIRE S1:out J1
WIRE J1 A1:left
WIRE !S2:out A1:right
WIRE A1:bottom S3:in
"#;

/// Start ∧ ¬Stop drives the lamp.
#[test]
fn test_and_circuit_end_to_end() {
    let mut sim = simulator(START_STOP);

    sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::False);

    sim.set_tag("Start", TriState::True).unwrap();
    let changes = sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::True);
    let blocks: Vec<String> = changes
        .iter()
        .filter_map(|c| c.block.as_ref().map(|b| b.name.clone()))
        .collect();
    assert!(blocks.contains(&"S1".to_string()));
    assert!(blocks.contains(&"S3".to_string()));

    sim.set_tag("Stop", TriState::True).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::False);
}

const TWO_INPUT_AND: &str = r#"
.tag A false
.tag B false
.tag Out
SIGNAL S1 A
SIGNAL S2 B
SIGNAL S3 Out
PIN J1
AND A1
WIRE S1:out J1
WIRE J1 A1:left
WIRE S2:out A1:right
WIRE A1:bottom S3:in
"#;

/// Plain wires through a junction: S3 = S1 ∧ S2.
#[test]
fn test_two_input_and_through_junction() {
    let mut sim = simulator(TWO_INPUT_AND);
    sim.set_tag("A", TriState::True).unwrap();
    sim.set_tag("B", TriState::True).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Out").unwrap(), TriState::True);

    sim.set_tag("A", TriState::False).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Out").unwrap(), TriState::False);
}

/// An unknown input is absorbed where Kleene logic decides the result.
#[test]
fn test_unknown_propagation() {
    let mut sim = simulator(START_STOP);
    sim.set_tag("Start", TriState::Unknown).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::Unknown);

    sim.set_tag("Stop", TriState::True).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::False);
}

#[test]
fn test_netlist_round_trip_simulates_identically() {
    let original = load(START_STOP);
    let bytes = codec::encode_to_vec(&original).unwrap();
    let decoded = codec::decode_slice(&bytes).unwrap();
    assert_eq!(original.len(), decoded.len());

    let config = SimulatorConfig::default().with_resolution_ms(10);
    let mut a = Simulator::with_config(original, config.clone());
    let mut b = Simulator::with_config(decoded, config);
    let inputs = [
        (TriState::True, TriState::False),
        (TriState::True, TriState::True),
        (TriState::False, TriState::False),
        (TriState::Unknown, TriState::False),
    ];
    for (start, stop) in inputs {
        for sim in [&mut a, &mut b] {
            sim.set_tag("Start", start).unwrap();
            sim.set_tag("Stop", stop).unwrap();
            sim.step().unwrap();
        }
        assert_eq!(a.tag_value("Lamp").unwrap(), b.tag_value("Lamp").unwrap());
    }
}

#[test]
fn test_netlist_file_round_trip() {
    let path = std::env::temp_dir().join(format!("logicsim-{}.lgn", std::process::id()));
    codec::write_file(&load(START_STOP), &path).unwrap();
    let circuit = logicsim_core::load_circuit(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(circuit.find_tag("Lamp").is_some());
}

/// Every evaluable strategy appears exactly once, after what it reads.
#[test]
fn test_order_is_topological() {
    let mut circuit = load(
        r#"
.tag A
.tag B
.tag Out
SIGNAL SA A
SIGNAL SB B
SIGNAL SO Out
OR O1
OR O2
AND A3
WIRE SA:out O1:left
WIRE SB:out O1:right
WIRE O1:bottom O2:left
WIRE SB:out O2:right
WIRE O2:bottom A3:left
WIRE O1:bottom A3:right
WIRE A3:bottom SO:in
"#,
    );
    let plan = Compiler::default().compile(&mut circuit).unwrap();
    let order = plan.order();

    let pos = |name: &str| {
        let id = element(&circuit, name);
        let hits: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == id)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits.len(), 1, "{} must appear once", name);
        hits[0]
    };
    assert!(pos("O1") < pos("O2"));
    assert!(pos("O2") < pos("A3"));
    assert!(pos("O1") < pos("A3"));
    assert!(pos("A3") < pos("Out"));
    assert_eq!(order.len(), plan.evaluable_count());
    assert_eq!(plan.cycles_detected(), 0);
}

#[test]
fn test_directions_survive_recompile() {
    let mut circuit = load(START_STOP);
    Compiler::default().compile(&mut circuit).unwrap();
    let first: Vec<Direction> = circuit.iter().map(|e| circuit.direction(e.id)).collect();
    Compiler::default().compile(&mut circuit).unwrap();
    let second: Vec<Direction> = circuit.iter().map(|e| circuit.direction(e.id)).collect();
    assert_eq!(first, second);

    let a1 = element(&circuit, "A1");
    let pins = circuit.pins_of(a1);
    assert_eq!(circuit.direction(pins[0]), Direction::Input);
    assert_eq!(circuit.direction(pins[3]), Direction::Output);
    assert_eq!(circuit.direction(element(&circuit, "J1")), Direction::Undefined);
}

#[test]
fn test_gate_without_inputs_is_not_evaluated() {
    let mut circuit = load(
        ".tag Lamp\nSIGNAL S3 Lamp\nAND A1\nWIRE A1:bottom S3:in\n",
    );
    let plan = Compiler::default().compile(&mut circuit).unwrap();
    assert!(!plan.is_evaluable(element(&circuit, "A1")));
}

#[test]
fn test_single_input_gate_reads_unknown() {
    let mut sim = simulator(
        ".tag Start true\n.tag Lamp false\nSIGNAL S1 Start\nSIGNAL S3 Lamp\nAND A1\nWIRE S1:out A1:left\nWIRE A1:bottom S3:in\n",
    );
    for _ in 0..3 {
        sim.step().unwrap();
        assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::Unknown);
    }
}

#[test]
fn test_feedback_loop_is_tolerated() {
    let src = r#"
.tag In true
.tag Out
SIGNAL SI In
SIGNAL SO Out
OR O1
OR O2
WIRE SI:out O1:left
WIRE O1:bottom O2:left
WIRE O2:bottom O1:right
WIRE O2:bottom SO:in
"#;
    let mut circuit = load(src);
    let plan = Compiler::default().compile(&mut circuit).unwrap();
    assert!(plan.cycles_detected() >= 1);

    let mut sim = simulator(src);
    sim.run(5).unwrap();
}

#[test]
fn test_off_delay_holds_lamp() {
    let mut sim = simulator(
        r#"
.tag Button false
.tag Lamp
SIGNAL S1 Button
SIGNAL S2 Lamp
TIMER-OFF T1 delay=0.03
WIRE S1:out T1:left
WIRE T1:right S2:in
"#,
    );
    sim.set_tag("Button", TriState::True).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::True);

    sim.set_tag("Button", TriState::False).unwrap();
    let mut lamp = Vec::new();
    for _ in 0..5 {
        sim.step().unwrap();
        lamp.push(sim.tag_value("Lamp").unwrap());
    }
    assert_eq!(
        lamp,
        vec![
            TriState::True,
            TriState::True,
            TriState::True,
            TriState::False,
            TriState::False
        ]
    );
}

#[test]
fn test_pulse_fires_once_per_press() {
    let mut sim = simulator(
        r#"
.tag Button false
.tag Lamp
SIGNAL S1 Button
SIGNAL S2 Lamp
TIMER-PULSE T1 20ms
WIRE S1:out T1:left
WIRE T1:right S2:in
"#,
    );
    sim.step().unwrap();
    sim.set_tag("Button", TriState::True).unwrap();
    let mut lamp = Vec::new();
    for _ in 0..5 {
        sim.step().unwrap();
        lamp.push(sim.tag_value("Lamp").unwrap());
    }
    assert_eq!(
        lamp,
        vec![
            TriState::True,
            TriState::True,
            TriState::False,
            TriState::False,
            TriState::False
        ]
    );
}

#[test]
fn test_unknown_block_kind_is_fatal() {
    let ast = dsl::parse("SIGNAL S1\nMEMORY-RS M1\n").unwrap();
    assert!(matches!(
        translate(&ast),
        Err(LogicSimError::UnknownBlockKind { .. })
    ));
}

#[test]
fn test_zero_resolution_fails_compile() {
    let mut sim = Simulator::with_config(
        load(START_STOP),
        SimulatorConfig::default().with_resolution_ms(0),
    );
    assert!(matches!(
        sim.step(),
        Err(LogicSimError::InvalidResolution { .. })
    ));
}
