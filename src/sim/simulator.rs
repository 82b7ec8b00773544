//! Synchronous simulator interface.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::circuit::{BlockRef, Circuit, ElementId, TriState};
use crate::compiler::{Compiler, Plan};
use crate::error::{LogicSimError, Result};

use super::DEFAULT_RESOLUTION_MS;

fn default_resolution_ms() -> u32 {
    DEFAULT_RESOLUTION_MS
}

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulatorConfig {
    /// Length of one cycle in milliseconds. Must be non-zero.
    #[serde(default = "default_resolution_ms")]
    pub resolution_ms: u32,
    /// Wall-clock period between runtime ticks in milliseconds. Defaults to
    /// the resolution.
    #[serde(default)]
    pub period_ms: Option<u64>,
    /// Log compile statistics at debug level.
    #[serde(default)]
    pub trace: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            resolution_ms: DEFAULT_RESOLUTION_MS,
            period_ms: None,
            trace: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    simulator: SimulatorConfig,
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle length in milliseconds.
    pub fn with_resolution_ms(mut self, resolution_ms: u32) -> Self {
        self.resolution_ms = resolution_ms;
        self
    }

    /// Set the wall-clock tick period of the runtime.
    ///
    /// A period shorter than the resolution runs the simulation faster than
    /// real time.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period_ms = Some(period.as_millis() as u64);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Tick period of the runtime.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.unwrap_or(u64::from(self.resolution_ms)))
    }

    /// Parse a `[simulator]` table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| LogicSimError::ConfigError {
            message: e.to_string(),
        })?;
        Ok(file.simulator)
    }

    /// Load a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LogicSimError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }
}

/// A bound tag whose value changed, reported once per mapped signal.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Diagram block of the signal, if it came from one
    pub block: Option<BlockRef>,
    pub signal: ElementId,
    pub tag: ElementId,
    pub value: TriState,
}

/// Owns a circuit and its compiled plan, and steps it one cycle at a time.
pub struct Simulator {
    circuit: Circuit,
    config: SimulatorConfig,
    plan: Option<Plan>,
    /// Last reported value of each bound tag
    reported: HashMap<ElementId, TriState>,
}

impl Simulator {
    /// Create a new simulator with default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        Self {
            circuit,
            config,
            plan: None,
            reported: HashMap::new(),
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Mutable access to the circuit. Discards the compiled plan.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        self.reset();
        &mut self.circuit
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// The compiled plan, if any.
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        self.plan.is_some()
    }

    /// Compile the circuit if no plan exists yet.
    pub fn compile(&mut self) -> Result<&Plan> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => {
                let plan = Compiler::new(self.config.clone()).compile(&mut self.circuit)?;
                clilog::info!(
                    "compiled {}: {} strategies, {} evaluable",
                    self.circuit.get(self.circuit.solution()).map(|e| e.name.as_str()).unwrap_or("circuit"),
                    plan.len(),
                    plan.evaluable_count()
                );
                self.reported.clear();
                plan
            }
        };
        Ok(&*self.plan.insert(plan))
    }

    /// Run one cycle and return the bound tags whose value changed.
    ///
    /// The first cycle after compiling reports every bound tag.
    pub fn step(&mut self) -> Result<Vec<StateChange>> {
        self.compile()?;
        let plan = match self.plan.as_mut() {
            Some(plan) => plan,
            None => return Ok(Vec::new()),
        };
        plan.evaluate();

        let mut changes = Vec::new();
        for bound in plan.bound_tags() {
            let value = plan.states[bound.slot];
            if self.reported.insert(bound.tag, value) == Some(value) {
                continue;
            }
            for (signal, block) in &bound.signals {
                changes.push(StateChange {
                    block: block.clone(),
                    signal: *signal,
                    tag: bound.tag,
                    value,
                });
            }
        }
        Ok(changes)
    }

    /// Run `cycles` cycles, collecting every change.
    pub fn run(&mut self, cycles: u64) -> Result<Vec<StateChange>> {
        let mut all = Vec::new();
        for _ in 0..cycles {
            all.extend(self.step()?);
        }
        Ok(all)
    }

    /// Current cycle (0 before the first step).
    pub fn cycle(&self) -> u64 {
        self.plan.as_ref().map(|p| p.clock().cycle).unwrap_or(0)
    }

    fn tag_id(&self, name: &str) -> Result<ElementId> {
        self.circuit
            .find_tag(name)
            .ok_or_else(|| LogicSimError::TagNotFound { name: name.to_string() })
    }

    /// Write a tag's cell. Compiles first if needed.
    pub fn set_tag(&mut self, name: &str, value: TriState) -> Result<()> {
        let tag = self.tag_id(name)?;
        self.set_tag_id(tag, value)
    }

    pub fn set_tag_id(&mut self, tag: ElementId, value: TriState) -> Result<()> {
        self.compile()?;
        match self.plan.as_mut() {
            Some(plan) => plan.set_value(tag, value),
            None => Err(LogicSimError::ElementNotFound { id: tag }),
        }
    }

    /// Current value of a tag. Before compiling, the declared initial value.
    pub fn tag_value(&self, name: &str) -> Result<TriState> {
        let tag = self.tag_id(name)?;
        if let Some(value) = self.plan.as_ref().and_then(|p| p.value(tag)) {
            return Ok(value);
        }
        Ok(self
            .circuit
            .tags()
            .find(|(id, _)| *id == tag)
            .map(|(_, data)| data.initial)
            .unwrap_or_default())
    }

    /// Drop the plan and all transient compile state.
    pub fn reset(&mut self) {
        self.plan = None;
        self.reported.clear();
        self.circuit.clear_transient();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;
    use crate::circuit::translate;

    const TIMER_CIRCUIT: &str = r#"
.tag Start false
.tag Lamp
SIGNAL S1 Start
SIGNAL S2 Lamp
TIMER-ON T1 50ms
WIRE S1:out T1:left
WIRE T1:right S2:in
"#;

    fn simulator(src: &str) -> Simulator {
        let ast = dsl::parse(src).unwrap();
        let circuit = translate(&ast).unwrap();
        Simulator::with_config(circuit, SimulatorConfig::default().with_resolution_ms(10))
    }

    #[test]
    fn test_first_step_reports_all_bound_tags() {
        let mut sim = simulator(TIMER_CIRCUIT);
        let changes = sim.step().unwrap();
        assert_eq!(changes.len(), 2);
        assert!(sim.step().unwrap().is_empty());
    }

    #[test]
    fn test_on_delay_through_simulator() {
        let mut sim = simulator(TIMER_CIRCUIT);
        sim.step().unwrap();
        sim.set_tag("Start", TriState::True).unwrap();
        let mut fired_at = None;
        for _ in 0..10 {
            let changes = sim.step().unwrap();
            let lamp_on = changes
                .iter()
                .any(|c| c.block.as_ref().map(|b| b.name.as_str()) == Some("S2") && c.value == TriState::True);
            if lamp_on {
                fired_at = Some(sim.cycle());
                break;
            }
        }
        // enable first seen at cycle 2, which is the first of the 5 delay cycles
        assert_eq!(fired_at, Some(6));
        assert_eq!(sim.tag_value("Lamp").unwrap(), TriState::True);
    }

    #[test]
    fn test_changes_carry_signal_block() {
        let mut sim = simulator(TIMER_CIRCUIT);
        let changes = sim.step().unwrap();
        let lamp = changes.iter().find(|c| c.block.as_ref().map(|b| b.name.as_str()) == Some("S2"));
        assert!(lamp.is_some());
    }

    #[test]
    fn test_circuit_mut_discards_plan() {
        let mut sim = simulator(TIMER_CIRCUIT);
        sim.compile().unwrap();
        assert!(sim.is_compiled());
        sim.circuit_mut();
        assert!(!sim.is_compiled());
        assert_eq!(sim.cycle(), 0);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let mut sim = simulator(TIMER_CIRCUIT);
        assert!(matches!(
            sim.set_tag("Nope", TriState::True),
            Err(LogicSimError::TagNotFound { .. })
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config = SimulatorConfig::from_toml_str(
            "[simulator]\nresolution_ms = 5\nperiod_ms = 20\ntrace = true\n",
        )
        .unwrap();
        assert_eq!(config.resolution_ms, 5);
        assert_eq!(config.period(), Duration::from_millis(20));
        assert!(config.trace);

        let defaults = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(defaults, SimulatorConfig::default());
        assert_eq!(defaults.period(), Duration::from_millis(u64::from(DEFAULT_RESOLUTION_MS)));

        assert!(matches!(
            SimulatorConfig::from_toml_str("[simulator]\nresolution_ms = \"fast\""),
            Err(LogicSimError::ConfigError { .. })
        ));
    }
}
