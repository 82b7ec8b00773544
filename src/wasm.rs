//! WASM bindings for LogicSim Core.
//!
//! Browsers have no background threads to spare, so the page drives the
//! clock itself (e.g. from `setInterval`) by calling `step`.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmLogicSim } from 'logicsim_core';
//!
//! await init();
//!
//! const sim = new WasmLogicSim(`
//!   .tag Start false
//!   .tag Lamp
//!   SIGNAL S1 Start
//!   SIGNAL S2 Lamp
//!   TIMER-ON T1 0.5
//!   WIRE S1:out T1:left
//!   WIRE T1:right S2:in
//! `, 10);
//!
//! sim.set_tag("Start", true);
//! setInterval(() => {
//!   for (const block of sim.step()) console.log(block, sim.tag_value("Lamp"));
//! }, sim.resolution_ms);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{translate, TriState};
use crate::dsl;
use crate::error::LogicSimError;
use crate::sim::{Simulator, SimulatorConfig};

fn to_js(e: LogicSimError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// WASM-compatible logic simulator.
///
/// Tri-state values cross the boundary as `true`, `false` or `undefined`.
#[wasm_bindgen]
pub struct WasmLogicSim {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmLogicSim {
    /// Create a simulator from block-language source.
    ///
    /// # Arguments
    /// * `source` - The diagram in block-language format
    /// * `resolution_ms` - Cycle length in milliseconds (must be non-zero)
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, resolution_ms: u32) -> Result<WasmLogicSim, JsValue> {
        let ast = dsl::parse(source).map_err(to_js)?;
        let circuit = translate(&ast).map_err(to_js)?;
        let config = SimulatorConfig::new().with_resolution_ms(resolution_ms);
        let mut simulator = Simulator::with_config(circuit, config);
        simulator.compile().map_err(to_js)?;
        Ok(WasmLogicSim { simulator })
    }

    /// Create a simulator from a binary netlist.
    #[wasm_bindgen]
    pub fn from_netlist(bytes: &[u8], resolution_ms: u32) -> Result<WasmLogicSim, JsValue> {
        let circuit = crate::codec::decode_slice(bytes).map_err(to_js)?;
        let config = SimulatorConfig::new().with_resolution_ms(resolution_ms);
        let mut simulator = Simulator::with_config(circuit, config);
        simulator.compile().map_err(to_js)?;
        Ok(WasmLogicSim { simulator })
    }

    /// Run one cycle. Returns the block names of signals whose tag changed.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<Vec<JsValue>, JsValue> {
        let changes = self.simulator.step().map_err(to_js)?;
        Ok(changes
            .iter()
            .filter_map(|c| c.block.as_ref())
            .map(|b| JsValue::from_str(&b.name))
            .collect())
    }

    /// Write a tag. `undefined` writes unknown.
    #[wasm_bindgen]
    pub fn set_tag(&mut self, name: &str, value: Option<bool>) -> Result<(), JsValue> {
        self.simulator
            .set_tag(name, TriState::from(value))
            .map_err(to_js)
    }

    /// Current value of a tag, `undefined` when unknown.
    #[wasm_bindgen]
    pub fn tag_value(&self, name: &str) -> Result<Option<bool>, JsValue> {
        self.simulator
            .tag_value(name)
            .map(TriState::to_option)
            .map_err(to_js)
    }

    /// Encode the loaded circuit as a binary netlist.
    #[wasm_bindgen]
    pub fn to_netlist(&self) -> Result<Vec<u8>, JsValue> {
        crate::codec::encode_to_vec(self.simulator.circuit()).map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn cycle(&self) -> u64 {
        self.simulator.cycle()
    }

    #[wasm_bindgen(getter)]
    pub fn resolution_ms(&self) -> u32 {
        self.simulator.config().resolution_ms
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
