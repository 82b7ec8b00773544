//! LogicSim - relay-logic diagram simulator
//!
//! # Usage
//!
//! ```bash
//! logicsim plant.lgc --set Start=true --cycles 200
//! logicsim plant.lgc --realtime 5
//! logicsim plant.lgc --emit-netlist plant.lgn
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use logicsim_core::{
    codec,
    error::{LogicSimError, Result},
    load_circuit, Runtime, Simulator, SimulatorConfig, StateChange, TriState,
};

/// Relay-logic circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit (.lgc block language or .lgn netlist)
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Number of cycles to simulate
    #[arg(short = 'n', long, default_value_t = 10)]
    cycles: u64,

    /// Write a tag before the first cycle (TAG=true|false|unknown)
    #[arg(short, long = "set", value_name = "TAG=VALUE")]
    set: Vec<String>,

    /// TOML configuration file with a [simulator] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cycle length in milliseconds (overrides the configuration)
    #[arg(short, long)]
    resolution_ms: Option<u32>,

    /// Log compile statistics
    #[arg(long)]
    trace: bool,

    /// Write the circuit as a binary netlist and exit
    #[arg(long, value_name = "NETLIST_FILE")]
    emit_netlist: Option<PathBuf>,

    /// Run in real time for this many seconds instead of stepping
    #[arg(long, value_name = "SECONDS")]
    realtime: Option<f64>,
}

fn parse_assignment(text: &str) -> Result<(String, TriState)> {
    let invalid = || LogicSimError::ConfigError {
        message: format!("expected TAG=VALUE, got '{}'", text),
    };
    let (tag, value) = text.split_once('=').ok_or_else(invalid)?;
    let value = TriState::parse(value.trim()).ok_or_else(invalid)?;
    Ok((tag.trim().to_string(), value))
}

fn realtime_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|e| LogicSimError::ConfigError {
        message: format!("invalid --realtime {}: {}", seconds, e),
    })
}

fn print_changes(cycle: u64, changes: &[StateChange]) {
    for change in changes {
        match &change.block {
            Some(block) => println!("{:>6} {} = {}", cycle, block, change.value),
            None => println!("{:>6} {} = {}", cycle, change.signal, change.value),
        }
    }
}

fn main() -> Result<()> {
    clilog::init_stderr_color_debug();
    let args = Args::parse();
    clilog::debug!("args: {:#?}", args);

    let circuit = load_circuit(&args.circuit_file)?;
    clilog::info!("loaded {} elements from {:?}", circuit.len(), args.circuit_file);

    if let Some(path) = &args.emit_netlist {
        codec::write_file(&circuit, path)?;
        clilog::info!("wrote netlist {:?}", path);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => SimulatorConfig::from_file(path)?,
        None => SimulatorConfig::default(),
    };
    if let Some(resolution_ms) = args.resolution_ms {
        config = config.with_resolution_ms(resolution_ms);
    }
    if args.trace {
        config = config.with_trace(true);
    }

    let mut simulator = Simulator::with_config(circuit, config);
    for assignment in &args.set {
        let (tag, value) = parse_assignment(assignment)?;
        simulator.set_tag(&tag, value)?;
    }

    match args.realtime {
        Some(seconds) => {
            let duration = realtime_duration(seconds)?;
            let mut runtime = Runtime::new(simulator);
            runtime.start(Box::new(|cycle: u64, changes: &[StateChange]| print_changes(cycle, changes)))?;
            std::thread::sleep(duration);
            runtime.stop()?;
        }
        None => {
            for _ in 0..args.cycles {
                let changes = simulator.step()?;
                print_changes(simulator.cycle(), &changes);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_duration_rejects_non_finite() {
        assert_eq!(realtime_duration(1.5).unwrap(), Duration::from_millis(1500));
        for bad in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(
                realtime_duration(bad),
                Err(LogicSimError::ConfigError { .. })
            ));
        }
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("Start=true").unwrap(),
            ("Start".to_string(), TriState::True)
        );
        assert!(parse_assignment("Start").is_err());
    }
}
