//! Background, clock-driven runtime.
//!
//! A worker thread ticks a shared [`Simulator`] at the configured period and
//! hands every non-empty batch of [`StateChange`]s to a sink. Ticks that
//! fall behind run back to back instead of being skipped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as chan;

use super::simulator::{Simulator, StateChange};
use crate::error::{LogicSimError, Result};

/// Receives the state changes of one cycle. Called from the worker thread
/// without the simulator lock held.
pub type StateSink = Box<dyn FnMut(u64, &[StateChange]) + Send>;

struct Worker {
    stop: chan::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives a [`Simulator`] in real time.
pub struct Runtime {
    simulator: Arc<Mutex<Simulator>>,
    worker: Option<Worker>,
}

fn lock(simulator: &Mutex<Simulator>) -> Result<MutexGuard<'_, Simulator>> {
    simulator.lock().map_err(|_| LogicSimError::RuntimeError {
        message: "simulator lock poisoned".to_string(),
    })
}

impl Runtime {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            simulator: Arc::new(Mutex::new(simulator)),
            worker: None,
        }
    }

    /// Shared handle to the simulator, e.g. for writing tags while running.
    pub fn simulator(&self) -> Arc<Mutex<Simulator>> {
        Arc::clone(&self.simulator)
    }

    /// Run `f` with the simulator locked.
    pub fn with_simulator<R>(&self, f: impl FnOnce(&mut Simulator) -> R) -> Result<R> {
        let mut guard = lock(&self.simulator)?;
        Ok(f(&mut guard))
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Compile, then start ticking on a background thread.
    pub fn start(&mut self, sink: StateSink) -> Result<()> {
        if self.worker.is_some() {
            return Err(LogicSimError::RuntimeError {
                message: "runtime already started".to_string(),
            });
        }

        let period = {
            let mut sim = lock(&self.simulator)?;
            sim.compile()?;
            sim.config().period()
        };
        if period.is_zero() {
            return Err(LogicSimError::RuntimeError {
                message: "tick period must be non-zero".to_string(),
            });
        }

        let (stop_tx, stop_rx) = chan::bounded::<()>(1);
        let simulator = Arc::clone(&self.simulator);
        let handle = std::thread::Builder::new()
            .name("logicsim-ticker".to_string())
            .spawn(move || tick_loop(simulator, period, stop_rx, sink))?;

        clilog::info!("runtime started, period {:?}", period);
        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stop ticking, wait for the in-flight tick, then discard the plan and
    /// the signal → tag mappings.
    pub fn stop(&mut self) -> Result<()> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return Ok(()),
        };
        // A full channel means a stop is already pending.
        let _ = worker.stop.try_send(());
        drop(worker.stop);
        worker.handle.join().map_err(|_| LogicSimError::RuntimeError {
            message: "ticker thread panicked".to_string(),
        })?;

        lock(&self.simulator)?.reset();
        clilog::info!("runtime stopped");
        Ok(())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            clilog::warn!("stopping runtime: {}", e);
        }
    }
}

fn tick_loop(simulator: Arc<Mutex<Simulator>>, period: Duration, stop: chan::Receiver<()>, mut sink: StateSink) {
    let mut deadline = Instant::now() + period;
    loop {
        match stop.recv_deadline(deadline) {
            Err(chan::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(chan::RecvTimeoutError::Disconnected) => break,
        }
        deadline += period;

        let (cycle, changes) = match lock(&simulator) {
            Ok(mut sim) => match sim.step() {
                Ok(changes) => (sim.cycle(), changes),
                Err(e) => {
                    clilog::warn!("tick failed: {}", e);
                    continue;
                }
            },
            Err(e) => {
                clilog::warn!("{}", e);
                break;
            }
        };
        if !changes.is_empty() {
            sink(cycle, &changes);
        }
    }
}
