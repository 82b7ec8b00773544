//! Relay-logic timers: on-delay, off-delay and pulse.
//!
//! All timers count whole clock cycles. A delay of `d` seconds at a clock
//! resolution of `r` milliseconds lasts `ceil(d * 1000 / r)` cycles, and the
//! cycle an edge is first seen on counts as the first of them.

use super::{Binding, CompileContext};
use crate::circuit::{ElementId, TriState};
use crate::error::{LogicSimError, Result};
use crate::sim::Clock;

/// Enable input shared by every timer.
#[derive(Debug, Clone, Default)]
pub struct Enable {
    pub bindings: Vec<Binding>,
}

impl Enable {
    fn compile(&mut self, element: ElementId, ctx: &CompileContext<'_>) -> Result<()> {
        self.bindings = ctx.input_bindings(element);
        if self.bindings.is_empty() {
            return Err(LogicSimError::unbound(element, "timer has no enable input"));
        }
        Ok(())
    }

    fn read(&self, states: &[TriState]) -> TriState {
        match self.bindings.as_slice() {
            [only] => only.read(states),
            _ => TriState::Unknown,
        }
    }
}

/// On-delay: output turns true on the delay's last cycle of continuous
/// enable.
#[derive(Debug, Clone)]
pub struct OnDelay {
    pub element: ElementId,
    pub delay: f32,
    pub enable: Enable,
    cycles: u64,
    due: Option<u64>,
}

impl OnDelay {
    pub fn new(element: ElementId, delay: f32) -> Self {
        Self {
            element,
            delay,
            enable: Enable::default(),
            cycles: 0,
            due: None,
        }
    }

    pub fn reset(&mut self) {
        self.enable.bindings.clear();
        self.due = None;
    }

    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        self.cycles = ctx.clock.cycles_for(self.delay);
        self.enable.compile(self.element, ctx)
    }

    pub fn calculate(&mut self, states: &[TriState], clock: &Clock) -> TriState {
        match self.enable.read(states) {
            TriState::True => {
                let due = *self
                    .due
                    .get_or_insert(clock.cycle + self.cycles.saturating_sub(1));
                TriState::from(clock.cycle >= due)
            }
            TriState::False => {
                self.due = None;
                TriState::False
            }
            TriState::Unknown => {
                self.due = None;
                TriState::Unknown
            }
        }
    }
}

/// Off-delay: output follows a rising enable at once and holds true for the
/// delay after enable falls.
#[derive(Debug, Clone)]
pub struct OffDelay {
    pub element: ElementId,
    pub delay: f32,
    pub enable: Enable,
    cycles: u64,
    output: TriState,
    due: Option<u64>,
}

impl OffDelay {
    pub fn new(element: ElementId, delay: f32) -> Self {
        Self {
            element,
            delay,
            enable: Enable::default(),
            cycles: 0,
            output: TriState::False,
            due: None,
        }
    }

    pub fn reset(&mut self) {
        self.enable.bindings.clear();
        self.output = TriState::False;
        self.due = None;
    }

    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        self.cycles = ctx.clock.cycles_for(self.delay);
        self.enable.compile(self.element, ctx)
    }

    pub fn calculate(&mut self, states: &[TriState], clock: &Clock) -> TriState {
        self.output = match self.enable.read(states) {
            TriState::True => {
                self.due = None;
                TriState::True
            }
            TriState::False if self.output == TriState::True => {
                let due = *self.due.get_or_insert(clock.cycle + self.cycles);
                if clock.cycle >= due {
                    self.due = None;
                    TriState::False
                } else {
                    TriState::True
                }
            }
            TriState::False => TriState::False,
            TriState::Unknown => {
                self.due = None;
                TriState::Unknown
            }
        };
        self.output
    }
}

/// Pulse: a rising enable starts one fixed-width true window.
///
/// The timer re-arms only after enable has been observed false, so holding
/// enable true yields a single pulse.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub element: ElementId,
    pub delay: f32,
    pub enable: Enable,
    cycles: u64,
    armed: bool,
    ends: Option<u64>,
}

impl Pulse {
    pub fn new(element: ElementId, delay: f32) -> Self {
        Self {
            element,
            delay,
            enable: Enable::default(),
            cycles: 0,
            armed: false,
            ends: None,
        }
    }

    pub fn reset(&mut self) {
        self.enable.bindings.clear();
        self.armed = false;
        self.ends = None;
    }

    pub fn compile(&mut self, ctx: &CompileContext<'_>) -> Result<()> {
        self.cycles = ctx.clock.cycles_for(self.delay);
        self.enable.compile(self.element, ctx)
    }

    pub fn calculate(&mut self, states: &[TriState], clock: &Clock) -> TriState {
        match self.enable.read(states) {
            TriState::Unknown => {
                self.armed = false;
                self.ends = None;
                return TriState::Unknown;
            }
            TriState::False => self.armed = true,
            TriState::True => {
                if self.armed && self.ends.is_none() {
                    self.ends = Some(clock.cycle + self.cycles);
                }
                self.armed = false;
            }
        }

        match self.ends {
            Some(ends) if clock.cycle < ends => TriState::True,
            Some(_) => {
                self.ends = None;
                TriState::False
            }
            None => TriState::False,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOLUTION_MS: u32 = 10;

    fn enable() -> Enable {
        Enable {
            bindings: vec![Binding {
                source: 0,
                inverted: false,
            }],
        }
    }

    /// Drive a timer with one enable value per cycle, starting at cycle 1.
    fn run<F>(inputs: &[TriState], mut step: F) -> Vec<TriState>
    where
        F: FnMut(&[TriState], &Clock) -> TriState,
    {
        let mut clock = Clock::new(RESOLUTION_MS);
        inputs
            .iter()
            .map(|&v| {
                clock.advance();
                step(&[v], &clock)
            })
            .collect()
    }

    fn held(value: TriState, n: usize) -> Vec<TriState> {
        vec![value; n]
    }

    #[test]
    fn test_on_delay_short_enable_never_fires() {
        // 50 ms at 10 ms resolution = 5 cycles
        let mut t = OnDelay::new(ElementId(1), 0.05);
        t.cycles = Clock::new(RESOLUTION_MS).cycles_for(0.05);
        t.enable = enable();
        let mut inputs = held(TriState::True, 4);
        inputs.extend(held(TriState::False, 5));
        let out = run(&inputs, |s, c| t.calculate(s, c));
        assert!(out.iter().all(|v| *v == TriState::False));
    }

    #[test]
    fn test_on_delay_fires_on_last_cycle_of_delay() {
        let mut t = OnDelay::new(ElementId(1), 0.05);
        t.cycles = Clock::new(RESOLUTION_MS).cycles_for(0.05);
        t.enable = enable();
        let mut inputs = held(TriState::True, 5);
        inputs.extend(held(TriState::False, 1));
        let out = run(&inputs, |s, c| t.calculate(s, c));
        use TriState::*;
        assert_eq!(out, vec![False, False, False, False, True, False]);
    }

    #[test]
    fn test_on_delay_stays_true_while_enabled() {
        let mut t = OnDelay::new(ElementId(1), 0.05);
        t.cycles = 5;
        t.enable = enable();
        let out = run(&held(TriState::True, 8), |s, c| t.calculate(s, c));
        let first_true = out.iter().position(|v| *v == TriState::True).unwrap();
        assert_eq!(first_true, 4);
        assert!(out[4..].iter().all(|v| *v == TriState::True));
    }

    #[test]
    fn test_on_delay_unknown_clears() {
        let mut t = OnDelay::new(ElementId(1), 0.0);
        t.enable = enable();
        let out = run(&[TriState::True, TriState::Unknown], |s, c| t.calculate(s, c));
        assert_eq!(out, vec![TriState::True, TriState::Unknown]);
    }

    #[test]
    fn test_off_delay_holds_after_release() {
        let mut t = OffDelay::new(ElementId(2), 0.03);
        t.cycles = 3;
        t.enable = enable();
        let mut inputs = held(TriState::True, 2);
        inputs.extend(held(TriState::False, 5));
        let out = run(&inputs, |s, c| t.calculate(s, c));
        assert_eq!(out[0], TriState::True);
        // released at index 2, true for 3 more cycles
        assert_eq!(&out[2..5], &[TriState::True; 3]);
        assert_eq!(&out[5..], &[TriState::False; 2]);
    }

    #[test]
    fn test_off_delay_rising_edge_cancels_countdown() {
        let mut t = OffDelay::new(ElementId(2), 0.03);
        t.cycles = 3;
        t.enable = enable();
        use TriState::*;
        let out = run(&[True, False, False, True, False, False, False, False], |s, c| {
            t.calculate(s, c)
        });
        assert_eq!(out, vec![True, True, True, True, True, True, True, False]);
    }

    #[test]
    fn test_pulse_single_window() {
        let mut t = Pulse::new(ElementId(3), 0.03);
        t.cycles = 3;
        t.enable = enable();
        let mut inputs = held(TriState::False, 1);
        inputs.extend(held(TriState::True, 8));
        let out = run(&inputs, |s, c| t.calculate(s, c));
        let trues: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == TriState::True)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(trues, vec![1, 2, 3]);
    }

    #[test]
    fn test_pulse_rearms_only_after_false() {
        let mut t = Pulse::new(ElementId(3), 0.02);
        t.cycles = 2;
        t.enable = enable();
        use TriState::*;
        // no prior false: not armed
        let out = run(
            &[True, True, False, True, True, True, False, True],
            |s, c| t.calculate(s, c),
        );
        assert_eq!(out, vec![False, False, False, True, True, False, False, True]);
    }
}
