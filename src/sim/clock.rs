//! Simulation clock.

const CYCLE_EPSILON: f64 = 1e-6;

/// Discrete cycle counter with a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    /// Cycles evaluated so far
    pub cycle: u64,
    /// Length of one cycle in milliseconds
    pub resolution_ms: u32,
}

impl Clock {
    pub fn new(resolution_ms: u32) -> Self {
        Self {
            cycle: 0,
            resolution_ms,
        }
    }

    /// Move to the next cycle.
    pub fn advance(&mut self) {
        self.cycle += 1;
    }

    /// Number of cycles needed to cover `delay` seconds, rounded up.
    ///
    /// Negative or non-finite delays count as zero.
    pub fn cycles_for(&self, delay: f32) -> u64 {
        if self.resolution_ms == 0 || !delay.is_finite() || delay <= 0.0 {
            return 0;
        }
        let cycles = f64::from(delay) * 1000.0 / f64::from(self.resolution_ms);
        // absorb f32 representation error so 0.05 s at 10 ms stays 5 cycles
        (cycles - CYCLE_EPSILON).ceil().max(0.0) as u64
    }

    /// Simulated time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.cycle as f64 * f64::from(self.resolution_ms) / 1000.0
    }
}
