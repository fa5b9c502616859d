/// Accumulator turning variable frame deltas into a whole number of fixed updates.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f64,
    accumulator: f64,
    max_steps: u32,
}

impl FixedStep {
    /// `hz` updates per second; at most `max_steps` are produced per frame and the
    /// remaining backlog is dropped.
    pub fn new(hz: u32, max_steps: u32) -> Self {
        Self {
            step: 1.0 / hz.max(1) as f64,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    #[inline]
    pub fn step_seconds(&self) -> f32 {
        self.step as f32
    }

    /// Adds `dt` seconds and returns the number of fixed updates due.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt as f64;

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            log::debug!("fixed step: dropping {:.3}s of backlog", self.accumulator);
            self.accumulator %= self.step;
        }
        steps
    }

    /// Fraction of a step accumulated but not yet consumed.
    #[inline]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.step) as f32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
