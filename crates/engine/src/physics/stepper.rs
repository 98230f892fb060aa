/// Frame deltas above this are clamped before accumulation so a stall never
/// turns into a spiral of catch-up steps.
pub const MAX_FRAME_DELTA_SECONDS: f32 = 0.25;

// Tick durations arrive through `Duration` round-trips and can be a few ulps
// short of the step.
const STEP_TOLERANCE_SECONDS: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepper {
    time_step: f32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(time_step: f32) -> Self {
        let time_step = if time_step.is_finite() && time_step > 0.0 {
            time_step
        } else {
            1.0 / 60.0
        };
        Self {
            time_step,
            accumulator: 0.0,
        }
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Adds a frame delta and returns how many fixed steps are now due.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_DELTA_SECONDS)
        } else {
            0.0
        };
        self.accumulator += frame_dt;

        let mut steps = 0u32;
        while self.accumulator + STEP_TOLERANCE_SECONDS >= self.time_step {
            self.accumulator = (self.accumulator - self.time_step).max(0.0);
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn one_tick_per_step_sized_frame() {
        let mut stepper = FixedStepper::new(1.0 / 60.0);
        for _ in 0..120 {
            assert_eq!(stepper.advance(1.0 / 60.0), 1);
        }
    }

    #[test]
    fn duration_rounded_ticks_do_not_skip_steps() {
        let mut stepper = FixedStepper::new(1.0 / 60.0);
        let tick = Duration::from_secs_f64(1.0 / 60.0).as_secs_f32();
        let total: u32 = (0..600).map(|_| stepper.advance(tick)).sum();
        assert_eq!(total, 600);
    }

    #[test]
    fn large_frame_is_clamped() {
        let mut stepper = FixedStepper::new(0.05);
        assert_eq!(stepper.advance(3.0), 5);
        assert!(stepper.accumulator() < 0.05);
    }

    #[test]
    fn remainder_carries_to_next_frame() {
        let mut stepper = FixedStepper::new(0.1);
        assert_eq!(stepper.advance(0.06), 0);
        assert_eq!(stepper.advance(0.06), 1);
        assert!((stepper.accumulator() - 0.02).abs() < 1.0e-4);
    }

    #[test]
    fn negative_or_nan_delta_adds_nothing() {
        let mut stepper = FixedStepper::new(0.1);
        assert_eq!(stepper.advance(-1.0), 0);
        assert_eq!(stepper.advance(f32::NAN), 0);
        assert_eq!(stepper.accumulator(), 0.0);
    }
}
