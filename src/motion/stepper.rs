// src/motion/stepper.rs - Millimeter <-> motor step conversion per axis
use crate::axis::{Axis, AxisMap};

/// 2^63, exactly representable; every integral value below it fits an `i64`.
const STEP_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Per-axis step resolution. Positions are quantized to whole steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StepConverter {
    steps_per_mm: AxisMap<f64>,
    mm_per_step: AxisMap<f64>,
}

impl StepConverter {
    pub fn new(steps_per_mm: AxisMap<f64>) -> Self {
        Self {
            steps_per_mm,
            mm_per_step: steps_per_mm.map(|s| 1.0 / s),
        }
    }

    pub fn set_steps_per_mm(&mut self, axis: Axis, steps: f64) {
        self.steps_per_mm[axis] = steps;
        self.mm_per_step[axis] = 1.0 / steps;
    }

    pub fn steps_per_mm(&self, axis: Axis) -> f64 {
        self.steps_per_mm[axis]
    }

    pub fn mm_per_step(&self, axis: Axis) -> f64 {
        self.mm_per_step[axis]
    }

    /// Nearest whole step to `mm`, ties to even. `None` when the step count
    /// does not fit in an `i64`.
    pub fn to_steps(&self, axis: Axis, mm: f64) -> Option<i64> {
        let steps = (mm * self.steps_per_mm[axis]).round_ties_even();
        if steps.is_finite() && steps >= -STEP_LIMIT && steps < STEP_LIMIT {
            Some(steps as i64)
        } else {
            None
        }
    }

    pub fn to_mm(&self, axis: Axis, steps: i64) -> f64 {
        steps as f64 * self.mm_per_step[axis]
    }
}
