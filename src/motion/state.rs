// src/motion/state.rs - Step-quantized position tracking and extrusion bookkeeping
use serde::Serialize;

use crate::axis::{Axis, AxisMap, AxisTarget};
use crate::motion::controller::ControllerError;
use crate::motion::stepper::StepConverter;

/// Running totals for the session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Accumulators {
    /// Sum of per-move XYZ Euclidean distances.
    pub travel_distance_mm: f64,
    /// Sum of absolute E travel, in either direction.
    pub extrusion_distance_mm: f64,
    /// Volume pushed past the E high-water mark.
    pub extrusion_volume_ul: f64,
    pub print_time_s: f64,
}

/// Outcome of resolving one move against the current position, before anything is committed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovePlan {
    /// Target step count for every axis the move touches.
    pub targets: AxisMap<Option<i64>>,
    /// Signed step change per axis (zero for untouched axes).
    pub diffs: AxisMap<i64>,
    pub xyz_distance_mm: f64,
    pub extrusion_distance_mm: f64,
    /// Volume from E steps beyond the previous high-water mark.
    pub new_volume_ul: f64,
    pub new_max_extrusion_step: Option<i64>,
}

impl MovePlan {
    pub fn moves(&self, axis: Axis) -> bool {
        self.diffs[axis] != 0
    }

    pub fn is_zero(&self) -> bool {
        Axis::ALL.iter().all(|&axis| !self.moves(axis))
    }
}

/// Machine position in whole steps plus its full history.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    current: AxisMap<i64>,
    history: AxisMap<Vec<i64>>,
    max_extrusion_step: i64,
    relative: bool,
}

impl PositionState {
    pub fn new(relative: bool) -> Self {
        Self {
            current: AxisMap::default(),
            history: AxisMap::new([vec![0], vec![0], vec![0], vec![0]]),
            max_extrusion_step: 0,
            relative,
        }
    }

    pub fn steps(&self, axis: Axis) -> i64 {
        self.current[axis]
    }

    pub fn history(&self, axis: Axis) -> &[i64] {
        &self.history[axis]
    }

    pub fn max_extrusion_step(&self) -> i64 {
        self.max_extrusion_step
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn set_relative(&mut self, relative: bool) {
        self.relative = relative;
    }

    /// Resolve `target` (millimeters) into step targets and the distances and
    /// volume the move would add. Does not modify the state.
    ///
    /// Destinations whose step count, or step change, does not fit in an
    /// `i64` are rejected.
    pub fn plan(
        &self,
        steps: &StepConverter,
        target: &AxisTarget,
        syringe_area_mm2: f64,
    ) -> Result<MovePlan, ControllerError> {
        let mut plan = MovePlan::default();
        let mut sum_sq = 0.0;
        let mut max_e = self.max_extrusion_step;

        for (axis, value) in target.specified() {
            let destination = if self.relative {
                steps.to_mm(axis, self.current[axis]) + value
            } else {
                value
            };
            let out_of_range = || {
                ControllerError::InvalidArgument(format!(
                    "{} destination {} mm is outside the stepper range",
                    axis, destination
                ))
            };
            let target_steps = steps.to_steps(axis, destination).ok_or_else(out_of_range)?;
            let diff = target_steps
                .checked_sub(self.current[axis])
                .ok_or_else(out_of_range)?;
            let diff_mm = diff as f64 * steps.mm_per_step(axis);

            if axis.is_extrusion() {
                plan.extrusion_distance_mm = diff_mm.abs();
                // Material already pushed out cannot be taken back
                if target_steps > max_e {
                    plan.new_volume_ul =
                        (target_steps - max_e) as f64 * steps.mm_per_step(axis) * syringe_area_mm2;
                    plan.new_max_extrusion_step = Some(target_steps);
                    max_e = target_steps;
                }
            } else {
                sum_sq += diff_mm * diff_mm;
            }

            plan.targets[axis] = Some(target_steps);
            plan.diffs[axis] = diff;
        }

        plan.xyz_distance_mm = sum_sq.sqrt();
        Ok(plan)
    }

    /// Apply a plan produced by [`PositionState::plan`] and record the new position.
    pub fn commit(&mut self, plan: &MovePlan) {
        for axis in Axis::ALL {
            self.current[axis] += plan.diffs[axis];
        }
        if let Some(max_e) = plan.new_max_extrusion_step {
            self.max_extrusion_step = max_e;
        }
        for axis in Axis::ALL {
            let position = self.current[axis];
            self.history[axis].push(position);
        }
    }
}
