// src/wellplate.rs - Flow-rate deposition run across a row of wells
use serde::{Deserialize, Serialize};

use crate::axis::AxisTarget;
use crate::motion::MotionController;
use crate::output::LineSink;
use crate::patterns::PatternError;
use crate::units::{ExtrusionUnit, FeedrateUnit};

/// Dispense the same volume into consecutive wells at several flow rates.
///
/// Each flow rate gets `replicates` wells. After dispensing the tip is raised
/// by `z_lift_mm` (`-Z`), stepped one well pitch in `-X` and lowered again;
/// the last well skips the step. The run ends one row over, back at the
/// starting column, with a retraction of `retraction_volume_ul`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositionPlan {
    pub well_volume_ul: f64,
    pub center_to_center_mm: f64,
    pub z_lift_mm: f64,
    /// mm/min
    pub travel_rate: f64,
    /// mm/min
    pub retraction_rate: f64,
    pub replicates: usize,
    pub flow_rates_ml_min: Vec<f64>,
    pub retraction_volume_ul: f64,
}

impl Default for DepositionPlan {
    fn default() -> Self {
        Self {
            well_volume_ul: 25.0,
            center_to_center_mm: 9.1,
            z_lift_mm: 15.0,
            travel_rate: 1000.0,
            retraction_rate: 100.0,
            replicates: 3,
            flow_rates_ml_min: vec![1.0, 5.0, 10.0],
            retraction_volume_ul: 250.0,
        }
    }
}

/// What a finished run dispensed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepositionOutcome {
    pub wells: usize,
    pub columns_advanced: usize,
    pub rows_advanced: usize,
}

impl DepositionPlan {
    pub fn well_count(&self) -> usize {
        self.replicates * self.flow_rates_ml_min.len()
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        let positive = [
            ("well volume", self.well_volume_ul),
            ("well pitch", self.center_to_center_mm),
            ("travel rate", self.travel_rate),
            ("retraction rate", self.retraction_rate),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PatternError::InvalidGeometry(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !self.z_lift_mm.is_finite() || self.z_lift_mm < 0.0 {
            return Err(PatternError::InvalidGeometry("z lift must be >= 0".to_string()));
        }
        if !self.retraction_volume_ul.is_finite() || self.retraction_volume_ul < 0.0 {
            return Err(PatternError::InvalidGeometry("retraction volume must be >= 0".to_string()));
        }
        if self.replicates == 0 || self.flow_rates_ml_min.is_empty() {
            return Err(PatternError::InvalidGeometry(
                "need at least one flow rate and one replicate".to_string(),
            ));
        }
        if self.flow_rates_ml_min.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(PatternError::InvalidGeometry("flow rates must be positive".to_string()));
        }
        Ok(())
    }

    /// Drive `controller` through the whole plan and finish with a summary report.
    pub fn run<S: LineSink>(&self, controller: &mut MotionController<S>) -> Result<DepositionOutcome, PatternError> {
        self.validate()?;
        let total = self.well_count();
        let mut wells = 0;
        let mut columns = 0;

        for &flow_rate in &self.flow_rates_ml_min {
            tracing::info!("Depositing {} wells at {} mL/min", self.replicates, flow_rate);
            for _ in 0..self.replicates {
                controller.set_feedrate(flow_rate, FeedrateUnit::MlPerMin)?;
                controller.linear_move(AxisTarget::new().e(self.well_volume_ul), ExtrusionUnit::Microliters)?;
                controller.set_feedrate(self.travel_rate, FeedrateUnit::MmPerMin)?;
                controller.linear_move(AxisTarget::new().z(-self.z_lift_mm), ExtrusionUnit::Millimeters)?;
                wells += 1;
                if wells != total {
                    controller.linear_move(
                        AxisTarget::new().x(-self.center_to_center_mm),
                        ExtrusionUnit::Millimeters,
                    )?;
                    controller.linear_move(AxisTarget::new().z(self.z_lift_mm), ExtrusionUnit::Millimeters)?;
                    columns += 1;
                }
                controller.blank_line()?;
            }
        }

        let rows = 1;
        controller.set_feedrate(self.travel_rate, FeedrateUnit::MmPerMin)?;
        controller.linear_move(
            AxisTarget::new().y(-(rows as f64) * self.center_to_center_mm),
            ExtrusionUnit::Millimeters,
        )?;
        controller.linear_move(
            AxisTarget::new().x(columns as f64 * self.center_to_center_mm),
            ExtrusionUnit::Millimeters,
        )?;

        controller.set_feedrate(self.retraction_rate, FeedrateUnit::MmPerMin)?;
        if self.retraction_volume_ul > 0.0 {
            controller.linear_move(
                AxisTarget::new().e(-self.retraction_volume_ul),
                ExtrusionUnit::Microliters,
            )?;
        }
        controller.summary_report()?;

        Ok(DepositionOutcome {
            wells,
            columns_advanced: columns,
            rows_advanced: rows,
        })
    }
}
