// src/vessel.rs - Material estimate for tubular vessels printed on a pipette
use std::f64::consts::PI;

use serde::Serialize;

use crate::config::{Config, ConfigError};
use crate::units::circle_area;

/// Hollow cylinder deposited around a pipette mandrel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vessel {
    pub length_mm: f64,
    pub wall_thickness_um: f64,
    /// Lumen diameter, i.e. the mandrel's outer diameter.
    pub inner_diameter_mm: f64,
}

impl Vessel {
    pub fn new(length_mm: f64, wall_thickness_um: f64, inner_diameter_mm: f64) -> Self {
        Self {
            length_mm,
            wall_thickness_um,
            inner_diameter_mm,
        }
    }

    /// Vessel sized to the outer diameter of a pipette from the tables.
    pub fn on_pipette(config: &Config, pipette: &str, length_mm: f64, wall_thickness_um: f64) -> Result<Self, ConfigError> {
        let tables = config.tables();
        let spec = tables.pipette(pipette)?;
        Ok(Self::new(length_mm, wall_thickness_um, spec.outer_diameter_mm))
    }

    /// Wall volume `π·L·t·(ID + t)`, in uL.
    pub fn volume_ul(&self) -> f64 {
        let t = self.wall_thickness_um / 1000.0;
        PI * self.length_mm * t * (self.inner_diameter_mm + t)
    }
}

/// Printer and consumable settings relevant to a vessel print, one line each.
pub fn settings_report(config: &Config, pipette: &str, d: usize) -> Result<Vec<String>, ConfigError> {
    let tables = config.tables();
    let machine = &config.machine;
    let syringe = tables.syringe(&machine.syringe)?;
    let tip = tables.tip(&machine.tip)?;
    let pipe = tables.pipette(pipette)?;
    Ok(vec![
        "Printer settings:".to_string(),
        format!("  Microstepping: {}X", machine.microstepping),
        format!("  Steps per revolution: {}", machine.steps_per_revolution()),
        format!("  Syringe type: {}", machine.syringe),
        format!("  Syringe ID: {} mm", syringe.diameter_mm),
        format!("  Syringe cross-section: {:.d$} uL/mm", circle_area(syringe.diameter_mm)),
        format!("  Syringe void volume: {} mL", syringe.waste_volume_ml),
        format!("  Tip type: {}", machine.tip),
        format!("  Tip ID: {} mm", tip.inner_diameter_mm),
        format!("  Tip cross-section: {:.d$} mm^2", circle_area(tip.inner_diameter_mm)),
        format!("  Tip void volume: {} mL", tip.void_volume_ml),
        format!("  Pipet type: {}", pipette),
        format!("  Pipet OD: {} mm", pipe.outer_diameter_mm),
    ])
}
