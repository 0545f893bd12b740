//! # Machine and hardware configuration
//!
//! Printer settings plus the syringe, tip and pipette lookup tables the
//! controller resolves at construction time.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [machine]
//! syringe = "BD-3ml"
//! tip = "JG22-1.25TTX"
//! output_digits = 3
//! steps_per_mm = [80.0, 80.0, 400.0, 3540.0]
//!
//! [syringes."Hamilton-250ul"]
//! diameter_mm = 2.30
//! waste_volume_ml = 0.01
//! ```
//!
//! Tables in the file extend the built-in ones; an entry with the same name
//! replaces the built-in entry.

// src/config.rs - Machine settings and hardware lookup tables
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::axis::AxisMap;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown syringe '{0}'")]
    UnknownSyringe(String),
    #[error("Unknown tip '{0}'")]
    UnknownTip(String),
    #[error("Unknown pipette '{0}'")]
    UnknownPipette(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub machine: MachineSettings,
    #[serde(default)]
    pub syringes: HashMap<String, SyringeSpec>,
    #[serde(default)]
    pub tips: HashMap<String, TipSpec>,
    #[serde(default)]
    pub pipettes: HashMap<String, PipetteSpec>,
}

impl Config {
    /// Built-in tables extended with the entries from this file.
    pub fn tables(&self) -> HardwareTables {
        let mut tables = HardwareTables::builtin();
        tables.syringes.extend(self.syringes.clone());
        tables.tips.extend(self.tips.clone());
        tables.pipettes.extend(self.pipettes.clone());
        tables
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.machine.validate()?;
        self.tables().validate()
    }
}

/// Printer-level settings consumed by the motion controller.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MachineSettings {
    #[serde(default = "default_microstepping")]
    pub microstepping: u32,
    #[serde(default = "default_motor_step_angle")]
    pub motor_step_angle: f64,
    #[serde(default = "default_steps_per_mm")]
    pub steps_per_mm: AxisMap<f64>,
    #[serde(default = "default_output_digits")]
    pub output_digits: usize,
    #[serde(default = "default_initial_feedrate")]
    pub initial_feedrate: f64,
    #[serde(default = "default_include_header")]
    pub include_header: bool,
    #[serde(default = "default_syringe")]
    pub syringe: String,
    #[serde(default = "default_tip")]
    pub tip: String,
    #[serde(default = "default_layer_height")]
    pub layer_height: f64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            microstepping: default_microstepping(),
            motor_step_angle: default_motor_step_angle(),
            steps_per_mm: default_steps_per_mm(),
            output_digits: default_output_digits(),
            initial_feedrate: default_initial_feedrate(),
            include_header: default_include_header(),
            syringe: default_syringe(),
            tip: default_tip(),
            layer_height: default_layer_height(),
        }
    }
}

impl MachineSettings {
    /// Microsteps per full motor revolution.
    pub fn steps_per_revolution(&self) -> u32 {
        (self.microstepping as f64 * 360.0 / self.motor_step_angle).round() as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.microstepping == 0 {
            return Err(ConfigError::Invalid("microstepping must be > 0".to_string()));
        }
        if !(self.motor_step_angle > 0.0) {
            return Err(ConfigError::Invalid("motor_step_angle must be > 0".to_string()));
        }
        for (axis, &steps) in self.steps_per_mm.iter() {
            if !steps.is_finite() || steps <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "steps_per_mm for axis {} must be a positive number",
                    axis
                )));
            }
        }
        if !self.initial_feedrate.is_finite() || self.initial_feedrate <= 0.0 {
            return Err(ConfigError::Invalid("initial_feedrate must be > 0".to_string()));
        }
        if !self.layer_height.is_finite() || self.layer_height <= 0.0 {
            return Err(ConfigError::Invalid("layer_height must be > 0".to_string()));
        }
        if self.output_digits > 12 {
            return Err(ConfigError::Invalid("output_digits must be <= 12".to_string()));
        }
        Ok(())
    }
}

/// Syringe barrel: bore diameter and dead space left at the end of travel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SyringeSpec {
    pub diameter_mm: f64,
    pub waste_volume_ml: f64,
}

/// Dispensing tip: inner diameter and the liquid it holds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TipSpec {
    pub inner_diameter_mm: f64,
    pub void_volume_ml: f64,
}

/// Pipette used as a mandrel for vessel printing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PipetteSpec {
    pub outer_diameter_mm: f64,
}

/// Lookup tables for consumables, keyed by catalogue name.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareTables {
    pub syringes: HashMap<String, SyringeSpec>,
    pub tips: HashMap<String, TipSpec>,
    pub pipettes: HashMap<String, PipetteSpec>,
}

impl Default for HardwareTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HardwareTables {
    pub fn builtin() -> Self {
        let syringes = [
            ("BD-1ml", 4.78, 0.07),
            ("BD-3ml", 8.66, 0.07),
            ("BD-5ml", 12.06, 0.075),
            ("BD-10ml", 14.5, 0.10),
        ]
        .into_iter()
        .map(|(name, diameter_mm, waste_volume_ml)| {
            (name.to_string(), SyringeSpec { diameter_mm, waste_volume_ml })
        })
        .collect();

        let tips = [("JG24-1.25TTX", 0.330, 0.15), ("JG22-1.25TTX", 0.430, 0.13)]
            .into_iter()
            .map(|(name, inner_diameter_mm, void_volume_ml)| {
                (name.to_string(), TipSpec { inner_diameter_mm, void_volume_ml })
            })
            .collect();

        let pipettes = [("VWR-1ml", 4.9)]
            .into_iter()
            .map(|(name, outer_diameter_mm)| (name.to_string(), PipetteSpec { outer_diameter_mm }))
            .collect();

        Self { syringes, tips, pipettes }
    }

    pub fn syringe(&self, name: &str) -> Result<&SyringeSpec, ConfigError> {
        self.syringes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSyringe(name.to_string()))
    }

    pub fn tip(&self, name: &str) -> Result<&TipSpec, ConfigError> {
        self.tips
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTip(name.to_string()))
    }

    pub fn pipette(&self, name: &str) -> Result<&PipetteSpec, ConfigError> {
        self.pipettes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPipette(name.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, syringe) in &self.syringes {
            if !(syringe.diameter_mm > 0.0) {
                return Err(ConfigError::Invalid(format!("syringe '{}' diameter must be > 0", name)));
            }
        }
        for (name, tip) in &self.tips {
            if !(tip.inner_diameter_mm > 0.0) {
                return Err(ConfigError::Invalid(format!("tip '{}' inner diameter must be > 0", name)));
            }
        }
        for (name, pipette) in &self.pipettes {
            if !(pipette.outer_diameter_mm > 0.0) {
                return Err(ConfigError::Invalid(format!("pipette '{}' outer diameter must be > 0", name)));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_microstepping() -> u32 { 16 }
fn default_motor_step_angle() -> f64 { 1.8 }
fn default_steps_per_mm() -> AxisMap<f64> { AxisMap::new([80.0, 80.0, 400.0, 3540.0]) }
fn default_output_digits() -> usize { 4 }
fn default_initial_feedrate() -> f64 { 100.0 }
fn default_include_header() -> bool { true }
fn default_syringe() -> String { "BD-1ml".to_string() }
fn default_tip() -> String { "JG24-1.25TTX".to_string() }
fn default_layer_height() -> f64 { 0.3 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path.display(), e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}
