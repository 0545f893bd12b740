// src/units.rs - Extrusion and feedrate unit tags with their conversions
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("Unknown extrusion unit '{0}' (expected mm or uL)")]
    UnknownExtrusionUnit(String),
    #[error("Unknown feedrate unit '{0}' (expected mm/min, uL/min, mL/min or uL/s)")]
    UnknownFeedrateUnit(String),
}

/// Unit of an E-axis amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtrusionUnit {
    /// Plunger travel in millimeters.
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    /// Dispensed volume in micro-liters.
    #[serde(rename = "uL")]
    Microliters,
}

impl ExtrusionUnit {
    /// Converts an amount in this unit to plunger travel in mm.
    pub fn to_millimeters(self, amount: f64, syringe_area_mm2: f64) -> f64 {
        match self {
            ExtrusionUnit::Millimeters => amount,
            // 1 uL == 1 mm^3
            ExtrusionUnit::Microliters => amount / syringe_area_mm2,
        }
    }
}

impl FromStr for ExtrusionUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mm" => Ok(ExtrusionUnit::Millimeters),
            "uL" | "ul" | "µL" => Ok(ExtrusionUnit::Microliters),
            other => Err(UnitError::UnknownExtrusionUnit(other.to_string())),
        }
    }
}

impl fmt::Display for ExtrusionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtrusionUnit::Millimeters => write!(f, "mm"),
            ExtrusionUnit::Microliters => write!(f, "uL"),
        }
    }
}

/// Unit of a feedrate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedrateUnit {
    #[default]
    #[serde(rename = "mm/min")]
    MmPerMin,
    #[serde(rename = "uL/min")]
    UlPerMin,
    #[serde(rename = "mL/min")]
    MlPerMin,
    #[serde(rename = "uL/s")]
    UlPerSec,
}

impl FeedrateUnit {
    /// Converts a rate in this unit to linear feedrate in mm/min.
    pub fn to_mm_per_min(self, rate: f64, syringe_area_mm2: f64) -> f64 {
        match self {
            FeedrateUnit::MmPerMin => rate,
            FeedrateUnit::UlPerMin => rate / syringe_area_mm2,
            FeedrateUnit::MlPerMin => 1000.0 * rate / syringe_area_mm2,
            FeedrateUnit::UlPerSec => 60.0 * rate / syringe_area_mm2,
        }
    }
}

impl FromStr for FeedrateUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mm/min" => Ok(FeedrateUnit::MmPerMin),
            "uL/min" | "ul/min" => Ok(FeedrateUnit::UlPerMin),
            "mL/min" | "ml/min" => Ok(FeedrateUnit::MlPerMin),
            "uL/s" | "ul/s" => Ok(FeedrateUnit::UlPerSec),
            other => Err(UnitError::UnknownFeedrateUnit(other.to_string())),
        }
    }
}

impl fmt::Display for FeedrateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedrateUnit::MmPerMin => "mm/min",
            FeedrateUnit::UlPerMin => "uL/min",
            FeedrateUnit::MlPerMin => "mL/min",
            FeedrateUnit::UlPerSec => "uL/s",
        };
        write!(f, "{}", s)
    }
}

/// Cross-sectional area of a circular bore, `π·(d/2)²`.
pub fn circle_area(diameter: f64) -> f64 {
    std::f64::consts::PI * (diameter / 2.0).powi(2)
}
