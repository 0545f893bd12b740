// src/patterns.rs - Shape helpers built from controller moves
use std::f64::consts::PI;

use thiserror::Error;

use crate::axis::{Axis, AxisTarget};
use crate::gcode::ArcDirection;
use crate::motion::{ControllerError, MotionController};
use crate::output::LineSink;
use crate::units::ExtrusionUnit;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid pattern geometry: {0}")]
    InvalidGeometry(String),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

fn require_positive(name: &str, value: f64) -> Result<(), PatternError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PatternError::InvalidGeometry(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// Upper bound on rings or raster lines in one pattern.
pub const MAX_PATTERN_PASSES: usize = 100_000;

/// Number of passes covering `span` at `step` spacing, the first at zero.
///
/// `step` must be at least `min_step` (one motor step on the stepping axis)
/// and the count may not exceed [`MAX_PATTERN_PASSES`].
fn pass_count(name: &str, span: f64, step: f64, min_step: f64) -> Result<usize, PatternError> {
    if step < min_step {
        return Err(PatternError::InvalidGeometry(format!(
            "{} {} mm is finer than one motor step ({} mm)",
            name, step, min_step
        )));
    }
    let passes = (span / step + 1e-9).floor() + 1.0;
    if !passes.is_finite() || passes > MAX_PATTERN_PASSES as f64 {
        return Err(PatternError::InvalidGeometry(format!(
            "{} {} mm over {} mm needs more than {} passes",
            name, step, span, MAX_PATTERN_PASSES
        )));
    }
    Ok(passes as usize)
}

/// Ring radii from `outer` inwards in `step` increments, never below `inner`.
pub fn disc_radii(outer: f64, inner: f64, step: f64) -> Vec<f64> {
    let rings = ((outer - inner) / step + 1e-9).floor() as usize + 1;
    (0..rings)
        .map(|i| outer - i as f64 * step)
        .filter(|&r| r > 1e-9)
        .collect()
}

/// Fill an annulus with concentric circles, starting at the outer radius.
///
/// The disc volume `π·t·(r_outer² − r_inner²)` is split across the rings in
/// proportion to their circumference. The tip steps `+X` by `step` between
/// rings, towards the common centre.
pub fn print_disc<S: LineSink>(
    controller: &mut MotionController<S>,
    outer_radius: f64,
    inner_radius: f64,
    step: f64,
    thickness: f64,
    direction: ArcDirection,
) -> Result<(), PatternError> {
    require_positive("outer radius", outer_radius)?;
    require_positive("ring step", step)?;
    require_positive("thickness", thickness)?;
    if !inner_radius.is_finite() || inner_radius < 0.0 || inner_radius >= outer_radius {
        return Err(PatternError::InvalidGeometry(format!(
            "inner radius must be in [0, {}), got {}",
            outer_radius, inner_radius
        )));
    }

    let min_step = 1.0 / controller.steps_per_mm(Axis::X);
    pass_count("ring step", outer_radius - inner_radius, step, min_step)?;
    let radii = disc_radii(outer_radius, inner_radius, step);
    let total_path: f64 = radii.iter().map(|r| 2.0 * PI * r).sum();
    let volume = PI * thickness * (outer_radius.powi(2) - inner_radius.powi(2));
    let total_e = volume / controller.syringe_area_mm2();
    tracing::info!(
        "Disc: {} rings, {:.3} uL over {:.3} mm of path",
        radii.len(),
        volume,
        total_path
    );

    for (i, &radius) in radii.iter().enumerate() {
        let weight = 2.0 * PI * radius / total_path;
        controller.circular_move(radius, "+X", Some(total_e * weight), ExtrusionUnit::Millimeters, direction)?;
        if i + 1 != radii.len() {
            controller.linear_move(AxisTarget::new().x(step), ExtrusionUnit::Millimeters)?;
        }
    }
    Ok(())
}

/// One square layer of `side`, centred on the current position.
///
/// Moves to the `-X -Y` corner (raising by `lift` first when it is non-zero,
/// `-Z` being up on this stage), then rasters serpentine lines along X spaced
/// `spacing` apart in +Y. The layer volume `layer_height·side²` is shared
/// equally between the lines.
pub fn print_square<S: LineSink>(
    controller: &mut MotionController<S>,
    side: f64,
    layer_height: f64,
    spacing: f64,
    lift: f64,
) -> Result<(), PatternError> {
    require_positive("side", side)?;
    require_positive("layer height", layer_height)?;
    require_positive("line spacing", spacing)?;
    if !lift.is_finite() || lift < 0.0 {
        return Err(PatternError::InvalidGeometry(format!("lift must be >= 0, got {}", lift)));
    }

    let min_step = 1.0 / controller.steps_per_mm(Axis::Y);
    let lines = pass_count("line spacing", side, spacing, min_step)?;

    let d = controller.settings().output_digits;
    let layer_volume = layer_height * side * side;
    controller.blank_line()?;
    controller.write_comment(&format!(
        "Printing square layer: {side:.d$} X {side:.d$} X {layer_height:.d$}mm"
    ))?;
    controller.write_comment(&format!("Layer volume: {:.d$} uL", layer_volume))?;

    let corner = AxisTarget::new().x(-side / 2.0).y(-side / 2.0);
    if lift > 0.0 {
        controller.linear_move(AxisTarget::new().z(-lift), ExtrusionUnit::Millimeters)?;
        controller.linear_move(corner, ExtrusionUnit::Millimeters)?;
        controller.linear_move(AxisTarget::new().z(lift), ExtrusionUnit::Millimeters)?;
    } else {
        controller.linear_move(corner, ExtrusionUnit::Millimeters)?;
    }

    let per_line = layer_volume / lines as f64;
    for i in 0..lines {
        let dx = if i % 2 == 0 { side } else { -side };
        controller.linear_move(AxisTarget::new().x(dx).e(per_line), ExtrusionUnit::Microliters)?;
        if i + 1 != lines {
            controller.linear_move(AxisTarget::new().y(spacing), ExtrusionUnit::Millimeters)?;
        }
    }
    Ok(())
}
