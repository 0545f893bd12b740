// src/motion/controller.rs - Stateful G-code generator for the syringe-pump stage
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::axis::{Axis, AxisMap, AxisTarget};
use crate::config::{Config, ConfigError, HardwareTables, MachineSettings, SyringeSpec, TipSpec};
use crate::gcode::{ArcDirection, GCodeCommand, Word};
use crate::motion::state::{Accumulators, MovePlan, PositionState};
use crate::motion::stepper::StepConverter;
use crate::output::LineSink;
use crate::report::{self, Summary};
use crate::units::{circle_area, ExtrusionUnit, FeedrateUnit};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Plane and side of a full-circle move, written as `+X`, `-X`, `+Y` or `-Y`.
///
/// The centre sits `radius` away from the current position along the named
/// axis, on the named side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcAxis {
    pub axis: Axis,
    pub negative: bool,
}

impl ArcAxis {
    /// `I` or `J` centre offset word for the given radius.
    pub fn offset_word(&self, radius: f64) -> Word {
        let letter = if self.axis == Axis::X { 'I' } else { 'J' };
        let value = if self.negative { -radius } else { radius };
        Word::new(letter, value)
    }
}

impl FromStr for ArcAxis {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut axis = None;
        let mut negative = None;
        let mut planes = 0;
        let mut signs = 0;
        for c in s.trim().chars() {
            match c.to_ascii_uppercase() {
                'X' => {
                    planes += 1;
                    axis = Some(Axis::X);
                }
                'Y' => {
                    planes += 1;
                    axis = Some(Axis::Y);
                }
                '+' => {
                    signs += 1;
                    negative = Some(false);
                }
                '-' => {
                    signs += 1;
                    negative = Some(true);
                }
                _ => {
                    return Err(ControllerError::InvalidArgument(format!(
                        "unexpected character '{}' in circular move axis '{}'",
                        c, s
                    )));
                }
            }
        }
        match (axis, negative) {
            (Some(axis), Some(negative)) if planes == 1 && signs == 1 => Ok(ArcAxis { axis, negative }),
            _ if planes != 1 => Err(ControllerError::InvalidArgument(format!(
                "axis of circular move not indicated in '{}' (expected exactly one of X or Y)",
                s
            ))),
            _ => Err(ControllerError::InvalidArgument(format!(
                "positive or negative not indicated in '{}' (expected exactly one of + or -)",
                s
            ))),
        }
    }
}

impl fmt::Display for ArcAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.negative { '-' } else { '+' }, self.axis)
    }
}

/// Tracks position, travel, dispensed volume and time while writing G-code
/// for every call to a [`LineSink`].
pub struct MotionController<S: LineSink> {
    settings: MachineSettings,
    syringe: SyringeSpec,
    tip: TipSpec,
    syringe_area_mm2: f64,
    tip_area_mm2: f64,
    steps: StepConverter,
    state: PositionState,
    totals: Accumulators,
    feedrate: f64,
    cold_extrusion_allowed: Option<bool>,
    sink: S,
}

impl<S: LineSink> MotionController<S> {
    /// Resolve the syringe and tip, then write the startup block.
    ///
    /// Unknown consumables fail before anything reaches the sink.
    pub fn new(settings: MachineSettings, tables: &HardwareTables, sink: S) -> Result<Self, ControllerError> {
        settings.validate()?;
        let syringe = *tables.syringe(&settings.syringe)?;
        let tip = *tables.tip(&settings.tip)?;

        let mut controller = Self {
            syringe_area_mm2: circle_area(syringe.diameter_mm),
            tip_area_mm2: circle_area(tip.inner_diameter_mm),
            steps: StepConverter::new(settings.steps_per_mm),
            state: PositionState::new(true),
            totals: Accumulators::default(),
            feedrate: settings.initial_feedrate,
            cold_extrusion_allowed: None,
            settings,
            syringe,
            tip,
            sink,
        };

        tracing::info!(
            "Motion controller ready: syringe {} ({:.4} uL/mm), tip {}",
            controller.settings.syringe,
            controller.syringe_area_mm2,
            controller.settings.tip
        );

        controller.setup()?;
        Ok(controller)
    }

    pub fn from_config(config: &Config, sink: S) -> Result<Self, ControllerError> {
        Self::new(config.machine.clone(), &config.tables(), sink)
    }

    fn setup(&mut self) -> Result<(), ControllerError> {
        if self.settings.include_header {
            self.header()?;
        }
        self.blank_line()?;
        self.set_relative()?;
        let defaults = self.settings.steps_per_mm;
        let all_axes = Axis::ALL
            .iter()
            .fold(AxisTarget::new(), |t, &axis| t.with(axis, defaults[axis]));
        self.set_axis_steps_per_mm(all_axes, None)?;
        self.set_cold_extrusion_allowed(true)?;
        self.set_feedrate(self.settings.initial_feedrate, FeedrateUnit::MmPerMin)?;
        self.blank_line()
    }

    fn digits(&self) -> usize {
        self.settings.output_digits
    }

    fn emit(&mut self, command: GCodeCommand) -> Result<(), ControllerError> {
        let line = command.render(self.digits());
        tracing::trace!("Emitting: {}", line);
        self.sink.emit_line(&line)?;
        Ok(())
    }

    fn comment(&mut self, text: String) -> Result<(), ControllerError> {
        self.emit(GCodeCommand::Comment(text))
    }

    // ---------- Output helpers ----------

    /// Write a line verbatim.
    pub fn write_raw(&mut self, line: &str) -> Result<(), ControllerError> {
        self.sink.emit_line(line)?;
        Ok(())
    }

    pub fn write_comment(&mut self, text: &str) -> Result<(), ControllerError> {
        self.comment(text.to_string())
    }

    pub fn blank_line(&mut self) -> Result<(), ControllerError> {
        self.emit(GCodeCommand::Blank)
    }

    // ---------- Motion ----------

    /// Straight move on any subset of axes.
    ///
    /// With [`ExtrusionUnit::Microliters`] the E value is a volume and is
    /// converted to plunger travel first. Only axes whose step count actually
    /// changes are written to the `G1` line.
    pub fn linear_move(&mut self, target: AxisTarget, unit: ExtrusionUnit) -> Result<(), ControllerError> {
        for (axis, value) in target.specified() {
            if !value.is_finite() {
                return Err(ControllerError::InvalidArgument(format!(
                    "{} value must be a finite number, got {}",
                    axis, value
                )));
            }
        }

        let mut target = target;
        if let Some(e) = target.get(Axis::E) {
            target.set(Axis::E, Some(unit.to_millimeters(e, self.syringe_area_mm2)));
        }

        let plan = self.state.plan(&self.steps, &target, self.syringe_area_mm2)?;
        let d = self.digits();
        let mut diagnostics = Vec::new();
        let mut move_time = 0.0;

        if plan.xyz_distance_mm != 0.0 {
            move_time = 60.0 * plan.xyz_distance_mm / self.feedrate;
            if plan.extrusion_distance_mm != 0.0 {
                let espeed = 60.0 * plan.extrusion_distance_mm / move_time;
                let flowrate = espeed * self.syringe_area_mm2 / 60.0;
                let filament_area = plan.new_volume_ul / plan.xyz_distance_mm;
                let filament_width = 4.0 * filament_area / PI / self.settings.layer_height;
                diagnostics.push(rate_line(espeed, flowrate, d));
                diagnostics.push(format!(
                    "Extr. volume: {:.d$} uL | Filament area: {:.d$} mm^2",
                    plan.new_volume_ul, filament_area
                ));
                diagnostics.push(format!(
                    "Filament width (elliptical assumption): {:.d$} mm",
                    filament_width
                ));
            }
        } else if plan.extrusion_distance_mm != 0.0 {
            move_time = 60.0 * plan.extrusion_distance_mm / self.feedrate;
            let espeed = self.feedrate;
            let flowrate = espeed * self.syringe_area_mm2 / 60.0;
            diagnostics.push(rate_line(espeed, flowrate, d));
            diagnostics.push(format!("Extr. volume: {:.d$} uL", plan.new_volume_ul));
        }

        if target.get(Axis::E).is_some() && plan.new_volume_ul == 0.0 && plan.moves(Axis::E) {
            tracing::debug!("E move stays below the high-water mark; no new volume dispensed");
        }

        self.commit(&plan, plan.xyz_distance_mm, move_time);

        for line in diagnostics {
            self.comment(line)?;
        }

        let words = target
            .specified()
            .filter(|&(axis, _)| plan.moves(axis))
            .map(|(axis, value)| Word::axis(axis, value))
            .collect();
        tracing::debug!(
            "Linear move: {:.4} mm travel, {:.4} mm extrusion, {:.4} uL new",
            plan.xyz_distance_mm,
            plan.extrusion_distance_mm,
            plan.new_volume_ul
        );
        self.emit(GCodeCommand::LinearMove(words))
    }

    /// Full circle of `radius` starting at the current position.
    ///
    /// `axis` names the side the centre lies on (`+X`, `-X`, `+Y`, `-Y`). The
    /// move always runs in relative positioning; an absolute session is
    /// switched for the duration of the call and switched back afterwards.
    /// Travel is accounted as the full circumference.
    pub fn circular_move(
        &mut self,
        radius: f64,
        axis: &str,
        extrusion: Option<f64>,
        unit: ExtrusionUnit,
        direction: ArcDirection,
    ) -> Result<(), ControllerError> {
        let arc_axis: ArcAxis = axis.parse()?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ControllerError::InvalidArgument(format!(
                "circle radius must be a positive number, got {}",
                radius
            )));
        }
        if let Some(e) = extrusion {
            if !e.is_finite() {
                return Err(ControllerError::InvalidArgument(format!(
                    "E value must be a finite number, got {}",
                    e
                )));
            }
        }

        self.with_relative_positioning(|c| c.circle(radius, arc_axis, extrusion, unit, direction))
    }

    fn circle(
        &mut self,
        radius: f64,
        arc_axis: ArcAxis,
        extrusion: Option<f64>,
        unit: ExtrusionUnit,
        direction: ArcDirection,
    ) -> Result<(), ControllerError> {
        let e_mm = extrusion.map(|e| unit.to_millimeters(e, self.syringe_area_mm2));
        let mut target = AxisTarget::new();
        if let Some(e) = e_mm {
            target = target.e(e);
        }
        let plan = self.state.plan(&self.steps, &target, self.syringe_area_mm2)?;

        let d = self.digits();
        let circumference = 2.0 * PI * radius;
        self.comment(format!(
            "Circular path -> Dir: {} | D: {:.d$} mm | C: {:.d$} mm",
            arc_axis,
            2.0 * radius,
            circumference
        ))?;
        let move_time = 60.0 * circumference / self.feedrate;
        self.commit(&plan, circumference, move_time);

        // No extrusion requested means no extrusion diagnostics at all
        if e_mm.is_some() && plan.extrusion_distance_mm != 0.0 {
            let espeed = 60.0 * plan.extrusion_distance_mm / move_time;
            let flowrate = espeed * self.syringe_area_mm2 / 60.0;
            self.comment(format!(
                "Extrusion rate: {:.d$} mm/min | Flow rate: {:.d$} uL/s",
                espeed, flowrate
            ))?;
        }

        let mut words = Vec::new();
        if let Some(e) = e_mm {
            if plan.moves(Axis::E) {
                words.push(Word::axis(Axis::E, e));
            }
        }
        words.push(arc_axis.offset_word(radius));
        tracing::debug!("Circular move {} r={} ({})", arc_axis, radius, direction);
        self.emit(GCodeCommand::Arc { direction, words })
    }

    fn commit(&mut self, plan: &MovePlan, travel_mm: f64, move_time_s: f64) {
        self.state.commit(plan);
        self.totals.travel_distance_mm += travel_mm;
        self.totals.extrusion_distance_mm += plan.extrusion_distance_mm;
        self.totals.extrusion_volume_ul += plan.new_volume_ul;
        self.totals.print_time_s += move_time_s;
    }

    /// Run `f` in relative positioning and restore the previous mode on every
    /// exit path. An error from `f` wins over an error while restoring.
    pub fn with_relative_positioning<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError> {
        let was_absolute = !self.state.is_relative();
        if was_absolute {
            self.set_relative()?;
        }
        let result = f(self);
        if was_absolute {
            let restored = self.set_absolute();
            return match (result, restored) {
                (Err(e), _) => Err(e),
                (Ok(_), Err(e)) => Err(e),
                (Ok(value), Ok(())) => Ok(value),
            };
        }
        result
    }

    // ---------- Machine settings ----------

    /// Set the feedrate used by later moves. Volumetric rates are converted to
    /// plunger speed through the syringe area.
    pub fn set_feedrate(&mut self, rate: f64, unit: FeedrateUnit) -> Result<(), ControllerError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ControllerError::InvalidArgument(format!(
                "feedrate must be a positive number, got {} {}",
                rate, unit
            )));
        }
        self.feedrate = unit.to_mm_per_min(rate, self.syringe_area_mm2);
        tracing::info!("Feedrate set to {:.4} mm/min ({} {})", self.feedrate, rate, unit);

        let d = self.digits();
        let area = self.syringe_area_mm2;
        self.comment(format!(
            "Extr. rate: {:.d$} mm/min ({:.d$} uL/s | {:.d$} mL/min)",
            self.feedrate,
            self.feedrate * area / 60.0,
            self.feedrate * area / 1000.0
        ))?;
        self.emit(GCodeCommand::SetFeedrate(self.feedrate))
    }

    pub fn set_relative(&mut self) -> Result<(), ControllerError> {
        self.emit(GCodeCommand::RelativePositioning)?;
        self.state.set_relative(true);
        tracing::debug!("Relative positioning");
        Ok(())
    }

    pub fn set_absolute(&mut self) -> Result<(), ControllerError> {
        self.emit(GCodeCommand::AbsolutePositioning)?;
        self.state.set_relative(false);
        tracing::debug!("Absolute positioning");
        Ok(())
    }

    /// Override step resolution for the given axes. Later moves use the new
    /// values; the current step counts are kept as they are.
    pub fn set_axis_steps_per_mm(&mut self, values: AxisTarget, comment: Option<&str>) -> Result<(), ControllerError> {
        for (axis, steps) in values.specified() {
            if !steps.is_finite() || steps <= 0.0 {
                return Err(ControllerError::InvalidArgument(format!(
                    "steps per mm for axis {} must be a positive number, got {}",
                    axis, steps
                )));
            }
        }
        let mut words = Vec::new();
        for (axis, steps) in values.specified() {
            self.steps.set_steps_per_mm(axis, steps);
            words.push(Word::axis(axis, steps));
        }
        self.emit(GCodeCommand::SetStepsPerMm {
            words,
            comment: comment.map(str::to_string),
        })
    }

    /// `M302`: let the firmware move E below its minimum extrusion temperature.
    pub fn set_cold_extrusion_allowed(&mut self, allow: bool) -> Result<(), ControllerError> {
        self.cold_extrusion_allowed = Some(allow);
        self.emit(GCodeCommand::ColdExtrusion(allow))
    }

    // ---------- Reporting ----------

    fn header(&mut self) -> Result<(), ControllerError> {
        let d = self.digits();
        let area = self.syringe_area_mm2;
        let min_step_um = Axis::ALL
            .iter()
            .map(|&axis| format!("{}{:.d$}", axis, 1000.0 * self.steps.mm_per_step(axis)))
            .collect::<Vec<_>>()
            .join(" ");
        let lines = vec![
            format!("Printer is using {}X microstepping", self.settings.microstepping),
            format!(
                "There are {} steps per revolution of the motor.",
                self.settings.steps_per_revolution()
            ),
            format!("Min. travel/extrusion distance (um): {}", min_step_um),
            format!("Syringe type: {}", self.settings.syringe),
            format!("Syringe extrusion (uL/mm): {:.d$}", area),
            format!("Syringe waste volume (mL): {}", self.syringe.waste_volume_ml),
            format!(
                "Min. extrudable volume (uL): {:.d$}",
                self.steps.mm_per_step(Axis::E) * area
            ),
            format!("Tip type: {}", self.settings.tip),
            format!("Tip inner diameter (mm): {:.d$}", self.tip.inner_diameter_mm),
            format!("Tip cross-section (mm^2): {:.d$}", self.tip_area_mm2),
            format!("Tip void volume (mL): {:.d$}", self.tip.void_volume_ml),
            format!("Total waste volume (mL): {:.d$}", self.waste_volume_ml()),
            format!("Volumetric flow: {:.d$} uL/min for every 100 mm/min", 100.0 * area),
            format!(
                "For syringe extrusion rate of 100 mm/min, tip extrusion rate is {:.d$} mm/min",
                100.0 * area / self.tip_area_mm2
            ),
        ];
        for line in lines {
            self.comment(line)?;
        }
        Ok(())
    }

    /// Snapshot of position and totals. Does not change any state.
    pub fn summary(&self) -> Summary {
        Summary {
            position_mm: AxisMap::new(Axis::ALL.map(|axis| self.position_mm(axis))),
            travel_distance_mm: self.totals.travel_distance_mm,
            extrusion_distance_mm: self.totals.extrusion_distance_mm,
            extrusion_volume_ul: self.totals.extrusion_volume_ul,
            print_time_s: self.totals.print_time_s,
        }
    }

    /// Blank line followed by location, distances, volume and time.
    pub fn summary_report(&mut self) -> Result<(), ControllerError> {
        self.blank_line()?;
        self.report_current_location()?;
        self.report_distances()?;
        self.report_extrusion_volume()?;
        self.report_print_time()
    }

    pub fn report_current_location(&mut self) -> Result<(), ControllerError> {
        let line = report::location_line(&self.summary(), self.digits());
        self.comment(line)
    }

    pub fn report_distances(&mut self) -> Result<(), ControllerError> {
        let summary = self.summary();
        let [travel, extrusion] = report::distance_lines(&summary, self.digits());
        self.comment(travel)?;
        self.comment(extrusion)
    }

    pub fn report_extrusion_volume(&mut self) -> Result<(), ControllerError> {
        let line = report::volume_line(&self.summary(), self.digits());
        self.comment(line)
    }

    pub fn report_print_time(&mut self) -> Result<(), ControllerError> {
        let line = report::print_time_line(&self.summary(), self.digits());
        self.comment(line)
    }

    // ---------- Accessors ----------

    pub fn settings(&self) -> &MachineSettings {
        &self.settings
    }

    pub fn position_steps(&self, axis: Axis) -> i64 {
        self.state.steps(axis)
    }

    pub fn position_mm(&self, axis: Axis) -> f64 {
        self.steps.to_mm(axis, self.state.steps(axis))
    }

    pub fn history(&self, axis: Axis) -> &[i64] {
        self.state.history(axis)
    }

    pub fn max_extrusion_step(&self) -> i64 {
        self.state.max_extrusion_step()
    }

    pub fn is_relative(&self) -> bool {
        self.state.is_relative()
    }

    pub fn totals(&self) -> &Accumulators {
        &self.totals
    }

    /// Current feedrate in mm/min.
    pub fn feedrate(&self) -> f64 {
        self.feedrate
    }

    pub fn steps_per_mm(&self, axis: Axis) -> f64 {
        self.steps.steps_per_mm(axis)
    }

    /// Syringe bore area; also the volume in uL per mm of plunger travel.
    pub fn syringe_area_mm2(&self) -> f64 {
        self.syringe_area_mm2
    }

    pub fn tip_area_mm2(&self) -> f64 {
        self.tip_area_mm2
    }

    /// Liquid that never leaves the syringe and tip, in mL.
    pub fn waste_volume_ml(&self) -> f64 {
        self.syringe.waste_volume_ml + self.tip.void_volume_ml
    }

    pub fn cold_extrusion_allowed(&self) -> Option<bool> {
        self.cold_extrusion_allowed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

fn rate_line(espeed: f64, flowrate: f64, d: usize) -> String {
    format!(
        "Extr. rate: {:.d$} mm/min ({:.d$} uL/s | {:.d$} mL/min)",
        espeed,
        flowrate,
        60.0 * flowrate / 1000.0
    )
}
