//! G-code generation for syringe-pump bioprinters.
//!
//! [`MotionController`] turns moves, volumetric extrusions, feedrate changes
//! and circles into G-code lines while keeping a step-exact model of the
//! stage: position, travel, dispensed volume and print time.
//!
//! ```
//! use bioprint_gcode::{AxisTarget, BufferSink, Config, ExtrusionUnit, MotionController};
//!
//! let mut g = MotionController::from_config(&Config::default(), BufferSink::new()).unwrap();
//! g.linear_move(AxisTarget::new().x(5.0).e(2.0), ExtrusionUnit::Microliters).unwrap();
//! assert!(g.sink().last().unwrap().starts_with("G1 X5.0000 E"));
//! ```

pub mod axis;
pub mod config;
pub mod gcode;
pub mod motion;
pub mod output;
pub mod patterns;
pub mod report;
pub mod units;
pub mod vessel;
pub mod wellplate;

pub use axis::{Axis, AxisMap, AxisTarget};
pub use config::{load_config, Config, ConfigError, HardwareTables, MachineSettings};
pub use gcode::{ArcDirection, GCodeCommand};
pub use motion::{ArcAxis, ControllerError, MotionController};
pub use output::{BufferSink, LineSink, WriterSink};
pub use report::Summary;
pub use units::{ExtrusionUnit, FeedrateUnit};
