// src/motion/mod.rs - Position tracking and the G-code emitting controller

pub mod controller;
pub mod state;
pub mod stepper;

pub use controller::{ArcAxis, ControllerError, MotionController};
pub use state::{Accumulators, MovePlan, PositionState};
pub use stepper::StepConverter;
