// src/axis.rs - Axis enumeration and fixed-size per-axis tables
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Logical axes of the stage. X/Y/Z move the tip, E drives the syringe plunger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    E,
}

impl Axis {
    /// All axes in command-formatting order.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// Axes that contribute to travel distance.
    pub const MOTION: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::E => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::E => 'E',
        }
    }

    pub fn is_extrusion(self) -> bool {
        matches!(self, Axis::E)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A value for every axis, stored in X, Y, Z, E order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisMap<T>([T; 4]);

impl<T> AxisMap<T> {
    pub const fn new(values: [T; 4]) -> Self {
        Self(values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        Axis::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> AxisMap<U> {
        AxisMap(self.0.map(f))
    }

    pub fn as_array(&self) -> &[T; 4] {
        &self.0
    }
}

impl<T> Index<Axis> for AxisMap<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        &self.0[axis.index()]
    }
}

impl<T> IndexMut<Axis> for AxisMap<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        &mut self.0[axis.index()]
    }
}

/// Optional per-axis values for a single call. `None` leaves that axis untouched.
///
/// ```
/// use bioprint_gcode::axis::{Axis, AxisTarget};
/// let target = AxisTarget::new().x(5.0).e(1.0);
/// assert_eq!(target.get(Axis::X), Some(5.0));
/// assert_eq!(target.get(Axis::Y), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisTarget(AxisMap<Option<f64>>);

impl AxisTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(self, value: f64) -> Self {
        self.with(Axis::X, value)
    }

    pub fn y(self, value: f64) -> Self {
        self.with(Axis::Y, value)
    }

    pub fn z(self, value: f64) -> Self {
        self.with(Axis::Z, value)
    }

    pub fn e(self, value: f64) -> Self {
        self.with(Axis::E, value)
    }

    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.0[axis] = Some(value);
        self
    }

    pub fn get(&self, axis: Axis) -> Option<f64> {
        self.0[axis]
    }

    pub fn set(&mut self, axis: Axis, value: Option<f64>) {
        self.0[axis] = value;
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|(_, v)| v.is_none())
    }

    /// Specified axes with their values, in formatting order.
    pub fn specified(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        self.0.iter().filter_map(|(axis, v)| v.map(|v| (axis, v)))
    }
}
