// src/report.rs - End-of-job summary values and their comment lines
use serde::Serialize;

use crate::axis::AxisMap;

/// Position and totals at a point in the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub position_mm: AxisMap<f64>,
    pub travel_distance_mm: f64,
    pub extrusion_distance_mm: f64,
    pub extrusion_volume_ul: f64,
    pub print_time_s: f64,
}

pub fn location_line(summary: &Summary, d: usize) -> String {
    let fields = summary
        .position_mm
        .iter()
        .map(|(axis, mm)| format!("{}{:.d$}", axis, mm))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Current location (mm): {}", fields)
}

pub fn distance_lines(summary: &Summary, d: usize) -> [String; 2] {
    [
        format!("Total travel distance: {:.d$} mm", summary.travel_distance_mm),
        format!("Total extrusion distance: {:.d$} mm", summary.extrusion_distance_mm),
    ]
}

pub fn volume_line(summary: &Summary, d: usize) -> String {
    format!("Total extruded volume: {:.d$} uL", summary.extrusion_volume_ul)
}

pub fn print_time_line(summary: &Summary, d: usize) -> String {
    format!("Total print time: {}", format_duration(summary.print_time_s, d))
}

/// `12.5000 s` up to a minute, `2 min 5.0000 s` beyond.
pub fn format_duration(seconds: f64, d: usize) -> String {
    // Seconds part stays below 60 at the printed precision
    let scale = 10f64.powi(d as i32);
    let seconds = (seconds * scale).round() / scale;
    if seconds > 60.0 {
        let minutes = (seconds / 60.0).floor();
        let rest = seconds - minutes * 60.0;
        format!("{} min {:.d$} s", minutes as u64, rest)
    } else {
        format!("{:.d$} s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> Summary {
        Summary {
            position_mm: AxisMap::new([10.0, -9.1, 0.0, 1.25]),
            travel_distance_mm: 37.699,
            extrusion_distance_mm: 1.26,
            extrusion_volume_ul: 22.4,
            print_time_s: 125.5,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.5, 2), "12.50 s");
        assert_eq!(format_duration(60.0, 1), "60.0 s");
        assert_eq!(format_duration(125.5, 1), "2 min 5.5 s");
        assert_eq!(format_duration(119.99996, 4), "2 min 0.0000 s");
        assert_eq!(format_duration(179.96, 1), "3 min 0.0 s");
    }

    #[test]
    fn test_report_lines() {
        let s = summary();
        assert_eq!(location_line(&s, 2), "Current location (mm): X10.00 Y-9.10 Z0.00 E1.25");
        let [travel, extrusion] = distance_lines(&s, 1);
        assert_eq!(travel, "Total travel distance: 37.7 mm");
        assert_eq!(extrusion, "Total extrusion distance: 1.3 mm");
        assert_eq!(volume_line(&s, 1), "Total extruded volume: 22.4 uL");
        assert_eq!(print_time_line(&s, 1), "Total print time: 2 min 5.5 s");
    }
}
