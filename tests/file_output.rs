// Integration tests for file-backed config and G-code output

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use bioprint_gcode::{load_config, AxisTarget, ExtrusionUnit, MotionController, WriterSink};
    use tempfile::tempdir;

    #[test]
    fn test_job_written_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.gcode");
        let sink = WriterSink::new(File::create(&path).unwrap());

        let mut config = bioprint_gcode::Config::default();
        config.machine.include_header = false;
        let mut controller = MotionController::from_config(&config, sink).unwrap();
        controller.linear_move(AxisTarget::new().x(5.0), ExtrusionUnit::Millimeters).unwrap();
        assert_eq!(controller.sink().lines_written(), 8);
        drop(controller.into_sink().into_inner());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("\nG91\n"));
        assert!(text.ends_with("G1 X5.0000\n"));
    }

    #[test]
    fn test_custom_syringe_from_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("printer.toml");
        fs::write(
            &path,
            r#"
[machine]
syringe = "Hamilton-250ul"
include_header = false
output_digits = 2

[syringes."Hamilton-250ul"]
diameter_mm = 2.30
waste_volume_ml = 0.01
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let mut controller = MotionController::from_config(&config, bioprint_gcode::BufferSink::new()).unwrap();
        let area = std::f64::consts::PI * 1.15 * 1.15;
        assert!((controller.syringe_area_mm2() - area).abs() < 1e-9);

        controller
            .linear_move(AxisTarget::new().e(area), ExtrusionUnit::Microliters)
            .unwrap();
        assert_eq!(controller.sink().last(), Some("G1 E1.00"));
        // Built-in entries are still available next to the file's own
        assert!(config.tables().syringe("BD-1ml").is_ok());
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[machine]\noutput_digits = \"four\"\n").unwrap();
        assert!(load_config(&path).is_err());
        assert!(load_config(dir.path().join("missing.toml")).is_err());
    }
}
