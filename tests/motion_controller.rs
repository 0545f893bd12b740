// Integration tests for the motion controller: positions, totals and emitted lines

#[cfg(test)]
mod tests {
    use bioprint_gcode::gcode::ArcDirection;
    use bioprint_gcode::{
        Axis, AxisTarget, BufferSink, Config, ConfigError, ControllerError, ExtrusionUnit, FeedrateUnit,
        MotionController,
    };

    const BD_1ML_AREA: f64 = 17.945_091_4;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.machine.include_header = false;
        config
    }

    /// Controller with the startup block already drained from its sink.
    fn create_controller() -> MotionController<BufferSink> {
        let mut controller = MotionController::from_config(&create_test_config(), BufferSink::new()).unwrap();
        controller.sink_mut().drain();
        controller
    }

    fn mm() -> ExtrusionUnit {
        ExtrusionUnit::Millimeters
    }

    #[test]
    fn test_startup_block_without_header() {
        let controller = MotionController::from_config(&create_test_config(), BufferSink::new()).unwrap();
        assert_eq!(
            controller.sink().lines(),
            &[
                "",
                "G91",
                "M92 X80.0000 Y80.0000 Z400.0000 E3540.0000",
                "M302 P1",
                ";Extr. rate: 100.0000 mm/min (29.9085 uL/s | 1.7945 mL/min)",
                "G1 F100.0000",
                "",
            ]
        );
        assert!(controller.is_relative());
        assert_eq!(controller.cold_extrusion_allowed(), Some(true));
        assert_eq!(controller.feedrate(), 100.0);
        assert_eq!(controller.history(Axis::E), &[0]);
    }

    #[test]
    fn test_startup_block_with_header() {
        let controller = MotionController::from_config(&Config::default(), BufferSink::new()).unwrap();
        let lines = controller.sink().lines();
        assert_eq!(lines[0], ";Printer is using 16X microstepping");
        assert_eq!(lines[1], ";There are 3200 steps per revolution of the motor.");
        assert!(lines.iter().any(|l| l == ";Syringe type: BD-1ml"));
        assert!(lines.iter().any(|l| l.starts_with(";Tip inner diameter (mm): ")));
        assert!(lines.iter().any(|l| l.starts_with(";Total waste volume (mL): ")));
        assert!(lines.contains(&"G91".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_unknown_consumables_emit_nothing() {
        let mut sink = BufferSink::new();
        let mut config = create_test_config();
        config.machine.syringe = "BD-50ml".to_string();
        assert!(matches!(
            MotionController::from_config(&config, &mut sink),
            Err(ControllerError::Config(ConfigError::UnknownSyringe(_)))
        ));

        let mut config = create_test_config();
        config.machine.tip = "JG99".to_string();
        assert!(matches!(
            MotionController::from_config(&config, &mut sink),
            Err(ControllerError::Config(ConfigError::UnknownTip(_)))
        ));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_volumetric_well_dispense() {
        let mut controller = create_controller();
        controller
            .linear_move(AxisTarget::new().e(25.0), ExtrusionUnit::Microliters)
            .unwrap();

        assert_eq!(controller.position_steps(Axis::E), 4932);
        assert_eq!(controller.max_extrusion_step(), 4932);
        let totals = controller.totals();
        assert!((totals.extrusion_volume_ul - 25.0015).abs() < 1e-3);
        assert!((totals.extrusion_distance_mm - 4932.0 / 3540.0).abs() < 1e-9);
        assert_eq!(totals.travel_distance_mm, 0.0);
        // E-only move: time from extrusion distance at the current feedrate
        assert!((totals.print_time_s - 60.0 * (4932.0 / 3540.0) / 100.0).abs() < 1e-9);

        let lines = controller.sink().lines();
        assert_eq!(lines[0], ";Extr. rate: 100.0000 mm/min (29.9085 uL/s | 1.7945 mL/min)");
        assert_eq!(lines[1], ";Extr. volume: 25.0015 uL");
        assert_eq!(lines[2], "G1 E1.3931");
    }

    #[test]
    fn test_volumetric_feedrates() {
        let mut controller = create_controller();
        controller.set_feedrate(1.0, FeedrateUnit::MlPerMin).unwrap();
        assert!((controller.feedrate() - 55.7255).abs() < 1e-4);
        assert_eq!(controller.sink().last(), Some("G1 F55.7255"));

        controller.set_feedrate(1.0, FeedrateUnit::UlPerSec).unwrap();
        assert!((controller.feedrate() - 60.0 / BD_1ML_AREA).abs() < 1e-6);

        controller.set_feedrate(60.0, FeedrateUnit::UlPerMin).unwrap();
        assert!((controller.feedrate() - 60.0 / BD_1ML_AREA).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_non_positive_feedrate() {
        let mut controller = create_controller();
        for bad in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                controller.set_feedrate(bad, FeedrateUnit::MmPerMin),
                Err(ControllerError::InvalidArgument(_))
            ));
        }
        assert_eq!(controller.feedrate(), 100.0);
        assert!(controller.sink().lines().is_empty());
    }

    #[test]
    fn test_relative_moves_accumulate() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().x(5.0), mm()).unwrap();
        controller.linear_move(AxisTarget::new().x(5.0), mm()).unwrap();

        assert_eq!(controller.position_steps(Axis::X), 800);
        assert!((controller.position_mm(Axis::X) - 10.0).abs() < 1e-9);
        assert_eq!(controller.history(Axis::X), &[0, 400, 800]);
        assert_eq!(controller.history(Axis::Y), &[0, 0, 0]);
        assert!((controller.totals().travel_distance_mm - 10.0).abs() < 1e-9);
        assert_eq!(controller.sink().lines(), &["G1 X5.0000", "G1 X5.0000"]);
    }

    #[test]
    fn test_zero_net_relative_moves_return_home() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().x(5.0).y(2.5), mm()).unwrap();
        controller.linear_move(AxisTarget::new().x(-5.0).y(-2.5), mm()).unwrap();

        assert_eq!(controller.position_steps(Axis::X), 0);
        assert_eq!(controller.position_steps(Axis::Y), 0);
        let one_leg = (5.0f64 * 5.0 + 2.5 * 2.5).sqrt();
        assert!((controller.totals().travel_distance_mm - 2.0 * one_leg).abs() < 1e-9);
    }

    #[test]
    fn test_sub_step_relative_moves_stay_within_rounding_bound() {
        let mut controller = create_controller();
        for _ in 0..10 {
            controller.linear_move(AxisTarget::new().x(0.006), mm()).unwrap();
        }
        controller.linear_move(AxisTarget::new().x(-0.06), mm()).unwrap();

        // 0.006 mm is under half an X step, so each small move rounds away
        assert_eq!(controller.position_steps(Axis::X), -5);
        assert!(controller.position_steps(Axis::X).abs() <= 11);
        assert_eq!(controller.history(Axis::X).len(), 12);
    }

    #[test]
    fn test_huge_finite_targets_are_rejected() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().x(5.0), mm()).unwrap();
        controller.sink_mut().drain();
        let before = *controller.totals();

        for target in [AxisTarget::new().x(-1e300), AxisTarget::new().e(1e300)] {
            assert!(matches!(
                controller.linear_move(target, mm()),
                Err(ControllerError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            controller.circular_move(1.0, "+X", Some(1e300), mm(), ArcDirection::Clockwise),
            Err(ControllerError::InvalidArgument(_))
        ));

        assert_eq!(controller.history(Axis::X), &[0, 400]);
        assert_eq!(controller.position_steps(Axis::E), 0);
        assert_eq!(controller.max_extrusion_step(), 0);
        assert_eq!(*controller.totals(), before);
        assert!(controller.sink().lines().is_empty());
    }

    #[test]
    fn test_absolute_move_to_current_position() {
        let mut controller = create_controller();
        controller.set_absolute().unwrap();
        controller.linear_move(AxisTarget::new().x(5.0), mm()).unwrap();
        let before = *controller.totals();

        controller.linear_move(AxisTarget::new().x(5.0), mm()).unwrap();
        assert_eq!(controller.sink().last(), Some("G1"));
        assert_eq!(*controller.totals(), before);
        assert_eq!(controller.position_steps(Axis::X), 400);
        assert_eq!(controller.history(Axis::X), &[0, 400, 400]);
    }

    #[test]
    fn test_fields_written_in_axis_order() {
        let mut controller = create_controller();
        controller
            .linear_move(AxisTarget::new().e(1.0).z(1.0).x(2.0), mm())
            .unwrap();
        assert_eq!(controller.sink().last(), Some("G1 X2.0000 Z1.0000 E1.0000"));

        let comments: Vec<_> = controller.sink().lines()[..3].to_vec();
        assert!(comments[0].starts_with(";Extr. rate: "));
        assert!(comments[1].starts_with(";Extr. volume: "));
        assert!(comments[2].starts_with(";Filament width (elliptical assumption): "));
    }

    #[test]
    fn test_sub_step_move_is_dropped_from_line() {
        let mut controller = create_controller();
        // 0.001 mm is below half a step on X (0.0125 mm)
        controller.linear_move(AxisTarget::new().x(0.001).y(1.0), mm()).unwrap();
        assert_eq!(controller.sink().last(), Some("G1 Y1.0000"));
        assert_eq!(controller.position_steps(Axis::X), 0);
    }

    #[test]
    fn test_extruded_volume_is_monotonic() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().e(1.0), mm()).unwrap();
        let after_push = controller.totals().extrusion_volume_ul;
        assert!((after_push - BD_1ML_AREA).abs() < 1e-6);

        controller.linear_move(AxisTarget::new().e(-0.5), mm()).unwrap();
        assert_eq!(controller.totals().extrusion_volume_ul, after_push);
        assert_eq!(controller.max_extrusion_step(), 3540);

        controller.linear_move(AxisTarget::new().e(0.25), mm()).unwrap();
        assert_eq!(controller.totals().extrusion_volume_ul, after_push);

        controller.linear_move(AxisTarget::new().e(0.5), mm()).unwrap();
        assert!((controller.totals().extrusion_volume_ul - 1.25 * BD_1ML_AREA).abs() < 1e-6);
        assert_eq!(controller.max_extrusion_step(), controller.position_steps(Axis::E));
        assert!((controller.totals().extrusion_distance_mm - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_extrusion_high_water_mark() {
        let mut controller = create_controller();
        controller.set_absolute().unwrap();
        controller.linear_move(AxisTarget::new().e(2.0), mm()).unwrap();
        let after_push = controller.totals().extrusion_volume_ul;
        assert!((after_push - 2.0 * BD_1ML_AREA).abs() < 1e-6);
        assert_eq!(controller.max_extrusion_step(), 7080);

        controller.linear_move(AxisTarget::new().e(1.0), mm()).unwrap();
        controller.linear_move(AxisTarget::new().e(1.5), mm()).unwrap();
        assert_eq!(controller.totals().extrusion_volume_ul, after_push);
        assert_eq!(controller.position_steps(Axis::E), 5310);
        assert_eq!(controller.max_extrusion_step(), 7080);

        controller.linear_move(AxisTarget::new().e(2.5), mm()).unwrap();
        assert!((controller.totals().extrusion_volume_ul - 2.5 * BD_1ML_AREA).abs() < 1e-6);
        assert_eq!(controller.max_extrusion_step(), 8850);
        assert!((controller.totals().extrusion_distance_mm - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_finite_targets() {
        let mut controller = create_controller();
        let result = controller.linear_move(AxisTarget::new().x(f64::INFINITY), mm());
        assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));
        assert_eq!(controller.history(Axis::X), &[0]);
        assert!(controller.sink().lines().is_empty());
    }

    #[test]
    fn test_circle_counts_circumference() {
        let mut controller = create_controller();
        controller
            .circular_move(6.0, "+X", None, mm(), ArcDirection::Clockwise)
            .unwrap();

        assert!((controller.totals().travel_distance_mm - 37.699).abs() < 1e-3);
        assert_eq!(controller.totals().extrusion_volume_ul, 0.0);
        assert!((controller.totals().print_time_s - 60.0 * 37.699_111_8 / 100.0).abs() < 1e-6);
        assert_eq!(controller.position_steps(Axis::X), 0);
        assert_eq!(
            controller.sink().lines(),
            &[";Circular path -> Dir: +X | D: 12.0000 mm | C: 37.6991 mm", "G2 I6.0000"]
        );
    }

    #[test]
    fn test_circle_with_extrusion() {
        let mut controller = create_controller();
        controller
            .circular_move(2.0, "-Y", Some(BD_1ML_AREA), ExtrusionUnit::Microliters, ArcDirection::CounterClockwise)
            .unwrap();

        assert_eq!(controller.position_steps(Axis::E), 3540);
        assert!((controller.totals().extrusion_volume_ul - BD_1ML_AREA).abs() < 1e-6);
        let lines = controller.sink().lines();
        assert!(lines[1].starts_with(";Extrusion rate: "));
        assert_eq!(lines[2], "G3 E1.0000 J-2.0000");
    }

    #[test]
    fn test_circle_restores_absolute_mode() {
        let mut controller = create_controller();
        controller.set_absolute().unwrap();
        controller.sink_mut().drain();

        controller
            .circular_move(6.0, "+X", None, mm(), ArcDirection::Clockwise)
            .unwrap();
        let lines = controller.sink().lines();
        assert_eq!(lines.first().map(String::as_str), Some("G91"));
        assert_eq!(lines.last().map(String::as_str), Some("G90"));
        assert!(!controller.is_relative());
    }

    #[test]
    fn test_circle_rejects_bad_axis_without_side_effects() {
        let mut controller = create_controller();
        controller.set_absolute().unwrap();
        controller.sink_mut().drain();

        for axis in ["X", "+", "+Z"] {
            let result = controller.circular_move(6.0, axis, None, mm(), ArcDirection::Clockwise);
            assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));
        }
        let result = controller.circular_move(-1.0, "+X", None, mm(), ArcDirection::Clockwise);
        assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));

        assert!(controller.sink().lines().is_empty());
        assert!(!controller.is_relative());
        assert_eq!(controller.totals().travel_distance_mm, 0.0);
        assert_eq!(controller.history(Axis::X), &[0]);
    }

    #[test]
    fn test_set_axis_steps_per_mm() {
        let mut controller = create_controller();
        controller
            .set_axis_steps_per_mm(AxisTarget::new().e(1000.0), Some("recalibrated"))
            .unwrap();
        assert_eq!(controller.sink().last(), Some("M92 E1000.0000 ;recalibrated"));
        assert_eq!(controller.steps_per_mm(Axis::E), 1000.0);

        controller.linear_move(AxisTarget::new().e(1.0), mm()).unwrap();
        assert_eq!(controller.position_steps(Axis::E), 1000);

        let result = controller.set_axis_steps_per_mm(AxisTarget::new().x(0.0), None);
        assert!(matches!(result, Err(ControllerError::InvalidArgument(_))));
        assert_eq!(controller.steps_per_mm(Axis::X), 80.0);
    }

    #[test]
    fn test_summary_report() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().x(10.0), mm()).unwrap();
        controller.sink_mut().drain();

        let summary = controller.summary();
        assert!((summary.position_mm[Axis::X] - 10.0).abs() < 1e-9);
        assert!((summary.print_time_s - 6.0).abs() < 1e-9);

        controller.summary_report().unwrap();
        assert_eq!(
            controller.sink().lines(),
            &[
                "",
                ";Current location (mm): X10.0000 Y0.0000 Z0.0000 E0.0000",
                ";Total travel distance: 10.0000 mm",
                ";Total extrusion distance: 0.0000 mm",
                ";Total extruded volume: 0.0000 uL",
                ";Total print time: 6.0000 s",
            ]
        );
        // Reporting is read-only
        assert_eq!(controller.summary(), summary);
    }

    #[test]
    fn test_print_time_in_minutes() {
        let mut controller = create_controller();
        controller.linear_move(AxisTarget::new().y(200.0), mm()).unwrap();
        controller.report_print_time().unwrap();
        assert_eq!(controller.sink().last(), Some(";Total print time: 2 min 0.0000 s"));
    }

    #[test]
    fn test_raw_and_comment_lines() {
        let mut controller = create_controller();
        controller.write_raw("M84").unwrap();
        controller.write_comment("layer 1").unwrap();
        controller.blank_line().unwrap();
        controller.set_cold_extrusion_allowed(false).unwrap();
        assert_eq!(controller.sink().lines(), &["M84", ";layer 1", "", "M302 P0"]);
        assert_eq!(controller.cold_extrusion_allowed(), Some(false));
    }
}
