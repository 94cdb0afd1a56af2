//! Integration tests for pipeline composition and the drive stages

use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use proptest::prelude::*;
use tank_drive_pipeline::actuator::{
    ActuatorConfig, ActuatorDriver, ActuatorSink, ControlMode, DeviceHandle,
};
use tank_drive_pipeline::config::DriveConfig;
use tank_drive_pipeline::control::{normalize_angle, HeadingPidStage, PidGains, TurnRatePidStage};
use tank_drive_pipeline::pipeline::{
    sink_fn, source_fn, stage_fn, try_stage_fn, Sink, Source, Stage, Task,
};
use tank_drive_pipeline::sensor::{
    sensor_fn, ArcadeAxes, ArcadeJoystickSource, JoystickShaping, TankAxes, TankJoystickSource,
};
use tank_drive_pipeline::shaping::{FeedForwardStage, ResolveAbsentStage, UnitScalerStage};
use tank_drive_pipeline::sim::VirtualJoystick;
use tank_drive_pipeline::{
    ActuatorError, BuildError, DriveData, SensorError, Side, TankDriveData, TickError,
};

const DT: Duration = Duration::from_millis(20);

fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Sink<T>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let out = seen.clone();
    (seen, sink_fn(move |v: T| out.lock().push(v)))
}

fn empty_with_heading(setpoint: f64) -> TankDriveData {
    TankDriveData::new(DriveData::EMPTY, DriveData::EMPTY).with_heading(setpoint)
}

/// Records every write; writes to `failing` devices time out.
#[derive(Default)]
struct RecordingDriver {
    writes: Mutex<Vec<(DeviceHandle, ControlMode, f64)>>,
    ramps: Mutex<Vec<(DeviceHandle, f64)>>,
    failing: Mutex<Vec<DeviceHandle>>,
}

impl RecordingDriver {
    fn fail(&self, device: DeviceHandle) {
        self.failing.lock().push(device);
    }

    fn writes(&self) -> Vec<(DeviceHandle, ControlMode, f64)> {
        self.writes.lock().clone()
    }

    fn ramps(&self) -> Vec<(DeviceHandle, f64)> {
        self.ramps.lock().clone()
    }
}

impl ActuatorDriver for RecordingDriver {
    fn set(&self, device: DeviceHandle, mode: ControlMode, value: f64) -> Result<(), ActuatorError> {
        if self.failing.lock().contains(&device) {
            return Err(ActuatorError::Timeout(device));
        }
        self.writes.lock().push((device, mode, value));
        Ok(())
    }

    fn configure_ramp(&self, device: DeviceHandle, seconds: f64) -> Result<(), ActuatorError> {
        if self.failing.lock().contains(&device) {
            return Err(ActuatorError::Timeout(device));
        }
        self.ramps.lock().push((device, seconds));
        Ok(())
    }
}

// ============================================================================
// COMPOSITION TESTS
// ============================================================================

#[test]
fn test_source_stage_sink_runs_in_order() {
    let (seen, sink) = collector::<f64>();
    let mut counter = 0.0;
    let mut task = source_fn(move || {
        counter += 1.0;
        counter
    })
    .then(stage_fn(|v: f64| v * 10.0))
    .then(stage_fn(|v: f64| v + 1.0))
    .into_sink(sink);

    for _ in 0..3 {
        task.tick().unwrap();
    }
    assert_eq!(*seen.lock(), vec![11.0, 21.0, 31.0]);
}

#[test]
fn test_composition_is_associative() {
    // Stateful stages so that ordering mistakes would show
    fn running_sum() -> impl Stage<f64, Output = f64> {
        let mut total = 0.0;
        stage_fn(move |v: f64| {
            total += v;
            total
        })
    }
    fn doubled() -> impl Stage<f64, Output = f64> {
        stage_fn(|v: f64| v * 2.0)
    }
    fn ramp() -> impl Source<Output = f64> {
        let mut n = 0.0;
        source_fn(move || {
            n += 0.5;
            n
        })
    }

    let (left, left_sink) = collector::<f64>();
    let (right, right_sink) = collector::<f64>();
    let mut grouped_left = ramp().then(running_sum()).then(doubled()).into_sink(left_sink);
    let mut grouped_right = ramp()
        .then(running_sum().and_then(doubled()))
        .into_sink(right_sink);

    for _ in 0..10 {
        grouped_left.tick().unwrap();
        grouped_right.tick().unwrap();
    }
    assert_eq!(*left.lock(), *right.lock());
}

#[test]
fn test_stage_feeding_a_sink_is_a_sink() {
    let (seen, sink) = collector::<f64>();
    let mut task = source_fn(|| 4.0).into_sink(stage_fn(|v: f64| v / 2.0).feed(sink));
    task.tick().unwrap();
    assert_eq!(*seen.lock(), vec![2.0]);
}

#[test]
fn test_failing_stage_skips_the_sink() {
    let (seen, sink) = collector::<f64>();
    let mut task = source_fn(|| 1.0)
        .then(try_stage_fn(|_: f64| -> Result<f64, TickError> {
            Err(TickError::Stage {
                stage: "limiter",
                reason: "out of range".to_string(),
            })
        }))
        .into_sink(sink);

    let err = task.tick().unwrap_err();
    assert!(matches!(err, TickError::Stage { stage: "limiter", .. }));
    assert!(seen.lock().is_empty());
}

#[test]
fn test_boxed_primitives_compose() {
    let source: Box<dyn Source<Output = f64>> = Box::new(source_fn(|| 3.0));
    let stage: Box<dyn Stage<f64, Output = f64>> = Box::new(stage_fn(|v: f64| -v));
    let (seen, sink) = collector::<f64>();
    let mut task: Box<dyn Task> = Box::new(source.then(stage).into_sink(sink));
    task.tick().unwrap();
    assert_eq!(*seen.lock(), vec![-3.0]);
}

// ============================================================================
// HEADING STAGE TESTS
// ============================================================================

#[test]
fn test_heading_end_to_end_proportional() {
    let (seen, sink) = collector::<TankDriveData>();
    let mut task = source_fn(|| empty_with_heading(0.5))
        .then(HeadingPidStage::new(
            PidGains::new(2.0, 0.0, 0.0),
            DT,
            sensor_fn(|| Ok(0.3)),
            false,
        )
        .unwrap())
        .then(FeedForwardStage::new(1.0, 0.0, 0.0))
        .then(UnitScalerStage::new(1.0, 0.0).unwrap())
        .then(ResolveAbsentStage::zero())
        .into_sink(sink);

    task.tick().unwrap();
    let out = seen.lock()[0];
    assert!((out.left.value.unwrap() + 0.4).abs() < 1e-9);
    assert!((out.right.value.unwrap() - 0.4).abs() < 1e-9);
    assert_eq!(out.heading_setpoint, Some(0.5));
}

#[test]
fn test_heading_error_takes_short_arc_across_wrap() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(3.0)),
        false,
    )
    .unwrap();
    let out = stage.apply(empty_with_heading(-3.0)).unwrap();

    let expected = TAU - 6.0;
    assert!((stage.error() - expected).abs() < 1e-9, "error {}", stage.error());
    assert!((stage.error() - 0.283).abs() < 1e-3);
    // Positive error turns toward increasing heading
    assert!(out.right.value.unwrap() > 0.0);
    assert!(out.left.value.unwrap() < 0.0);
}

#[test]
fn test_heading_invert_sides_reverses_correction() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(2.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.3)),
        true,
    )
    .unwrap();
    let out = stage
        .apply(TankDriveData::from_values(0.5, 0.5).with_heading(0.5))
        .unwrap();
    assert!((out.left.value.unwrap() - 0.9).abs() < 1e-9);
    assert!((out.right.value.unwrap() - 0.1).abs() < 1e-9);
}

#[test]
fn test_heading_absent_setpoint_passes_through_and_resets() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(0.0, 1.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.0)),
        false,
    )
    .unwrap();
    let telemetry = stage.telemetry();

    for _ in 0..5 {
        stage.apply(empty_with_heading(1.0)).unwrap();
    }
    assert!(stage.integral() > 0.0);
    assert!(telemetry.is_active());
    assert!((telemetry.integral() - stage.integral()).abs() < 1e-12);

    let input = TankDriveData::from_values(0.25, -0.25).with_turn_rate(1.5);
    let out = stage.apply(input).unwrap();
    assert_eq!(out, input);
    assert_eq!(stage.integral(), 0.0);
    assert!(!telemetry.is_active());
    assert_eq!(telemetry.integral(), 0.0);
}

#[test]
fn test_heading_leaves_turn_rate_setpoint_alone() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.0)),
        false,
    )
    .unwrap();
    let out = stage.apply(empty_with_heading(0.1).with_turn_rate(0.7)).unwrap();
    assert_eq!(out.turn_rate_setpoint, Some(0.7));
}

#[test]
fn test_heading_sensor_failure_fails_the_tick() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Err(SensorError::NotResponding("gyro"))),
        false,
    )
    .unwrap();
    let err = stage.apply(empty_with_heading(0.0)).unwrap_err();
    assert_eq!(err, TickError::Sensor(SensorError::NotResponding("gyro")));

    let mut nan = HeadingPidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(f64::NAN)),
        false,
    )
    .unwrap();
    assert!(matches!(
        nan.apply(empty_with_heading(0.0)),
        Err(TickError::Sensor(SensorError::NonFinite { name: "heading", .. }))
    ));
}

#[test]
fn test_heading_non_finite_setpoint_fails_without_poisoning() {
    let mut stage = HeadingPidStage::new(
        PidGains::new(2.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.3)),
        false,
    )
    .unwrap();

    for bad in [f64::NAN, f64::INFINITY] {
        assert!(matches!(
            stage.apply(empty_with_heading(bad)),
            Err(TickError::Stage { stage: "heading", .. })
        ));
    }
    assert_eq!(stage.integral(), 0.0);

    for _ in 0..5 {
        let out = stage.apply(empty_with_heading(0.5)).unwrap();
        assert!((out.left.value.unwrap() + 0.4).abs() < 1e-9);
    }
}

#[test]
fn test_invalid_gains_rejected_at_build() {
    let bad = [
        PidGains::new(1.0, 0.0, 0.0).with_integral_limit(f64::NAN),
        PidGains::new(1.0, 0.0, 0.0).with_output_limit(f64::NAN),
        PidGains::new(f64::NAN, 0.0, 0.0),
        PidGains::new(1.0, 0.0, 0.0).with_output_limit(0.0),
    ];
    for gains in bad {
        assert!(matches!(
            HeadingPidStage::new(gains, DT, sensor_fn(|| Ok(0.0)), false),
            Err(BuildError::InvalidConfig { .. })
        ));
        assert!(matches!(
            TurnRatePidStage::new(gains, DT, sensor_fn(|| Ok(0.0)), false),
            Err(BuildError::InvalidConfig { .. })
        ));
    }
}

#[test]
fn test_anti_windup_holds_integral_within_clamp() {
    let gains = PidGains::new(10.0, 1.0, 0.0)
        .with_integral_limit(0.05)
        .with_output_limit(1.0);
    let mut stage = HeadingPidStage::new(gains, DT, sensor_fn(|| Ok(0.0)), false).unwrap();

    for _ in 0..500 {
        let out = stage.apply(empty_with_heading(1.0)).unwrap();
        assert!(stage.integral().abs() <= 0.05 + 1e-12);
        assert!(out.right.value.unwrap() <= 1.0 + 1e-12);
    }
}

#[test]
fn test_integral_clamp_without_output_saturation() {
    let gains = PidGains::new(0.0, 1.0, 0.0).with_integral_limit(0.1);
    let mut stage = HeadingPidStage::new(gains, DT, sensor_fn(|| Ok(0.0)), false).unwrap();
    for _ in 0..100 {
        stage.apply(empty_with_heading(1.0)).unwrap();
    }
    assert!((stage.integral() - 0.1).abs() < 1e-12);
}

// ============================================================================
// TURN RATE STAGE TESTS
// ============================================================================

#[test]
fn test_turn_rate_correction() {
    let mut stage = TurnRatePidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.5)),
        false,
    )
    .unwrap();
    let out = stage
        .apply(TankDriveData::from_values(1.0, 1.0).with_turn_rate(1.0))
        .unwrap();
    assert!((out.left.value.unwrap() - 0.5).abs() < 1e-9);
    assert!((out.right.value.unwrap() - 1.5).abs() < 1e-9);
    assert!((stage.error() - 0.5).abs() < 1e-12);
}

#[test]
fn test_turn_rate_does_not_wrap() {
    let mut stage = TurnRatePidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(-4.0)),
        false,
    )
    .unwrap();
    stage
        .apply(TankDriveData::from_values(0.0, 0.0).with_turn_rate(4.0))
        .unwrap();
    assert!((stage.error() - 8.0).abs() < 1e-12);
}

#[test]
fn test_turn_rate_non_finite_setpoint_fails_without_poisoning() {
    let mut stage = TurnRatePidStage::new(
        PidGains::new(1.0, 1.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.5)),
        false,
    )
    .unwrap();

    let err = stage
        .apply(TankDriveData::from_values(1.0, 1.0).with_turn_rate(f64::NAN))
        .unwrap_err();
    assert!(matches!(err, TickError::Stage { stage: "turn rate", .. }));
    assert_eq!(stage.integral(), 0.0);

    let out = stage
        .apply(TankDriveData::from_values(1.0, 1.0).with_turn_rate(1.0))
        .unwrap();
    assert!(out.left.value.unwrap().is_finite());
    assert!((stage.integral() - 0.5 * DT.as_secs_f64()).abs() < 1e-12);
}

#[test]
fn test_turn_rate_absent_setpoint_resets() {
    let mut stage = TurnRatePidStage::new(
        PidGains::new(0.0, 1.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.0)),
        false,
    )
    .unwrap();
    let engaged = TankDriveData::from_values(0.0, 0.0).with_turn_rate(2.0);
    for _ in 0..3 {
        stage.apply(engaged).unwrap();
    }
    assert!(stage.integral() > 0.0);

    let idle = TankDriveData::from_values(0.3, 0.3).with_heading(1.0);
    assert_eq!(stage.apply(idle).unwrap(), idle);
    assert_eq!(stage.integral(), 0.0);
}

// ============================================================================
// SHAPING TESTS
// ============================================================================

#[test]
fn test_feed_forward_formula() {
    let ff = FeedForwardStage::new(2.0, 0.5, 0.1);
    assert_eq!(ff.compute(0.0, 0.0), 0.0);
    assert!((ff.compute(-1.0, 0.0) + 2.1).abs() < 1e-12);
    assert!((ff.compute(1.0, 2.0) - 3.1).abs() < 1e-12);
}

#[test]
fn test_feed_forward_resolves_absent_values() {
    let mut ff = FeedForwardStage::new(2.0, 0.5, 0.1);
    let out = Stage::<DriveData>::apply(&mut ff, DriveData::EMPTY).unwrap();
    assert_eq!(out.value, Some(0.0));

    let out = Stage::<DriveData>::apply(
        &mut ff,
        DriveData {
            value: None,
            acceleration: Some(2.0),
        },
    )
    .unwrap();
    assert_eq!(out.value, Some(1.0));
}

#[test]
fn test_unit_scaler_propagates_absent() {
    let mut scaler = UnitScalerStage::new(100.0, 0.05).unwrap();
    let out = Stage::<TankDriveData>::apply(
        &mut scaler,
        TankDriveData::new(DriveData::new(0.5), DriveData::EMPTY).with_heading(1.0),
    )
    .unwrap();
    assert_eq!(out.left.value, Some(50.0));
    assert_eq!(out.right.value, None);
    assert_eq!(out.heading_setpoint, Some(1.0));
}

#[test]
fn test_unit_scaler_round_trip_loses_values_inside_deadband() {
    let scaler = UnitScalerStage::new(4096.0, 0.05).unwrap();
    for v in [0.01, -0.01, 0.049, -0.049] {
        let back = scaler.inverse(scaler.scale(v));
        assert_eq!(back, 0.0);
        assert_ne!(back, v);
    }
    // Outside the deadband the round trip holds
    assert!((scaler.inverse(scaler.scale(0.5)) - 0.5).abs() < 1e-12);
}

#[test]
fn test_unit_scaler_rejects_bad_parameters() {
    assert!(UnitScalerStage::new(0.0, 0.0).is_err());
    assert!(UnitScalerStage::new(-2.0, 0.0).is_err());
    assert!(UnitScalerStage::new(1.0, -0.1).is_err());
    assert!(UnitScalerStage::new(f64::NAN, 0.0).is_err());
}

#[test]
fn test_resolve_fills_only_absent_sides() {
    let mut resolve = ResolveAbsentStage::zero();
    let out = Stage::<TankDriveData>::apply(
        &mut resolve,
        TankDriveData::new(DriveData::new(0.7), DriveData::EMPTY),
    )
    .unwrap();
    assert_eq!(out.left.value, Some(0.7));
    assert_eq!(out.right.value, Some(0.0));
}

proptest! {
    #[test]
    fn prop_normalize_stays_in_half_open_range(angle in -1.0e6f64..1.0e6) {
        let n = normalize_angle(angle);
        prop_assert!(n > -PI && n <= PI, "normalize({}) = {}", angle, n);
    }

    #[test]
    fn prop_normalize_self_difference_is_zero(heading in -1.0e6f64..1.0e6) {
        prop_assert_eq!(normalize_angle(heading - heading), 0.0);
    }

    #[test]
    fn prop_normalize_is_congruent(angle in -100.0f64..100.0) {
        let n = normalize_angle(angle);
        let turns = (angle - n) / TAU;
        prop_assert!((turns - turns.round()).abs() < 1e-9);
    }

    #[test]
    fn prop_unit_scaler_deadband(
        value in -10.0f64..10.0,
        tpu in 0.1f64..1000.0,
        deadband in 0.0f64..1.0,
    ) {
        let scaler = UnitScalerStage::new(tpu, deadband).unwrap();
        let scaled = scaler.scale(value);
        if value.abs() < deadband {
            prop_assert_eq!(scaled, 0.0);
        } else {
            prop_assert_eq!(scaled, value * tpu);
            prop_assert!((scaler.inverse(scaled) - value).abs() <= 1e-9 * value.abs().max(1.0));
        }
    }
}

// ============================================================================
// ACTUATOR SINK TESTS
// ============================================================================

#[test]
fn test_sink_writes_both_sides() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig::default();
    let mut sink = ActuatorSink::new(driver.clone(), &config);

    sink.consume(TankDriveData::from_values(0.2, -0.3)).unwrap();
    assert_eq!(
        driver.writes(),
        vec![
            (config.left_device, ControlMode::PercentOutput, 0.2),
            (config.right_device, ControlMode::PercentOutput, -0.3),
        ]
    );
}

#[test]
fn test_sink_configures_ramp_on_both_devices_at_build() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig {
        ramp: 0.25,
        ..ActuatorConfig::default()
    };
    let _sink = ActuatorSink::new(driver.clone(), &config);
    assert_eq!(
        driver.ramps(),
        vec![(config.left_device, 0.25), (config.right_device, 0.25)]
    );
    assert!(driver.writes().is_empty());

    // A ramp failure is logged, not fatal to the build
    let failing = Arc::new(RecordingDriver::default());
    failing.fail(config.left_device);
    let mut sink = ActuatorSink::new(failing.clone(), &config);
    assert_eq!(failing.ramps(), vec![(config.right_device, 0.25)]);
    assert!(sink.consume(TankDriveData::from_values(0.1, 0.1)).is_err());
}

#[test]
fn test_sink_drives_absent_side_to_zero_and_reports() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig::default();
    let mut sink = ActuatorSink::new(driver.clone(), &config);

    let err = sink
        .consume(TankDriveData::new(DriveData::EMPTY, DriveData::new(0.5)))
        .unwrap_err();
    assert_eq!(err, TickError::UnresolvedCommand(Side::Left));
    assert_eq!(driver.writes()[0], (config.left_device, ControlMode::PercentOutput, 0.0));
    assert_eq!(driver.writes()[1].2, 0.5);
}

#[test]
fn test_sink_keeps_writing_other_side_on_failure() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig::default();
    driver.fail(config.right_device);
    let mut sink = ActuatorSink::new(driver.clone(), &config);

    let err = sink.consume(TankDriveData::from_values(0.4, 0.4)).unwrap_err();
    assert_eq!(
        err,
        TickError::Actuator {
            side: Side::Right,
            source: ActuatorError::Timeout(config.right_device),
        }
    );
    assert_eq!(driver.writes(), vec![(config.left_device, ControlMode::PercentOutput, 0.4)]);

    driver.fail(config.left_device);
    let err = sink.consume(TankDriveData::from_values(0.4, 0.4)).unwrap_err();
    assert!(matches!(err, TickError::BothActuators { .. }));
}

#[test]
fn test_sink_fail_safe_writes_zero() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig {
        mode: ControlMode::Velocity,
        ..ActuatorConfig::default()
    };
    let mut sink = ActuatorSink::new(driver.clone(), &config);

    sink.fail_safe().unwrap();
    assert_eq!(
        driver.writes(),
        vec![
            (config.left_device, ControlMode::Velocity, 0.0),
            (config.right_device, ControlMode::Velocity, 0.0),
        ]
    );
}

#[test]
fn test_resolved_pipeline_never_reaches_sink_unresolved() {
    let driver = Arc::new(RecordingDriver::default());
    let config = ActuatorConfig::default();
    let mut engaged = true;
    let mut task = source_fn(move || {
        engaged = !engaged;
        if engaged {
            empty_with_heading(0.2)
        } else {
            TankDriveData::default()
        }
    })
    .then(HeadingPidStage::new(
        PidGains::new(1.0, 0.0, 0.0),
        DT,
        sensor_fn(|| Ok(0.0)),
        false,
    )
    .unwrap())
    .then(UnitScalerStage::new(1.0, 0.0).unwrap())
    .then(ResolveAbsentStage::zero())
    .into_sink(ActuatorSink::new(driver.clone(), &config));

    for _ in 0..6 {
        task.tick().unwrap();
    }
    assert_eq!(driver.writes().len(), 12);
}

// ============================================================================
// JOYSTICK SOURCE TESTS
// ============================================================================

#[test]
fn test_joystick_shaping_deadzone_and_rescale() {
    let shaping = JoystickShaping::new(0.1, 2.0, true).unwrap();
    assert_eq!(shaping.shape(0.05), 0.0);
    assert!((shaping.shape(1.0) - 2.0).abs() < 1e-12);
    assert!((shaping.shape(-0.55) + 1.0).abs() < 1e-12);
    assert_eq!(shaping.shape(f64::NAN), 0.0);
    assert!(JoystickShaping::new(1.0, 1.0, true).is_err());
}

#[test]
fn test_tank_source_adds_triggers_and_clamps() {
    let stick = VirtualJoystick::new();
    let axes = TankAxes::default();
    let mut source = TankJoystickSource::new(stick.clone(), axes, JoystickShaping::identity());

    stick.set_axis(axes.left, 0.5);
    stick.set_axis(axes.right, -0.25);
    let out = source.produce().unwrap();
    assert_eq!(out.left.value, Some(0.5));
    assert_eq!(out.right.value, Some(-0.25));
    assert_eq!(out.heading_setpoint, None);
    assert_eq!(out.turn_rate_setpoint, None);

    stick.set_axis(axes.forward_trigger.unwrap(), 0.75);
    let out = source.produce().unwrap();
    assert_eq!(out.left.value, Some(1.0));
    assert_eq!(out.right.value, Some(0.5));
}

#[test]
fn test_arcade_source_mixes_and_normalizes() {
    let stick = VirtualJoystick::new();
    let axes = ArcadeAxes::default();
    let drive = DriveConfig {
        max_velocity: 2.0,
        track_width: 0.5,
        ..DriveConfig::default()
    };
    let mut source =
        ArcadeJoystickSource::new(stick.clone(), axes, JoystickShaping::identity(), &drive)
            .unwrap();

    // Throttle axis is inverted: pushing forward reads negative
    stick.set_axis(axes.throttle, -1.0);
    let out = source.produce().unwrap();
    assert_eq!(out.left.value, Some(2.0));
    assert_eq!(out.right.value, Some(2.0));
    assert_eq!(out.turn_rate_setpoint, Some(0.0));

    stick.set_axis(axes.soft_turn, 0.5);
    let out = source.produce().unwrap();
    let left = out.left.value.unwrap();
    let right = out.right.value.unwrap();
    assert!((left - 2.0).abs() < 1e-12);
    assert!((right - 2.0 / 3.0).abs() < 1e-12);
    assert!((out.turn_rate_setpoint.unwrap() - (right - left) / 0.5).abs() < 1e-12);
}

#[test]
fn test_arcade_source_rejects_bad_geometry() {
    let drive = DriveConfig {
        track_width: 0.0,
        ..DriveConfig::default()
    };
    assert!(ArcadeJoystickSource::new(
        VirtualJoystick::new(),
        ArcadeAxes::default(),
        JoystickShaping::identity(),
        &drive,
    )
    .is_err());
}
