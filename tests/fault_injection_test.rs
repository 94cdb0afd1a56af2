use std::thread;
use std::time::{Duration, Instant};

use tank_drive_pipeline::assembly::{heading_hold, HeadingTargets};
use tank_drive_pipeline::config::PipelineConfig;
use tank_drive_pipeline::control::PidGains;
use tank_drive_pipeline::ipc::ConfigBuffer;
use tank_drive_pipeline::sim::{SimConfig, SimulatedDrivetrain};
use tank_drive_pipeline::{ActuatorError, DriveLoop, ExecutorState, Side, TickError};

fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        period_ms: 2,
        heading: PidGains::new(2.0, 0.0, 0.0).with_output_limit(1.0),
        ..PipelineConfig::default()
    }
}

#[test]
fn motor_fault_is_contained_and_loop_recovers() {
    let config = config();
    let sim = SimulatedDrivetrain::new(SimConfig::default(), &config.actuator);
    let right = config.actuator.right_device;
    let factory = {
        let sim = sim.clone();
        move |cfg: &PipelineConfig| {
            heading_hold(cfg, HeadingTargets::new(0.4, 0.0), sim.clone(), sim.clone())
        }
    };
    let drive = DriveLoop::new("motor-fault", ConfigBuffer::new(config), factory);
    drive.start().unwrap();

    sim.fail_device(Some(right));
    assert!(wait_for(Duration::from_secs(2), || {
        drive.executor().stats().tick_errors >= 5
    }));
    assert_eq!(drive.state(), ExecutorState::Running);

    let expected = TickError::Actuator {
        side: Side::Right,
        source: ActuatorError::Timeout(right),
    };
    let last = drive.executor().diagnostics().read_all();
    assert!(last.iter().any(|line| line.contains(&expected.to_string())));

    // Right side never lands, so the simulation stops stepping
    let frozen = sim.steps();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(sim.steps(), frozen);

    sim.fail_device(None);
    assert!(wait_for(Duration::from_secs(5), || (sim.heading() - 0.4).abs() < 1e-3));
    drive.stop().unwrap();
    assert!(drive.take_fatal_error().is_none());
}

#[test]
fn gyro_outage_triggers_fail_safe_every_tick() {
    let config = config();
    let sim = SimulatedDrivetrain::new(SimConfig::default(), &config.actuator);
    let factory = {
        let sim = sim.clone();
        move |cfg: &PipelineConfig| {
            heading_hold(cfg, HeadingTargets::new(1.0, 0.3), sim.clone(), sim.clone())
        }
    };
    let drive = DriveLoop::new("gyro-outage", ConfigBuffer::new(config), factory);
    drive.start().unwrap();
    assert!(wait_for(Duration::from_secs(2), || sim.steps() >= 3));

    sim.set_sensor_offline(true);
    assert!(wait_for(Duration::from_secs(2), || {
        drive.executor().stats().fail_safes >= 3
    }));
    assert_eq!(sim.wheel_speeds(), (0.0, 0.0));
    drive.stop().unwrap();

    let stats = drive.executor().stats();
    assert_eq!(stats.fail_safes, stats.tick_errors);
    assert_eq!(stats.panics, 0);
}
