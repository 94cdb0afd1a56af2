use std::error::Error;
use std::time::Duration;

use tank_drive_pipeline::assembly::{heading_hold, HeadingTargets};
use tank_drive_pipeline::config::{load_config, PipelineConfig};
use tank_drive_pipeline::control::normalize_angle;
use tank_drive_pipeline::ipc::ConfigBuffer;
use tank_drive_pipeline::sim::{SimConfig, SimulatedDrivetrain};
use tank_drive_pipeline::DriveLoop;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "config/pipeline.toml";
const PHASE: Duration = Duration::from_secs(3);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tank_drive_pipeline=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = load_config(&path)?;
    config.validate()?;

    println!("===========================================");
    println!("Heading-hold pipeline on simulated drivetrain");
    println!("===========================================\n");

    let sim = SimulatedDrivetrain::new(
        SimConfig {
            max_speed: config.drive.max_velocity,
            track_width: config.drive.track_width,
            dt: config.period().as_secs_f64(),
            noise: 0.002,
            ..SimConfig::default()
        },
        &config.actuator,
    );
    let targets = HeadingTargets::new(config.heading_setpoint, 0.0);

    let factory = {
        let sim = sim.clone();
        let targets = targets.clone();
        move |cfg: &PipelineConfig| heading_hold(cfg, targets.clone(), sim.clone(), sim.clone())
    };
    let drive = DriveLoop::new("heading-hold", ConfigBuffer::new(config.clone()), factory);
    drive.start()?;

    std::thread::sleep(PHASE);
    println!(
        "[PHASE 1] setpoint {:.3} rad, heading {:.3} rad",
        config.heading_setpoint,
        sim.heading()
    );

    // Retune and rebuild, then swing to the opposite side of the wrap
    drive.config().update(|cfg| cfg.heading.p *= 1.5);
    targets.setpoint.set(-3.0);
    sim.set_heading(3.0);
    drive.reset()?;

    std::thread::sleep(PHASE);
    println!(
        "[PHASE 2] setpoint -3.000 rad, heading {:.3} rad (wrapped {:.3})",
        sim.heading(),
        normalize_angle(sim.heading())
    );

    drive.stop()?;
    if let Some(e) = drive.take_fatal_error() {
        println!("Pipeline stopped on fatal error: {}", e);
    }

    let executor = drive.executor();
    let stats = executor.stats();
    let report = executor.metrics().report();

    println!("\n===========================================");
    println!("RESULTS");
    println!("===========================================");
    println!("Assemblies: {}", stats.assemblies);
    println!("Total Ticks: {}", stats.total_ticks);
    println!(
        "Period Compliance: {:.2}% ({} overruns, {} boundaries skipped)",
        stats.compliance(),
        stats.overruns,
        stats.skipped_boundaries
    );
    println!(
        "Tick Errors: {} ({} panics, {} fail-safes)",
        stats.tick_errors, stats.panics, stats.fail_safes
    );
    println!("\n=== Timing ===");
    println!("Tick P50: {:?}, P99: {:?}, Max: {:?}", report.tick_p50, report.tick_p99, report.tick_max);
    println!("Jitter P50: {:?}, P99: {:?}", report.jitter_p50, report.jitter_p99);

    let diagnostics = executor.diagnostics().read_all();
    if !diagnostics.is_empty() {
        println!("\n=== Diagnostics ({}) ===", diagnostics.len());
        for line in diagnostics.iter().rev().take(10) {
            println!("{}", line);
        }
    }
    Ok(())
}
