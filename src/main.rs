//! Headless command-line front end for the magsteer control engine.
//!
//! Runs a routine against the mock DAC and a synthetic vision feed, which is
//! enough to exercise every routine end to end on a machine without the coil
//! rig attached. Swapping in real hardware is a matter of providing real
//! `AnalogOutput` and `VisionFeed` implementations here.

use anyhow::Context;
use clap::Parser;
use log::info;
use magsteer::config::Settings;
use magsteer::engine::ControlEngine;
use magsteer::field::FieldDriver;
use magsteer::hardware::MockDac;
use magsteer::routine::{registry, Routine};
use magsteer::vision::{TrackedPosition, VisionFeed, VisionHub};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "magsteer", about = "Triaxial electromagnet control engine")]
struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    config: Option<String>,

    /// Routine to run (see --list).
    #[arg(long)]
    routine: Option<String>,

    /// List the routine catalog with parameter labels and exit.
    #[arg(long)]
    list: bool,

    /// How long to let the routine run before requesting a stop, seconds.
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Parameter values for slots 0.. in order; unset slots keep the
    /// routine's registry defaults.
    params: Vec<f64>,
}

/// Random-walk position source standing in for the camera stack.
struct SyntheticFeed {
    position: Mutex<TrackedPosition>,
}

impl SyntheticFeed {
    fn new() -> Self {
        Self {
            position: Mutex::new(TrackedPosition::new(320.0, 240.0)),
        }
    }
}

impl VisionFeed for SyntheticFeed {
    fn position(&self) -> Option<TrackedPosition> {
        let mut pos = self.position.lock().ok()?;
        let mut rng = rand::thread_rng();
        pos.x = (pos.x + rng.gen_range(-2.0..2.0)).clamp(0.0, 640.0);
        pos.y = (pos.y + rng.gen_range(-2.0..2.0)).clamp(0.0, 480.0);
        Some(*pos)
    }

    fn clear_overlays(&self) {}
    fn add_overlay(&self, _overlay: magsteer::vision::Overlay) {}
    fn start_recording(&self, name: &str) {
        info!("Recording requested: {}", name);
    }
    fn stop_recording(&self) {}
}

fn print_catalog() {
    for routine in Routine::ALL {
        let labels = registry::labels_for(routine.name());
        println!("{:28} {}", routine.name(), labels.join(" | "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        print_catalog();
        return Ok(());
    }
    let routine_name = cli
        .routine
        .as_deref()
        .context("no routine given; use --routine <name> or --list")?;

    let settings = Arc::new(Settings::new(cli.config.as_deref())?);
    let dac = Arc::new(MockDac::new());
    let field = FieldDriver::new(dac, settings.coils);
    let vision = VisionHub::new(vec![Arc::new(SyntheticFeed::new())]);

    let (handle, task) = ControlEngine::spawn(settings, field.clone(), vision, None);
    let mut events = handle.subscribe();

    let routine = handle.select_routine(routine_name).await?;

    // Registry defaults first, then CLI overrides in slot order.
    for (i, (_, _, default)) in registry::ranges_for(routine.name()).iter().enumerate() {
        handle.set_param(i, *default).await?;
    }
    for (i, value) in cli.params.iter().enumerate() {
        handle.set_param(i, *value).await?;
    }

    handle.start().await?;
    info!("Running '{}' for up to {} s", routine.name(), cli.duration);

    let finished = tokio::time::timeout(Duration::from_secs_f64(cli.duration), events.recv());
    match finished.await {
        Ok(_) => info!("Routine finished on its own"),
        Err(_) => {
            handle.stop().await?;
            let _ = events.recv().await;
            info!("Routine stopped after {} s", cli.duration);
        }
    }

    let snapshot = field.snapshot();
    info!(
        "Final cached field: x={:.3} y={:.3} z={:.3} mT",
        snapshot.x, snapshot.y, snapshot.z
    );

    handle.shutdown().await?;
    task.await?;
    Ok(())
}
