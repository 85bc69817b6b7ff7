//! Trackdeck - Rust implementation
//!
//! Drive a model-railway layout from a pad/encoder control surface through a
//! JMRI JSON server.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackdeck::cli::{self, Args};
use trackdeck::display::{FrameSink, LoggingFrameSink};
use trackdeck::element::Palette;
use trackdeck::entity::Roster;
use trackdeck::hardware::{self, SurfaceDriver};
use trackdeck::layout::SurfaceLayout;
use trackdeck::transport::{JmriClient, MessageCallback, Transport};
use trackdeck::{AppConfig, SurfaceActor, SurfaceOutputs};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting Trackdeck v{}...", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        hardware::print_ports(None, None)?;
        return Ok(());
    }

    info!("Configuration file: {}", args.config);
    let config = AppConfig::load(&args.config).await?;
    let roster = Roster::from_config(&config)?;

    if args.check_config {
        cli::print_config_summary(&args.config, &config, &roster);
        return Ok(());
    }

    run_app(config, roster, shutdown_signal()).await?;

    info!("Trackdeck shutdown complete");
    Ok(())
}

async fn run_app(
    config: AppConfig,
    roster: Roster,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    info!("Starting main application loop...");

    let layout = Arc::new(SurfaceLayout::new(&config.layout));
    let palette = Palette::with_overrides(&config.palette);
    let (actor, handle, outputs) = SurfaceActor::new(
        Arc::clone(&layout),
        roster,
        palette,
        (config.display.width, config.display.height),
    );
    let SurfaceOutputs {
        mut requests,
        mut feedback,
    } = outputs;
    let actor_task = actor.spawn();

    let mut driver = SurfaceDriver::new(
        layout,
        &config.midi.input_port,
        &config.midi.output_port,
    );
    driver.connect(handle.clone())?;

    let client: Arc<dyn Transport> = Arc::new(JmriClient::new(config.jmri.url()));
    let server_handle = handle.clone();
    let on_message: MessageCallback = Arc::new(move |message| server_handle.server_message(message));
    client.connect(on_message).await?;

    // Server request pump
    let pump_client = Arc::clone(&client);
    let pump = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            debug!(?request, "Sending request");
            if let Err(e) = pump_client.send_message(request.to_json()).await {
                warn!("Failed to send request to {}: {}", pump_client.name(), e);
            }
        }
    });

    // Display refresh
    let refresh_handle = handle.clone();
    let period = Duration::from_secs_f64(1.0 / f64::from(config.display.fps));
    let refresh = tokio::spawn(async move {
        let mut sink = LoggingFrameSink::new();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let Some(frame) = refresh_handle.render_frame().await else {
                break;
            };
            if let Err(e) = sink.present(&frame) {
                warn!("Failed to present frame: {}", e);
            }
        }
        info!(frames = sink.frames(), "Display refresh stopped");
    });

    info!("Ready!");

    // Surface feedback runs here: the MIDI output connection stays on this task
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            Some(update) = feedback.recv() => {
                if let Err(e) = driver.send_feedback(&update) {
                    warn!("Failed to send feedback to surface: {}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    handle.shutdown();
    if let Err(e) = actor_task.await {
        warn!("Surface actor task failed: {}", e);
    }
    refresh.abort();
    pump.abort();
    client.disconnect().await?;
    driver.disconnect();

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
