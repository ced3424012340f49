use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use gps_logic::{EnableOutcome, LocationSample, LocationSession, ProviderSettings, SessionStatus};
use gps_test_shared::{
    SimulatedPlatform, SimulatedProvider, SimulationOptions, load_settings, prelude::*,
};
use log::{LevelFilter, info, warn};
use serde::Serialize;

#[derive(Parser)]
struct Cli {
    /// JSON file with provider settings, defaults are used for anything missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log more, repeat for trace output. Without it `RUST_LOG` decides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// How many readings to take before disabling
    #[arg(short, long, default_value_t = 10)]
    ticks: u32,
    /// Starting latitude
    #[arg(long, default_value_t = 55.7558, allow_hyphen_values = true)]
    lat: f64,
    /// Starting longitude
    #[arg(long, default_value_t = 37.6173, allow_hyphen_values = true)]
    long: f64,
    /// Latitude change per update
    #[arg(long, default_value_t = 0.0001, allow_hyphen_values = true)]
    step_lat: f64,
    /// Longitude change per update
    #[arg(long, default_value_t = 0.0001, allow_hyphen_values = true)]
    step_long: f64,
    /// Noise added to every fix, in meters
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,
    /// The platform has no last known fix
    #[arg(long)]
    no_last_known: bool,
    /// Reject the subscription like a missing location permission
    #[arg(long)]
    deny_permission: bool,
    /// Fail to remove the listener on disable
    #[arg(long)]
    fail_unsubscribe: bool,
    /// Run on a platform without any location service
    #[arg(long)]
    no_location: bool,
    /// Print a JSON summary when done
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a simulated device and print what the session reports every update interval
    Run(RunArgs),
    /// Print the settings in effect (defaults merged with --config)
    PrintConfig,
}

#[derive(Debug, Serialize)]
struct Summary {
    readings: u32,
    readings_with_fix: u32,
    last: Option<LocationSample>,
    fixes_emitted: usize,
}

fn describe(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Disabled => "unavailable",
        SessionStatus::Active => "active",
        SessionStatus::Degraded => "degraded",
    }
}

async fn run(settings: ProviderSettings, args: RunArgs) -> Result {
    let RunArgs {
        ticks,
        lat,
        long,
        step_lat,
        step_long,
        jitter,
        no_last_known,
        deny_permission,
        fail_unsubscribe,
        no_location,
        json,
    } = args;

    let start = LocationSample::new(lat, long);
    if !start.is_valid() {
        bail!("Start position {lat}, {long} is not a valid coordinate");
    }

    let platform = if no_location {
        SimulatedPlatform::without_location()
    } else {
        SimulatedPlatform::new(SimulationOptions {
            start,
            step: LocationSample::new(step_lat, step_long),
            jitter_m: jitter,
            last_known: (!no_last_known).then_some(start),
            deny_subscribe: deny_permission,
            fail_unsubscribe,
        })?
    };

    let period = settings.min_interval();
    let session = LocationSession::<SimulatedProvider>::new(settings);

    match session.enable(Some(&platform)) {
        Ok(EnableOutcome::Degraded(why)) => warn!("Tracking degraded: {why}"),
        Ok(outcome) => info!("Tracking enabled: {outcome:?}"),
        Err(why) => warn!("Tracking unavailable: {why}"),
    }
    info!("Session is {}", describe(session.status()));

    let mut interval = tokio::time::interval(period);
    let mut summary = Summary {
        readings: 0,
        readings_with_fix: 0,
        last: None,
        fixes_emitted: 0,
    };

    'sample: for tick in 0..ticks {
        tokio::select! {
            _ = interval.tick() => {}
            Ok(_) = tokio::signal::ctrl_c() => {
                break 'sample;
            }
        }

        summary.readings += 1;
        match session.position() {
            Some(fix) => {
                summary.readings_with_fix += 1;
                summary.last = Some(fix);
                let point = fix.to_mercator();
                info!(
                    "[{tick}] {:.6}, {:.6} (mercator {}, {})",
                    fix.lat, fix.long, point.x, point.y
                );
            }
            None => info!(
                "[{tick}] no fix ({}, {})",
                session.latitude(),
                session.longitude()
            ),
        }
    }

    session.disable();
    summary.fixes_emitted = platform.provider().map_or(0, |p| p.emitted());

    if json {
        let encoded =
            serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
        println!("{encoded}");
    } else {
        info!(
            "{} of {} readings had a fix, the platform emitted {}",
            summary.readings_with_fix, summary.readings, summary.fixes_emitted
        );
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let mut builder = colog::default_builder();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::PrintConfig => {
            let encoded = serde_json::to_string_pretty(&settings)
                .context("Failed to encode settings")?;
            println!("{encoded}");
            Ok(())
        }
        Commands::Run(args) => run(settings, args).await,
    }
}
