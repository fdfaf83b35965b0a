//! overhead: CLI + alert loop for overhead flight alerts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use overhead_core::config::{self, Config};
use overhead_core::{parse_feed, AircraftTable};

mod engine;
mod publish;
mod render;
mod sources;
mod web;

use engine::{Engine, EngineSettings, LiveView};
use render::CommandRender;
use sources::{AdsbdbRegistry, Collaborators, FlightAwareSchedule, OpenMeteo};

#[derive(Parser)]
#[command(name = "overhead", version, about = "Overhead flight proximity alerts")]
struct Cli {
    /// Config file (default: ~/.overhead/config.yaml)
    #[arg(long, global = true, env = "OVERHEAD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alert loop against the live feed
    Run {
        /// Aircraft feed document (dump1090 aircraft.json)
        #[arg(long, env = "OVERHEAD_FEED")]
        feed: Option<String>,

        /// Where the alert record is published
        #[arg(long, env = "OVERHEAD_OUTPUT")]
        alert_path: Option<String>,

        /// Serve the read-only API on this address (e.g. 127.0.0.1:8081)
        #[arg(long, env = "OVERHEAD_SERVE")]
        serve: Option<String>,

        /// Command launched once per refresh cycle to render the card
        #[arg(long, env = "OVERHEAD_RENDER_COMMAND")]
        render_command: Option<String>,

        /// Seconds between ticks
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Parse a feed file once and print the tracked aircraft table
    Scan {
        /// Path to an aircraft.json document
        file: PathBuf,
    },

    /// Show whether publishing is allowed at an instant
    Schedule {
        /// RFC 3339 instant (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Run {
            feed,
            alert_path,
            serve,
            render_command,
            interval,
        } => {
            let mut config = config;
            if let Some(v) = feed {
                config.feed.path = v;
            }
            if let Some(v) = alert_path {
                config.output.alert_path = v;
            }
            if serve.is_some() {
                config.output.serve = serve;
            }
            if render_command.is_some() {
                config.render.command = render_command;
            }
            if let Some(v) = interval {
                config.feed.interval_secs = v;
            }
            cmd_run(config).await
        }
        Commands::Scan { file } => cmd_scan(&config, file),
        Commands::Schedule { at } => cmd_schedule(&config, at.as_deref()),
        Commands::Config {
            action: ConfigAction::Init { force },
        } => cmd_config_init(cli.config, force),
    }
}

async fn cmd_run(config: Config) {
    let policy = config.schedule_policy().unwrap_or_else(|e| {
        error!(error = %e, "invalid schedule configuration");
        std::process::exit(1);
    });

    let timeout = Duration::from_secs(config.services.timeout_secs.max(1));
    let client = sources::http_client(timeout);
    let sources = Collaborators {
        registry: Arc::new(AdsbdbRegistry::new(&config.services.registry_url, client.clone())),
        schedule: Arc::new(FlightAwareSchedule::new(&config.services.schedule_url, client.clone())),
        weather: Arc::new(OpenMeteo::new(&config.services.weather_url, client)),
        render: Arc::new(CommandRender::new(
            config.render.command.clone(),
            &config.render.asset_path,
        )),
    };

    let mut engine = Engine::new(
        AircraftTable::new(config.reference_point()),
        config.refresh_cycle(),
        config.criteria(),
        policy,
        sources,
        EngineSettings {
            alert_path: PathBuf::from(&config.output.alert_path),
            png_url: config.output.png_url.clone(),
            refresh_interval_ms: config.alert.refresh_interval_ms,
            call_timeout: timeout,
        },
    );

    if let Some(addr) = config.output.serve.clone() {
        let (tx, rx) = watch::channel(LiveView::default());
        tokio::spawn(async move {
            if let Err(e) = web::serve(addr, rx).await {
                error!(error = %e, "API server stopped");
            }
        });
        engine = engine.with_view(tx);
    }

    info!(
        lat = config.reference.lat,
        lon = config.reference.lon,
        output = %config.output.alert_path,
        "overhead starting"
    );
    engine
        .run(
            PathBuf::from(&config.feed.path),
            Duration::from_secs(config.feed.interval_secs.max(1)),
        )
        .await;
}

fn cmd_scan(config: &Config, file: PathBuf) {
    let text = std::fs::read_to_string(&file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });
    let snapshots = parse_feed(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing {}: {e}", file.display());
        std::process::exit(1);
    });

    let now = Utc::now();
    let mut tracked = AircraftTable::new(config.reference_point());
    for snap in &snapshots {
        tracked.upsert(snap, now);
    }
    let criteria = config.criteria();

    println!();
    println!("Feed: {} ({} aircraft)", file.display(), tracked.len());
    println!();

    if tracked.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Hex", "Flight", "Dist (km)", "Closest (km)", "Alt (ft)", "Speed (kts)", "Hdg", "Eligible",
    ]);

    for ac in tracked.by_distance() {
        table.add_row(vec![
            Cell::new(&ac.hex),
            Cell::new(ac.flight().unwrap_or("-")),
            Cell::new(format!("{:.2}", ac.distance_km)),
            Cell::new(
                ac.closest_approach_km
                    .map(|c| format!("{c:.2}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(ac.altitude_ft.map(|a| a.to_string()).unwrap_or("-".into())),
            Cell::new(
                ac.ground_speed_kts
                    .map(|s| format!("{s:.0}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(ac.heading_deg.map(|h| format!("{h:.1}")).unwrap_or("-".into())),
            Cell::new(if criteria.is_eligible(ac) { "yes" } else { "" }),
        ]);
    }

    println!("{table}");

    match criteria.select(&tracked) {
        Some(subject) => println!(
            "\nAlert subject: {} ({}) at {:.2} km",
            subject.flight().unwrap_or("-"),
            subject.hex,
            subject.distance_km
        ),
        None => println!("\nNo alert subject"),
    }
}

fn cmd_schedule(config: &Config, at: Option<&str>) {
    let policy = config.schedule_policy().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let instant = match at {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                eprintln!("Error parsing '{text}': {e}");
                std::process::exit(1);
            }),
        None => Utc::now(),
    };

    let local = instant.with_timezone(&policy.timezone);
    let allowed = policy.is_publishing_allowed(instant);
    println!();
    println!("  Instant:    {}", instant.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Local:      {} ({})", local.format("%a %Y-%m-%d %H:%M:%S"), policy.timezone);
    println!("  Weekdays:   {}", policy.weekday);
    println!("  Weekends:   {}", policy.weekend);
    println!("  Publishing: {}", if allowed { "allowed" } else { "off" });
    println!();
}

fn cmd_config_init(path: Option<PathBuf>, force: bool) {
    let target = path.clone().unwrap_or_else(config::config_file);
    if target.exists() && !force {
        eprintln!("{} already exists (use --force to overwrite)", target.display());
        std::process::exit(1);
    }
    let written = match path {
        Some(p) => config::save_config_to(&Config::default(), &p).map(|_| p),
        None => config::save_config(&Config::default()),
    };
    match written {
        Ok(p) => println!("Wrote {}", p.display()),
        Err(e) => {
            eprintln!("Error writing {}: {e}", target.display());
            std::process::exit(1);
        }
    }
}
