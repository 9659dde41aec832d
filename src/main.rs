//! Thermal Guard binary.
//!
//! Runs the temperature monitor with its control API, or performs one-off
//! sensor and configuration queries.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thermal_guard::config::store;
use thermal_guard::sensors::{classify, format_celsius};
use thermal_guard::{
    start_web_server, ConfigStore, ControlHandle, Device, LogOnlyShutdown, ModeController,
    SensorKind, SensorPoller, SensorProvider, ShutdownAction, SysinfoProvider, SystemShutdown,
    ThresholdMonitor, WebConfig, DEFAULT_HOST, DEFAULT_WEB_PORT,
};
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How long teardown waits for each background task.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "thermal_guard")]
#[command(about = "Shut the machine down once it is cool and idle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Monitors CPU and GPU temperatures and arms a cancellable shutdown countdown once both are below their targets. Also provides a manual shutdown timer and a delayed start of monitoring."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (defaults to config.json beside the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor and control API (default)
    Run,

    /// Take one temperature reading and exit
    Read(ReadArgs),

    /// List every temperature sensor with its category
    Sensors,

    /// Print the effective settings, repairing the file if needed
    Config,
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// Web server bind address
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Run without the control API
    #[arg(long)]
    no_web: bool,

    /// Log instead of shutting the machine down
    #[arg(long)]
    dry_run: bool,

    /// Seconds to suppress auto-arm after an automatic countdown is cancelled
    #[arg(long, default_value_t = 0)]
    snooze_seconds: u64,

    /// Maximum concurrent status stream clients
    #[arg(long, default_value_t = 16)]
    max_connections: usize,

    /// Foreign origin allowed to call the control API (repeatable)
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    cors_origins: Vec<String>,
}

#[derive(Args)]
struct ReadArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Run) | None => run_command(&cli, &cli.run).await,
        Some(Commands::Read(args)) => read_command(args).await,
        Some(Commands::Sensors) => sensors_command().await,
        Some(Commands::Config) => config_command(&cli),
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("Thermal Guard");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn open_store(cli: &Cli) -> anyhow::Result<ConfigStore> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigStore::default_path()?,
    };
    Ok(ConfigStore::open(path))
}

async fn run_command(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    print_banner();

    let store = open_store(cli)?;
    info!("Settings loaded from {:?}", store.path());

    let (stop_tx, stop_rx) = watch::channel(false);

    let poller = SensorPoller::new(SysinfoProvider::new(), store.subscribe());
    let readings = poller.readings();
    let poller_task = poller.spawn(stop_rx.clone());

    let action: Arc<dyn ShutdownAction> = if args.dry_run {
        warn!("Dry run: shutdown will only be logged");
        Arc::new(LogOnlyShutdown)
    } else {
        Arc::new(SystemShutdown)
    };
    let monitor = ThresholdMonitor::with_snooze(Duration::from_secs(args.snooze_seconds));

    let mut controller = ModeController::new(store, action, monitor);
    controller.restore();
    let (handle, commands) = ControlHandle::channel(controller.subscribe());
    let controller_task = tokio::spawn(controller.run(commands, readings, stop_rx.clone()));

    let mut web_task = if args.no_web {
        info!("Control API disabled");
        None
    } else {
        let web_config = WebConfig::new(&args.host, args.port)
            .with_cors_origins(args.cors_origins.iter().cloned())
            .with_max_websocket_connections(args.max_connections);
        println!("Control API: http://{}/", web_config.bind_address());
        if web_config.cors_enabled() {
            info!("CORS origins: {}", web_config.cors_origins.join(", "));
        }
        Some(tokio::spawn(start_web_server(
            web_config,
            handle.clone(),
            stop_rx.clone(),
        )))
    };

    let mut web_finished = false;
    match web_task.as_mut() {
        Some(task) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("failed to listen for ctrl-c")?;
                    info!("Interrupted, shutting down");
                }
                finished = task => {
                    web_finished = true;
                    match finished {
                        Ok(Ok(())) => warn!("Web server exited"),
                        Ok(Err(e)) => error!("{}", e),
                        Err(e) => error!("Web server task failed: {}", e),
                    }
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            info!("Interrupted, shutting down");
        }
    }

    if web_finished {
        web_task = None;
    }
    let _ = stop_tx.send(true);
    drop(handle);

    if tokio::time::timeout(TEARDOWN_TIMEOUT, controller_task).await.is_err() {
        warn!("Controller did not stop in time");
    }
    if tokio::time::timeout(TEARDOWN_TIMEOUT, poller_task).await.is_err() {
        warn!("Sensor poller did not stop in time");
    }
    if let Some(task) = web_task {
        if tokio::time::timeout(TEARDOWN_TIMEOUT, task).await.is_err() {
            warn!("Web server did not stop in time");
        }
    }

    Ok(())
}

async fn enumerate_devices() -> anyhow::Result<Vec<Device>> {
    let devices = tokio::task::spawn_blocking(|| SysinfoProvider::new().enumerate()).await??;
    Ok(devices)
}

async fn read_command(args: &ReadArgs) -> anyhow::Result<()> {
    let reading = classify::aggregate(&enumerate_devices().await?);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&reading)?),
        "pretty" => {
            println!(
                "Temperatures ({})",
                reading.observed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("  CPU: {}", format_celsius(reading.cpu));
            println!("  GPU: {}", format_celsius(reading.gpu));
        }
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

async fn sensors_command() -> anyhow::Result<()> {
    let devices = enumerate_devices().await?;
    if devices.is_empty() {
        println!("No temperature sensors found");
        return Ok(());
    }

    for device in &devices {
        println!("{}", device.name);
        for sensor in device
            .sensors
            .iter()
            .filter(|s| s.kind == SensorKind::Temperature)
        {
            let category = classify::classify(&device.name, &sensor.name)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<24} {:>8}  {}",
                sensor.name,
                format_celsius(sensor.value),
                category
            );
        }
    }

    Ok(())
}

fn config_command(cli: &Cli) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let encoded = store::encode(&store.settings())?;
    println!("# {}", store.path().display());
    print!("{}", String::from_utf8(encoded)?);
    Ok(())
}
