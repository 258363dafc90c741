use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;

use traffic_control::config::{self, Config};
use traffic_control::devices::SimulatedSource;
use traffic_control::simulation::run_traffic_simulation;
use traffic_control::{
    AuthorityNotifier, ControlManager, DeviceFactory, DeviceFamily, DriverNotifier,
    TrafficController,
};

#[derive(Parser)]
#[command(name = "traffic-control")]
#[command(about = "Run a simulated traffic control loop")]
struct Cli {
    /// Device family to drive (urban or highway)
    #[arg(long, env = "TRAFFIC_FAMILY")]
    family: Option<String>,

    /// Congestion level above which actuators fire
    #[arg(long, env = "TRAFFIC_MAX_CONGESTION")]
    max_congestion: Option<u32>,

    /// Milliseconds between control cycles
    #[arg(long, env = "TRAFFIC_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Number of control cycles (0 runs until Ctrl+C)
    #[arg(long, env = "TRAFFIC_CYCLES")]
    cycles: Option<u64>,

    /// Seed for reproducible simulated readings
    #[arg(long, env = "TRAFFIC_SEED")]
    seed: Option<u64>,

    /// Print the final manager state as JSON instead of the action log
    #[arg(long)]
    json: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> traffic_control::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(family) = &cli.family {
        config.control.family = DeviceFamily::from_key(family)?;
    }
    if let Some(level) = cli.max_congestion {
        config.control.max_congestion_level = level;
    }
    if let Some(interval) = cli.interval_ms {
        config.simulation.interval_ms = interval;
    }
    if let Some(cycles) = cli.cycles {
        config.simulation.cycles = (cycles > 0).then_some(cycles);
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    config::load_dotenv();
    init_logger();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(run(config, cli.json));
}

async fn run(config: Config, json: bool) {
    info!("Starting traffic control");
    info!("  Family: {}", config.control.family);
    info!("  Max congestion: {}", config.control.max_congestion_level);
    info!("  Interval: {} ms", config.simulation.interval_ms);
    match config.simulation.cycles {
        Some(cycles) => info!("  Cycles: {}", cycles),
        None => info!("  Cycles: until Ctrl+C"),
    }

    let manager = ControlManager::instance();
    manager.configure(&config.control);

    let (driver, _) = DriverNotifier::attach(manager.stat());
    let (authority, _) = AuthorityNotifier::attach(manager.stat());

    let factory = DeviceFactory::with_source(
        config.control.family,
        Arc::new(SimulatedSource::new(config.simulation.seed)),
    );
    let controller = TrafficController::new(manager, factory);

    let mut simulation = run_traffic_simulation(
        controller,
        Duration::from_millis(config.simulation.interval_ms),
        config.simulation.cycles,
    );

    tokio::select! {
        result = &mut simulation => match result {
            Ok(actuated) => info!("Simulation finished, {} cycles actuated", actuated),
            Err(e) => error!("Simulation task failed: {}", e),
        },
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
            simulation.abort();
        }
    }

    info!("Driver last saw congestion {}", driver.last_seen_congestion());
    info!("Authority last saw: {}", authority.last_seen_incident());

    if json {
        match manager.snapshot().to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => error!("Failed to serialize manager state: {}", e),
        }
    } else {
        print!("{}", manager.render_log());
    }

    info!("Traffic control stopped");
}
