//! Fridge daemon - peltier controller
//!
//! Runs the control loop for a thermoelectric cooler and answers a tiny
//! TCP protocol for reading temperatures and changing the setpoint.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (forks to background)
//! fridged start
//!
//! # Start in the foreground with debug logging
//! fridged start --no-daemon --verbose
//!
//! # Talk to a simulated plant (another daemon on 127.0.0.1:10001)
//! fridged start -n --simulated
//!
//! # Stop / restart the daemon
//! fridged stop
//! fridged restart
//!
//! # Query and change the setpoint
//! fridged current
//! fridged target
//! fridged set-target -- -2.5
//! ```
//!
//! Settings are read from `fridge.toml` in the working directory (or the
//! file given with `--config`); command-line options override the file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fridged::client::FridgeClient;
use fridged::config::{DaemonConfig, DEFAULT_CONFIG_FILE};
use fridged::control::{Controller, Mode};
use fridged::server::{bind_listener, DaemonServer};

/// How long `restart` waits for the old daemon to let go of the port.
const RESTART_GRACE: Duration = Duration::from_secs(2);

/// Fridge daemon - peltier controller
#[derive(Parser, Debug)]
#[command(name = "fridged", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./fridge.toml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Stay in the foreground instead of forking
    #[arg(short = 'n', long = "no-daemon", global = true)]
    no_daemon: bool,

    /// Log what the daemon is doing
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Initial target temperature
    #[arg(short = 't', long, global = true, allow_negative_numbers = true)]
    target_temp: Option<f32>,

    /// Port the daemon listens on
    #[arg(short = 'p', long, global = true)]
    port: Option<u16>,

    /// 1-Wire sensor id, without the family prefix
    #[arg(long, global = true)]
    temp_sensor: Option<String>,

    /// Kernel GPIO line driving the peltier
    #[arg(long, global = true)]
    gpio_line: Option<u32>,

    /// Use a peer daemon instead of the sensor and GPIO line
    #[arg(short = 's', long, global = true)]
    simulated: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start,
    /// Stop the running daemon, then start a new one
    Restart,
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
    /// Print the current temperature
    Current,
    /// Print the target temperature
    Target,
    /// Change the target temperature
    SetTarget {
        #[arg(allow_negative_numbers = true)]
        temp: f32,
    },
}

/// Returns the state directory for PID and log files.
fn state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("fridge")
}

/// Returns the path to the PID file.
fn pid_file_path() -> PathBuf {
    state_dir().join("fridged.pid")
}

/// Returns the path to the log file used once daemonized.
fn log_file_path() -> PathBuf {
    state_dir().join("fridged.log")
}

/// Reads the PID from the PID file, if it exists.
fn read_pid() -> Option<u32> {
    let mut file = File::open(pid_file_path()).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

/// Writes the current PID to the PID file.
fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file() {
    let _ = fs::remove_file(pid_file_path());
}

/// Returns the recorded PID if that process is still alive.
fn running_pid() -> Option<u32> {
    let pid = read_pid()?;
    if Path::new(&format!("/proc/{pid}")).exists() {
        Some(pid)
    } else {
        remove_pid_file();
        None
    }
}

/// Builds the effective configuration: file, then command-line overrides.
fn load_config(args: &Args) -> Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => DaemonConfig::load(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}"))?,
        None => DaemonConfig::default(),
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(temp) = args.target_temp {
        config.server.initial_target_temp = temp;
    }
    if let Some(sensor) = &args.temp_sensor {
        config.hardware.sensor_id = sensor.clone();
    }
    if let Some(line) = args.gpio_line {
        config.hardware.gpio_line = line;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Start => start(&args, config),
        Command::Restart => {
            match block_on(client(&config).stop()) {
                Ok(()) => println!("Stopping daemon..."),
                Err(e) if e.is_connect() => println!("Daemon is not running."),
                Err(e) => return Err(e).context("Failed to stop daemon"),
            }
            std::thread::sleep(RESTART_GRACE);
            start(&args, config)
        }
        Command::Stop => {
            match block_on(client(&config).stop()) {
                Ok(()) => println!("Daemon stopping."),
                Err(e) if e.is_connect() => println!("Daemon is not running."),
                Err(e) => return Err(e).context("Failed to stop daemon"),
            }
            Ok(())
        }
        Command::Status => {
            if let Some(pid) = running_pid() {
                println!("Daemon is running (PID {pid})");
                println!("Port: {}", config.server.port);
                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
        Command::Current => {
            let temp = block_on(client(&config).current_temp())
                .context("Failed to query current temperature")?;
            println!("{temp}");
            Ok(())
        }
        Command::Target => {
            let temp = block_on(client(&config).target_temp())
                .context("Failed to query target temperature")?;
            println!("{temp}");
            Ok(())
        }
        Command::SetTarget { temp } => {
            block_on(client(&config).set_target(temp))
                .context("Failed to set target temperature")?;
            Ok(())
        }
    }
}

fn client(config: &DaemonConfig) -> FridgeClient {
    FridgeClient::new(config.client_addr(), config.server.message_size)
}

/// Runs a client future on a throwaway current-thread runtime.
fn block_on<F: std::future::Future>(future: F) -> F::Output {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    }
}

fn start(args: &Args, config: DaemonConfig) -> Result<()> {
    if let Some(pid) = running_pid() {
        eprintln!("Daemon is already running (PID {pid})");
        eprintln!("Use 'fridged stop' to stop it first.");
        process::exit(1);
    }

    if !args.no_daemon {
        // Fork before the tokio runtime exists
        daemonize()?;
    }

    write_pid()?;

    let mode = if args.simulated {
        Mode::Simulated
    } else {
        Mode::Direct
    };
    let result = run_daemon(config, mode, args.verbose);

    remove_pid_file();

    result
}

/// Daemonizes the current process.
fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = stdout
        .try_clone()
        .context("Failed to create log file for stderr")?;

    Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

/// Runs the event loop on a single-threaded runtime.
#[tokio::main(flavor = "current_thread")]
async fn run_daemon(config: DaemonConfig, mode: Mode, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("fridged={level}").parse()?)
                .add_directive(format!("fridge_core={level}").parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "Fridge daemon starting"
    );

    // Bind before touching hardware so a busy port leaves the actuator alone
    let listener = bind_listener(&config.server).context("Try restarting the daemon")?;
    let controller =
        Controller::from_config(&config, mode).context("Failed to set up the plant")?;
    let server = DaemonServer::new(listener, &config, controller)?;

    let final_state = server.run().await;

    info!(
        target = final_state.target_temp(),
        current = final_state.current_temp(),
        "Fridge daemon stopped"
    );
    Ok(())
}
