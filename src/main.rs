//! # VISCA Joystick
//!
//! Drive PTZ cameras from a USB joystick or game controller.
//!
//! The binary loads the TOML configuration, starts the VISCA relay when it is
//! enabled, binds the PTZ handlers to the controller session and runs the
//! input task until Ctrl+C.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use visca_joystick::actions::PtzActions;
use visca_joystick::camera::{TracingConnector, TracingSwitcher};
use visca_joystick::config::{Config, LoggingConfig};
use visca_joystick::controller::session::ControllerSession;
use visca_joystick::controller::task::run_input_task;
use visca_joystick::error::ViscaJoystickError;
use visca_joystick::relay::ViscaRelay;

/// Used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `[logging] log_dir`
const LOG_FILE_PREFIX: &str = "visca-joystick.log";

type TaskHandle = JoinHandle<std::result::Result<(), ViscaJoystickError>>;

/// Picks the configuration path from the command-line arguments.
fn config_path<I: Iterator<Item = String>>(mut args: I) -> String {
    args.nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Console logging plus an optional daily file.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Waits for a background task; pending forever when there is none.
async fn join_task(task: &mut Option<TaskHandle>, name: &str) -> Result<()> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = handle.await;
    *task = None;
    outcome
        .with_context(|| format!("{} task panicked", name))?
        .with_context(|| format!("{} task failed", name))
}

/// Main entry point for VISCA Joystick
///
/// # Control Flow
///
/// 1. Load configuration (first argument, default `config/default.toml`)
/// 2. Bind the VISCA relay if `[relay] enabled`
/// 3. Resolve the camera addresses, register the PTZ handlers and select camera 1
/// 4. Run the input task, reconnecting the joystick as it comes and goes
/// 5. On Ctrl+C or a fatal task error, signal shutdown and join both tasks
///
/// # Errors
///
/// Returns error if the configuration is invalid, the relay port cannot be
/// bound, or a background task stops with a fatal error.
#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args());
    let config = Config::load(&path).with_context(|| format!("Failed to load {}", path))?;

    let _log_guard = init_logging(&config.logging);
    info!("VISCA Joystick v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", path);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut relay_task: Option<TaskHandle> = None;
    let mut relay_handle = None;
    if config.relay.enabled {
        let relay = ViscaRelay::bind(config.relay.listen_port).await?;
        relay_handle = Some(relay.handle());
        relay_task = Some(tokio::spawn(relay.run(shutdown_rx.clone())));
    }

    let session = Arc::new(Mutex::new(ControllerSession::new(config.session_settings())));

    let mut action_settings = config.action_settings();
    action_settings.resolve_cameras().await;
    let mut actions = PtzActions::new(
        action_settings,
        Box::new(TracingConnector),
        Box::new(TracingSwitcher),
    );
    if let Some(handle) = relay_handle {
        actions = actions.with_relay(handle);
    }
    actions.select_camera(1);
    let actions = Arc::new(Mutex::new(actions));

    {
        let mut session = session.lock().map_err(|_| anyhow!("Controller session lock poisoned"))?;
        PtzActions::register(&actions, &mut session);
    }

    let mut input_task: Option<TaskHandle> = Some(tokio::spawn(run_input_task(
        Arc::clone(&session),
        config.task_config(),
        shutdown_rx,
    )));

    info!("Press Ctrl+C to exit");

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
        res = join_task(&mut input_task, "Input") => res,
        res = join_task(&mut relay_task, "Relay") => res,
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }

    let _ = shutdown_tx.send(true);
    for (task, name) in [(&mut input_task, "Input"), (&mut relay_task, "Relay")] {
        if task.is_some() {
            if let Err(e) = join_task(task, name).await {
                warn!("{:#}", e);
            }
        }
    }

    info!("Shutdown complete");
    outcome
}
