//! # Input Task Module
//!
//! The input execution context: owns the joystick, reads its events with a
//! bounded wait and feeds them to the shared [`ControllerSession`].
//!
//! ## Loop
//!
//! 1. Open the configured joystick (or the first one found). While none is
//!    present, retry every `reconnect_interval`.
//! 2. Dispatch [`PhysicalEvent::DeviceAdded`], then read events. Each wait is
//!    bounded by `poll_timeout` so the shutdown flag is seen promptly.
//! 3. Everything already queued is drained in one go and superseded axis
//!    samples are dropped before dispatch.
//! 4. Hat changes are held for `hat_settle` and then reported at their
//!    final position. The wait is a deadline inside the loop, so buttons and
//!    axes keep flowing while a hat settles.
//! 5. On a read error the device is gone: dispatch
//!    [`PhysicalEvent::DeviceRemoved`] and go back to step 1.
//!
//! Every dispatch takes the session lock once per batch. A session error
//! (an input index the device never reported) ends the task.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use tokio::sync::watch;
//! use visca_joystick::controller::session::{ControllerSession, SessionSettings};
//! use visca_joystick::controller::task::{run_input_task, InputTaskConfig};
//!
//! # async fn example() -> visca_joystick::error::Result<()> {
//! let session = Arc::new(Mutex::new(ControllerSession::new(SessionSettings::default())));
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let task = tokio::spawn(run_input_task(session, InputTaskConfig::default(), shutdown_rx));
//! // ...
//! let _ = shutdown_tx.send(true);
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use evdev::{EventStream, InputEvent};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::joystick::Joystick;
use super::mapper::{coalesce_axis_motion, EventMapper};
use super::session::{ControllerSession, PhysicalEvent};
use crate::error::{Result, ViscaJoystickError};

/// Timing and device selection for the input task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTaskConfig {
    /// Device node to open; `None` picks the first joystick found.
    pub device_path: Option<String>,
    pub hat_settle: Duration,
    pub poll_timeout: Duration,
    pub reconnect_interval: Duration,
}

impl Default for InputTaskConfig {
    fn default() -> Self {
        Self {
            device_path: None,
            hat_settle: Duration::from_millis(100),
            poll_timeout: Duration::from_millis(100),
            reconnect_interval: Duration::from_millis(1000),
        }
    }
}

/// Anything that yields evdev events one at a time.
pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = io::Result<InputEvent>> + Send;
}

impl EventSource for EventStream {
    fn next_event(&mut self) -> impl Future<Output = io::Result<InputEvent>> + Send {
        EventStream::next_event(self)
    }
}

/// Why the event pump returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    Shutdown,
    Disconnected,
}

/// Runs until `shutdown` turns true (or its sender is dropped).
///
/// # Errors
///
/// Returns the session's error if it rejects an event, or a controller
/// error if the session lock is poisoned.
pub async fn run_input_task(
    session: Arc<Mutex<ControllerSession>>,
    config: InputTaskConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut waiting_logged = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match Joystick::open(config.device_path.as_deref()) {
            Ok(joystick) => {
                waiting_logged = false;
                let info = joystick.info();
                let (mut stream, mapper) = joystick.into_parts()?;

                dispatch(&session, vec![PhysicalEvent::DeviceAdded(info)])?;
                let exit = pump_events(&session, &mut stream, mapper, &config, &mut shutdown).await;
                dispatch(&session, vec![PhysicalEvent::DeviceRemoved])?;

                match exit {
                    Ok(PumpExit::Shutdown) => break,
                    Ok(PumpExit::Disconnected) => info!("Joystick disconnected, waiting for reconnect"),
                    Err(e) => {
                        error!("Input task stopped: {}", e);
                        return Err(e);
                    }
                }
            }
            Err(ViscaJoystickError::ControllerNotFound) => {
                if !waiting_logged {
                    info!("No joystick found, waiting...");
                    waiting_logged = true;
                }
            }
            Err(e) => {
                if !waiting_logged {
                    warn!("Cannot open joystick: {}", e);
                    waiting_logged = true;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Input task stopped");
    Ok(())
}

async fn pump_events<S: EventSource>(
    session: &Mutex<ControllerSession>,
    source: &mut S,
    mut mapper: EventMapper,
    config: &InputTaskConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<PumpExit> {
    let mut hat_deadline: Option<Instant> = None;

    loop {
        if *shutdown.borrow() {
            return Ok(PumpExit::Shutdown);
        }

        let wait = hat_deadline.map_or(config.poll_timeout, |deadline| {
            deadline.saturating_duration_since(Instant::now()).min(config.poll_timeout)
        });

        let mut events = Vec::new();
        let mut disconnected = false;

        match timeout(wait, source.next_event()).await {
            Ok(Ok(event)) => {
                if let Some(frame) = mapper.process_event(&event) {
                    events.extend(frame);
                }
                // Drain whatever is already queued.
                loop {
                    match timeout(Duration::ZERO, source.next_event()).await {
                        Ok(Ok(event)) => {
                            if let Some(frame) = mapper.process_event(&event) {
                                events.extend(frame);
                            }
                        }
                        Ok(Err(e)) => {
                            debug!("Read failed: {}", e);
                            disconnected = true;
                            break;
                        }
                        Err(_) => break,
                    }
                }
            }
            Ok(Err(e)) => {
                debug!("Read failed: {}", e);
                disconnected = true;
            }
            Err(_) => {}
        }

        if !disconnected {
            if hat_deadline.is_none() && mapper.has_pending_hats() {
                hat_deadline = Some(Instant::now() + config.hat_settle);
            }
            if hat_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                events.extend(mapper.take_settled_hats());
                hat_deadline = None;
            }
        }

        if !events.is_empty() {
            dispatch(session, coalesce_axis_motion(events))?;
        }
        if disconnected {
            return Ok(PumpExit::Disconnected);
        }
    }
}

/// Hands a batch of events to the session under one lock acquisition.
fn dispatch(session: &Mutex<ControllerSession>, events: Vec<PhysicalEvent>) -> Result<()> {
    let mut session = session
        .lock()
        .map_err(|_| ViscaJoystickError::Controller("controller session lock poisoned".to_string()))?;
    for event in events {
        session.handle_event(event)?;
    }
    Ok(())
}
