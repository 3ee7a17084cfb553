//! # PTZ Actions Module
//!
//! Handlers that turn logical controller events into camera, switcher and
//! relay commands.
//!
//! | Function | Fires on | Effect |
//! |----------|----------|--------|
//! | Camera select | release | connect slot N (long press: N+4), retarget relay, switcher `(page, 0, N)` |
//! | Brightness up/down | press | auto exposure, then exposure compensation +/- |
//! | Preset | release | recall preset N (long press: save) |
//! | Fade to program | press | switcher `(page, 1, 1)` |
//! | Autofocus | press | focus mode auto |
//! | White balance | release | one push + trigger (long press: auto) |
//! | Pan/tilt, zoom, focus | motion | speed from the sensitivity curves; stop sent once |
//!
//! Camera failures are logged and otherwise ignored.
//!
//! Camera slot addresses are resolved once, before the handlers run
//! ([`ActionSettings::resolve_cameras`]); selecting a camera never waits on
//! a name lookup.
//!
//! ## Locking
//!
//! [`PtzActions::register`] binds every handler to one shared
//! `Arc<Mutex<PtzActions>>`. Handlers run with the session lock held and
//! then take the actions lock, so application code must never hold the
//! actions lock while acquiring the session lock.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::camera::{
    CameraConnector, CameraDriver, CameraError, ExposureMode, FocusMode, Switcher, WhiteBalanceMode,
};
use crate::controller::button::ButtonEvent;
use crate::controller::profile::ControlFunction;
use crate::controller::session::{AxisEvent, ControlEvent, ControllerSession};
use crate::controller::speed::{joy_pos_to_cam_speed, SensitivityTables};
use crate::relay::{self, RelayHandle};

/// Camera bank size; a long press selects from the second bank.
pub const CAMERA_BANK: u8 = 4;

/// Switcher row used for camera selection.
const SWITCHER_ROW_CAMERA: u16 = 0;
/// Switcher location that fades preview to program.
const SWITCHER_FADE: (u16, u16) = (1, 1);

/// Network address of one camera slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSlot {
    pub host: String,
    pub port: u16,
    /// Resolved address; `None` until [`CameraSlot::resolve`] succeeds.
    pub addr: Option<SocketAddr>,
}

impl CameraSlot {
    /// IP literals are resolved immediately; names wait for
    /// [`CameraSlot::resolve`].
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            addr: host.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, port)),
        }
    }

    /// Looks up the host name if the slot has no address yet.
    ///
    /// Returns whether the slot has an address afterwards.
    pub async fn resolve(&mut self) -> bool {
        if self.addr.is_none() {
            self.addr = relay::resolve(&self.host, self.port).await;
            match self.addr {
                Some(addr) => debug!("Camera {} resolved to {}", self.host, addr),
                None => warn!("Camera {}:{} could not be resolved", self.host, self.port),
            }
        }
        self.addr.is_some()
    }
}

/// Settings the handlers need from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSettings {
    pub sensitivity: SensitivityTables,
    pub invert_tilt: bool,
    pub swap_pan: bool,
    /// Camera slots; slot 1 is index 0.
    pub cameras: Vec<CameraSlot>,
    pub switcher_page: u16,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            sensitivity: SensitivityTables::default(),
            invert_tilt: false,
            swap_pan: false,
            cameras: vec![
                CameraSlot::new("10.100.1.202", 52381),
                CameraSlot::new("10.100.1.116", 52381),
            ],
            switcher_page: 99,
        }
    }
}

impl ActionSettings {
    /// Resolves every camera slot. Unresolved slots stay selectable but
    /// clear the relay destination.
    pub async fn resolve_cameras(&mut self) {
        for slot in &mut self.cameras {
            slot.resolve().await;
        }
    }
}

fn report(what: &str, result: Result<(), CameraError>) {
    if let Err(e) = result {
        warn!("{} failed: {}", what, e);
    }
}

/// Camera-control state shared by all handlers.
pub struct PtzActions {
    settings: ActionSettings,
    connector: Box<dyn CameraConnector>,
    switcher: Box<dyn Switcher>,
    relay: Option<RelayHandle>,
    camera: Option<Box<dyn CameraDriver>>,
    current: Option<u8>,
    moving: bool,
    zooming: bool,
    focusing: bool,
}

impl PtzActions {
    #[must_use]
    pub fn new(
        settings: ActionSettings,
        connector: Box<dyn CameraConnector>,
        switcher: Box<dyn Switcher>,
    ) -> Self {
        Self {
            settings,
            connector,
            switcher,
            relay: None,
            camera: None,
            current: None,
            moving: false,
            zooming: false,
            focusing: false,
        }
    }

    /// Retargets `relay` whenever a camera is selected.
    #[must_use]
    pub fn with_relay(mut self, relay: RelayHandle) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Number of the connected camera.
    #[must_use]
    pub fn current_camera(&self) -> Option<u8> {
        self.current
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.camera.is_some()
    }

    #[must_use]
    pub fn settings(&self) -> &ActionSettings {
        &self.settings
    }

    /// Binds a handler for every control function to `actions`.
    pub fn register(actions: &Arc<Mutex<PtzActions>>, session: &mut ControllerSession) {
        for function in ControlFunction::ALL {
            if function == ControlFunction::None {
                continue;
            }
            let actions = Arc::clone(actions);
            session.set_handler(
                function,
                Box::new(move |event: &ControlEvent| match actions.lock() {
                    Ok(mut actions) => actions.handle(event),
                    Err(_) => warn!("Actions lock poisoned, dropping {:?} event", event.function()),
                }),
            );
        }
    }

    /// Handles one logical event.
    pub fn handle(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::Button(button) => match button.function {
                ControlFunction::CameraSelect => self.on_camera_select(button),
                ControlFunction::BrightnessUp => self.on_brightness(button, true),
                ControlFunction::BrightnessDown => self.on_brightness(button, false),
                ControlFunction::Preset => self.on_preset(button),
                ControlFunction::FadeToProgram => self.on_fade_to_program(button),
                ControlFunction::AutoFocus => self.on_autofocus(button),
                ControlFunction::WhiteBalance => self.on_white_balance(button),
                other => debug!("No button action for {:?}", other),
            },
            ControlEvent::Axis(axis) => match axis.function {
                ControlFunction::PanTilt => self.on_pan_tilt(axis),
                ControlFunction::Zoom => self.on_zoom(axis),
                ControlFunction::FocusNear => self.on_focus_trigger(axis, false),
                ControlFunction::FocusFar | ControlFunction::Focus => self.on_focus_trigger(axis, true),
                other => debug!("No axis action for {:?}", other),
            },
        }
    }

    /// Connects to camera `number` (1-based), replacing the current one.
    ///
    /// Returns `false` if the number has no slot or the camera cannot be
    /// reached. The previous camera is released either way once the number
    /// is valid.
    pub fn select_camera(&mut self, number: u8) -> bool {
        let Some(slot) = usize::from(number)
            .checked_sub(1)
            .and_then(|i| self.settings.cameras.get(i))
            .cloned()
        else {
            warn!("Bad camera number {}", number);
            return false;
        };

        if let Some(mut old) = self.camera.take() {
            report("Stop zoom", old.zoom(0));
            report("Stop pan/tilt", old.pan_tilt(0, 0));
            report("Close camera", old.close());
        }
        self.current = None;
        self.moving = false;
        self.zooming = false;
        self.focusing = false;

        if let Some(relay) = &self.relay {
            match slot.addr {
                Some(addr) => relay.set_destination_addr(addr),
                None => {
                    warn!("Camera {} ({}) has no address, relay destination cleared", number, slot.host);
                    relay.clear_destination();
                }
            }
        }

        match self.connector.connect(&slot.host, slot.port) {
            Ok(camera) => {
                self.camera = Some(camera);
                self.current = Some(number);
                info!("Camera {} ({}:{})", number, slot.host, slot.port);
                report(
                    "Switcher preview",
                    self.switcher.press_location(
                        self.settings.switcher_page,
                        SWITCHER_ROW_CAMERA,
                        u16::from(number),
                    ),
                );
                true
            }
            Err(e) => {
                warn!("Camera {} not available: {}", number, e);
                false
            }
        }
    }

    fn on_camera_select(&mut self, button: &ButtonEvent) {
        if button.is_down {
            return;
        }
        let number = if button.is_long_press {
            button.value.saturating_add(CAMERA_BANK)
        } else {
            button.value
        };
        self.select_camera(number);
    }

    fn on_brightness(&mut self, button: &ButtonEvent, up: bool) {
        if !button.is_down {
            return;
        }
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        let result = camera.set_autoexposure_mode(ExposureMode::Auto).and_then(|()| {
            if up {
                camera.increase_exposure_compensation()
            } else {
                camera.decrease_exposure_compensation()
            }
        });
        match result {
            Ok(()) => info!("{} brightness", if up { "Increase" } else { "Decrease" }),
            Err(e) => warn!("Brightness change failed: {}", e),
        }
    }

    fn on_preset(&mut self, button: &ButtonEvent) {
        if button.is_down {
            return;
        }
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        let preset = button.value;
        let index = preset.saturating_sub(1);
        if button.is_long_press {
            info!("Setting preset {}", preset);
            report("Save preset", camera.save_preset(index));
        } else {
            info!("Preset {}", preset);
            report("Recall preset", camera.recall_preset(index));
        }
    }

    fn on_fade_to_program(&mut self, button: &ButtonEvent) {
        if !button.is_down {
            return;
        }
        info!("Preview to program");
        let (row, column) = SWITCHER_FADE;
        report(
            "Fade to program",
            self.switcher.press_location(self.settings.switcher_page, row, column),
        );
    }

    fn on_autofocus(&mut self, button: &ButtonEvent) {
        if !button.is_down {
            return;
        }
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        self.focusing = false;
        info!("Autofocus mode");
        report("Autofocus", camera.set_focus_mode(FocusMode::Auto));
    }

    fn on_white_balance(&mut self, button: &ButtonEvent) {
        if button.is_down {
            return;
        }
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        if button.is_long_press {
            info!("Auto white balance");
            report("White balance", camera.white_balance_mode(WhiteBalanceMode::Auto));
        } else {
            info!("One push white balance");
            let result = camera
                .white_balance_mode(WhiteBalanceMode::OnePush)
                .and_then(|()| camera.white_balance_mode(WhiteBalanceMode::OnePushTrigger));
            report("White balance", result);
        }
    }

    fn on_pan_tilt(&mut self, axis: &AxisEvent) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        let (pan, tilt) = axis.pan_tilt.unwrap_or((0.0, 0.0));
        let pan_speed = joy_pos_to_cam_speed(pan, &self.settings.sensitivity.pan, self.settings.swap_pan);
        let tilt_speed = joy_pos_to_cam_speed(tilt, &self.settings.sensitivity.tilt, self.settings.invert_tilt);

        let moving = pan_speed != 0 || tilt_speed != 0;
        if self.moving || moving {
            report("Pan/tilt", camera.pan_tilt(pan_speed, tilt_speed));
        }
        self.moving = moving;
    }

    fn on_zoom(&mut self, axis: &AxisEvent) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        // Stick up is negative; zoom in is positive.
        let speed = joy_pos_to_cam_speed(axis.value, &self.settings.sensitivity.zoom, true);
        let zooming = speed != 0;
        if self.zooming || zooming {
            report("Zoom", camera.zoom(speed));
        }
        self.zooming = zooming;
    }

    fn on_focus_trigger(&mut self, axis: &AxisEvent, far: bool) {
        // Triggers and the throttle's back stop rest at -1.
        let position = (axis.value + 1.0) / 2.0;
        let speed = joy_pos_to_cam_speed(position, &self.settings.sensitivity.focus, far);
        self.drive_focus(speed, if far { "far" } else { "near" });
    }

    fn drive_focus(&mut self, speed: i32, direction: &str) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        let focusing = speed != 0;
        if focusing && !self.focusing {
            info!("Manual focus {}: start", direction);
            report("Manual focus mode", camera.set_focus_mode(FocusMode::Manual));
        }
        if self.focusing || focusing {
            if !focusing {
                info!("Manual focus: stop");
            }
            report("Manual focus", camera.manual_focus(speed));
        }
        self.focusing = focusing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{MockCameraConnector, MockCameraDriver, MockSwitcher};
    use crate::controller::session::{DeviceInfo, PhysicalEvent, SessionSettings};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::collections::VecDeque;

    fn connector_for(cameras: Vec<MockCameraDriver>) -> MockCameraConnector {
        let count = cameras.len();
        let mut queue: VecDeque<MockCameraDriver> = cameras.into();
        let mut connector = MockCameraConnector::new();
        connector.expect_connect().times(count).returning(move |_, _| {
            Ok(Box::new(queue.pop_front().unwrap()) as Box<dyn CameraDriver>)
        });
        connector
    }

    fn any_switcher() -> MockSwitcher {
        let mut switcher = MockSwitcher::new();
        switcher.expect_press_location().returning(|_, _, _| Ok(()));
        switcher
    }

    /// Actions already connected to camera 1, which is `camera`.
    fn connected(camera: MockCameraDriver, settings: ActionSettings) -> PtzActions {
        let mut actions = PtzActions::new(
            settings,
            Box::new(connector_for(vec![camera])),
            Box::new(any_switcher()),
        );
        assert!(actions.select_camera(1));
        actions
    }

    fn button(function: ControlFunction, value: u8, is_down: bool, is_long_press: bool) -> ControlEvent {
        ControlEvent::Button(ButtonEvent {
            function,
            value,
            is_down,
            is_double_click: false,
            is_long_press,
        })
    }

    fn axis(function: ControlFunction, value: f32) -> ControlEvent {
        ControlEvent::Axis(AxisEvent {
            function,
            axis: 0,
            value,
            pan_tilt: None,
        })
    }

    fn pan_tilt(pan: f32, tilt: f32) -> ControlEvent {
        ControlEvent::Axis(AxisEvent {
            function: ControlFunction::PanTilt,
            axis: 0,
            value: pan,
            pan_tilt: Some((pan, tilt)),
        })
    }

    // ==================== Camera Select Tests ====================

    #[test]
    fn test_select_camera_switches_and_stops_previous() {
        let mut seq = Sequence::new();
        let mut first = MockCameraDriver::new();
        first.expect_zoom().with(eq(0)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        first.expect_pan_tilt().with(eq(0), eq(0)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
        first.expect_close().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        let second = MockCameraDriver::new();

        let mut switcher = MockSwitcher::new();
        switcher.expect_press_location().with(eq(99), eq(0), eq(1)).times(1).returning(|_, _, _| Ok(()));
        switcher.expect_press_location().with(eq(99), eq(0), eq(2)).times(1).returning(|_, _, _| Ok(()));

        let relay = RelayHandle::new();
        let mut actions = PtzActions::new(
            ActionSettings::default(),
            Box::new(connector_for(vec![first, second])),
            Box::new(switcher),
        )
        .with_relay(relay.clone());

        actions.handle(&button(ControlFunction::CameraSelect, 1, true, false));
        assert_eq!(actions.current_camera(), None, "press does not select");
        actions.handle(&button(ControlFunction::CameraSelect, 1, false, false));
        assert_eq!(actions.current_camera(), Some(1));
        assert_eq!(relay.destination(), Some("10.100.1.202:52381".parse().unwrap()));

        actions.handle(&button(ControlFunction::CameraSelect, 2, false, false));
        assert_eq!(actions.current_camera(), Some(2));
        assert_eq!(relay.destination(), Some("10.100.1.116:52381".parse().unwrap()));
    }

    #[test]
    fn test_unresolved_camera_clears_relay_destination() {
        let mut first = MockCameraDriver::new();
        first.expect_zoom().returning(|_| Ok(()));
        first.expect_pan_tilt().returning(|_, _| Ok(()));
        first.expect_close().returning(|| Ok(()));

        let settings = ActionSettings {
            cameras: vec![
                CameraSlot::new("10.0.0.1", 52381),
                CameraSlot::new("camera-two.invalid", 52381),
            ],
            ..ActionSettings::default()
        };
        let relay = RelayHandle::new();
        let mut actions = PtzActions::new(
            settings,
            Box::new(connector_for(vec![first, MockCameraDriver::new()])),
            Box::new(any_switcher()),
        )
        .with_relay(relay.clone());

        assert!(actions.select_camera(1));
        assert_eq!(relay.destination(), Some("10.0.0.1:52381".parse().unwrap()));

        // The driver may still connect by name; the relay must not keep
        // forwarding to camera 1.
        assert!(actions.select_camera(2));
        assert_eq!(actions.current_camera(), Some(2));
        assert_eq!(relay.destination(), None);
    }

    #[test]
    fn test_long_press_selects_upper_bank() {
        let settings = ActionSettings {
            cameras: (1..=6).map(|i| CameraSlot::new(&format!("10.0.0.{}", i), 52381)).collect(),
            ..ActionSettings::default()
        };
        let mut connector = MockCameraConnector::new();
        connector
            .expect_connect()
            .withf(|host, port| host.to_string() == "10.0.0.6" && *port == 52381)
            .times(1)
            .returning(|_, _| Ok(Box::new(MockCameraDriver::new()) as Box<dyn CameraDriver>));

        let mut actions = PtzActions::new(settings, Box::new(connector), Box::new(any_switcher()));
        actions.handle(&button(ControlFunction::CameraSelect, 2, false, true));
        assert_eq!(actions.current_camera(), Some(6));
    }

    #[test]
    fn test_out_of_range_camera_is_ignored() {
        let mut actions = PtzActions::new(
            ActionSettings::default(),
            Box::new(MockCameraConnector::new()),
            Box::new(MockSwitcher::new()),
        );
        actions.handle(&button(ControlFunction::CameraSelect, 1, false, true));
        assert!(!actions.select_camera(0));
        assert!(!actions.select_camera(3));
        assert_eq!(actions.current_camera(), None);
    }

    #[test]
    fn test_unreachable_camera() {
        let mut connector = MockCameraConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_, _| Err(CameraError::Unavailable("no route".to_string())));

        let mut actions = PtzActions::new(
            ActionSettings::default(),
            Box::new(connector),
            Box::new(MockSwitcher::new()),
        );
        assert!(!actions.select_camera(1));
        assert!(!actions.is_connected());

        // No camera: motion and presets are no-ops.
        actions.handle(&pan_tilt(1.0, 1.0));
        actions.handle(&button(ControlFunction::Preset, 1, false, false));
    }

    // ==================== Camera Slot Tests ====================

    #[test]
    fn test_camera_slot_literal_is_resolved_up_front() {
        let slot = CameraSlot::new("10.100.1.202", 52381);
        assert_eq!(slot.addr, Some("10.100.1.202:52381".parse().unwrap()));
        assert_eq!(CameraSlot::new("ptz-left.local", 52381).addr, None);
    }

    #[tokio::test]
    async fn test_resolve_cameras() {
        let mut settings = ActionSettings {
            cameras: vec![
                CameraSlot {
                    host: "127.0.0.1".to_string(),
                    port: 1259,
                    addr: None,
                },
                CameraSlot::new("no-such-camera.invalid", 52381),
                CameraSlot::new("10.0.0.3", 52381),
            ],
            ..ActionSettings::default()
        };
        settings.resolve_cameras().await;

        assert_eq!(settings.cameras[0].addr, Some("127.0.0.1:1259".parse().unwrap()));
        assert_eq!(settings.cameras[1].addr, None);
        assert_eq!(settings.cameras[2].addr, Some("10.0.0.3:52381".parse().unwrap()));
    }

    // ==================== Button Action Tests ====================

    #[test]
    fn test_brightness_up_on_press() {
        let mut seq = Sequence::new();
        let mut camera = MockCameraDriver::new();
        camera
            .expect_set_autoexposure_mode()
            .with(eq(ExposureMode::Auto))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        camera.expect_increase_exposure_compensation().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::BrightnessUp, 0, true, false));
        actions.handle(&button(ControlFunction::BrightnessUp, 0, false, false));
    }

    #[test]
    fn test_brightness_down_stops_on_failure() {
        let mut camera = MockCameraDriver::new();
        camera
            .expect_set_autoexposure_mode()
            .times(1)
            .returning(|_| Err(CameraError::Rejected("not executable".to_string())));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::BrightnessDown, 0, true, false));
    }

    #[test]
    fn test_preset_recall_and_save() {
        let mut camera = MockCameraDriver::new();
        camera.expect_recall_preset().with(eq(2)).times(1).returning(|_| Ok(()));
        camera.expect_save_preset().with(eq(7)).times(1).returning(|_| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::Preset, 3, true, false));
        actions.handle(&button(ControlFunction::Preset, 3, false, false));
        actions.handle(&button(ControlFunction::Preset, 8, false, true));
    }

    #[test]
    fn test_preset_failure_is_swallowed() {
        let mut camera = MockCameraDriver::new();
        camera
            .expect_recall_preset()
            .times(2)
            .returning(|_| Err(CameraError::Rejected("no such preset".to_string())));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::Preset, 1, false, false));
        actions.handle(&button(ControlFunction::Preset, 1, false, false));
        assert!(actions.is_connected());
    }

    #[test]
    fn test_fade_to_program_without_camera() {
        let mut switcher = MockSwitcher::new();
        switcher.expect_press_location().with(eq(12), eq(1), eq(1)).times(1).returning(|_, _, _| Ok(()));
        let settings = ActionSettings {
            switcher_page: 12,
            ..ActionSettings::default()
        };
        let mut actions = PtzActions::new(settings, Box::new(MockCameraConnector::new()), Box::new(switcher));
        actions.handle(&button(ControlFunction::FadeToProgram, 0, true, false));
        actions.handle(&button(ControlFunction::FadeToProgram, 0, false, false));
    }

    #[test]
    fn test_autofocus_on_press() {
        let mut camera = MockCameraDriver::new();
        camera.expect_set_focus_mode().with(eq(FocusMode::Auto)).times(1).returning(|_| Ok(()));
        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::AutoFocus, 0, true, false));
        actions.handle(&button(ControlFunction::AutoFocus, 0, false, false));
    }

    #[test]
    fn test_white_balance_short_press() {
        let mut seq = Sequence::new();
        let mut camera = MockCameraDriver::new();
        camera
            .expect_white_balance_mode()
            .with(eq(WhiteBalanceMode::OnePush))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        camera
            .expect_white_balance_mode()
            .with(eq(WhiteBalanceMode::OnePushTrigger))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::WhiteBalance, 0, true, false));
        actions.handle(&button(ControlFunction::WhiteBalance, 0, false, false));
    }

    #[test]
    fn test_white_balance_long_press() {
        let mut camera = MockCameraDriver::new();
        camera.expect_white_balance_mode().with(eq(WhiteBalanceMode::Auto)).times(1).returning(|_| Ok(()));
        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&button(ControlFunction::WhiteBalance, 0, false, true));
    }

    // ==================== Motion Action Tests ====================

    #[test]
    fn test_pan_tilt_stop_sent_once() {
        let mut camera = MockCameraDriver::new();
        camera.expect_pan_tilt().with(eq(20), eq(0)).times(1).returning(|_, _| Ok(()));
        camera.expect_pan_tilt().with(eq(0), eq(0)).times(1).returning(|_, _| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&pan_tilt(0.0, 0.0));
        actions.handle(&pan_tilt(1.0, 0.0));
        actions.handle(&pan_tilt(0.0, 0.0));
        actions.handle(&pan_tilt(0.0, 0.0));
    }

    #[test]
    fn test_pan_tilt_inversion() {
        let mut camera = MockCameraDriver::new();
        camera.expect_pan_tilt().with(eq(-20), eq(-18)).times(1).returning(|_, _| Ok(()));
        camera.expect_pan_tilt().with(eq(20), eq(18)).times(1).returning(|_, _| Ok(()));

        let settings = ActionSettings {
            swap_pan: true,
            invert_tilt: true,
            ..ActionSettings::default()
        };
        let mut actions = connected(camera, settings);
        actions.handle(&pan_tilt(1.0, 1.0));
        actions.handle(&pan_tilt(-1.0, -1.0));
    }

    #[test]
    fn test_pan_tilt_failure_keeps_tracking() {
        let mut camera = MockCameraDriver::new();
        camera
            .expect_pan_tilt()
            .times(2)
            .returning(|_, _| Err(CameraError::Unavailable("timeout".to_string())));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&pan_tilt(1.0, 0.0));
        actions.handle(&pan_tilt(0.0, 0.0));
        actions.handle(&pan_tilt(0.0, 0.0));
    }

    #[test]
    fn test_zoom_inverted_and_stop_once() {
        let mut camera = MockCameraDriver::new();
        camera.expect_zoom().with(eq(-7)).times(1).returning(|_| Ok(()));
        camera.expect_zoom().with(eq(7)).times(1).returning(|_| Ok(()));
        camera.expect_zoom().with(eq(0)).times(1).returning(|_| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&axis(ControlFunction::Zoom, 1.0));
        actions.handle(&axis(ControlFunction::Zoom, -1.0));
        actions.handle(&axis(ControlFunction::Zoom, 0.0));
        actions.handle(&axis(ControlFunction::Zoom, 0.0));
    }

    #[test]
    fn test_focus_near_trigger() {
        let mut seq = Sequence::new();
        let mut camera = MockCameraDriver::new();
        camera
            .expect_set_focus_mode()
            .with(eq(FocusMode::Manual))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(7)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(3)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(0)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&axis(ControlFunction::FocusNear, -1.0)); // at rest
        actions.handle(&axis(ControlFunction::FocusNear, 1.0));
        actions.handle(&axis(ControlFunction::FocusNear, 0.0));
        actions.handle(&axis(ControlFunction::FocusNear, -1.0));
        actions.handle(&axis(ControlFunction::FocusNear, -1.0));
    }

    #[test]
    fn test_focus_far_trigger_is_negative() {
        let mut camera = MockCameraDriver::new();
        camera.expect_set_focus_mode().times(1).returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(-7)).times(1).returning(|_| Ok(()));
        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&axis(ControlFunction::FocusFar, 1.0));
    }

    #[test]
    fn test_autofocus_resets_manual_focus() {
        let mut camera = MockCameraDriver::new();
        camera.expect_set_focus_mode().with(eq(FocusMode::Manual)).times(2).returning(|_| Ok(()));
        camera.expect_set_focus_mode().with(eq(FocusMode::Auto)).times(1).returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(-7)).times(2).returning(|_| Ok(()));

        let mut actions = connected(camera, ActionSettings::default());
        actions.handle(&axis(ControlFunction::FocusFar, 1.0));
        actions.handle(&button(ControlFunction::AutoFocus, 0, true, false));
        actions.handle(&axis(ControlFunction::FocusFar, 1.0));
    }

    // ==================== Registration Tests ====================

    #[test]
    fn test_register_routes_session_events() {
        let actions = Arc::new(Mutex::new(PtzActions::new(
            ActionSettings::default(),
            Box::new(connector_for(vec![MockCameraDriver::new()])),
            Box::new(any_switcher()),
        )));
        let mut session = ControllerSession::new(SessionSettings::default());
        PtzActions::register(&actions, &mut session);

        session
            .handle_event(PhysicalEvent::DeviceAdded(DeviceInfo::new("pad", 11, 6, 1)))
            .unwrap();
        session.handle_event(PhysicalEvent::ButtonDown(1)).unwrap();
        session.handle_event(PhysicalEvent::ButtonUp(1)).unwrap();

        assert_eq!(actions.lock().unwrap().current_camera(), Some(2));
    }

    #[test]
    fn test_flight_throttle_drives_focus_far_from_back_stop() {
        let mut seq = Sequence::new();
        let mut camera = MockCameraDriver::new();
        camera
            .expect_set_focus_mode()
            .with(eq(FocusMode::Manual))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(-7)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        camera.expect_manual_focus().with(eq(0)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));

        let actions = Arc::new(Mutex::new(connected(camera, ActionSettings::default())));
        let mut session = ControllerSession::new(SessionSettings::default());
        PtzActions::register(&actions, &mut session);
        session
            .handle_event(PhysicalEvent::DeviceAdded(DeviceInfo::new("stick", 12, 4, 0)))
            .unwrap();

        // Lever pulled fully back: raw maximum, no focus command.
        session.handle_event(PhysicalEvent::AxisMotion { axis: 3, value: 1.0 }).unwrap();
        // Pushed fully forward, then back to the stop.
        session.handle_event(PhysicalEvent::AxisMotion { axis: 3, value: -1.0 }).unwrap();
        session.handle_event(PhysicalEvent::AxisMotion { axis: 3, value: 1.0 }).unwrap();
    }
}
