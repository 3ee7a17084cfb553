//! # Input Event Mapper Module
//!
//! Translates raw evdev events from a joystick into [`PhysicalEvent`]s
//! addressed by dense button/axis/hat indices.
//!
//! ## Index Layout
//!
//! evdev identifies inputs by key and absolute-axis codes. The session works
//! with contiguous indices, assigned once per device by [`InputLayout`]:
//!
//! | Kind | Codes | Order |
//! |------|-------|-------|
//! | Button | `BTN_JOYSTICK..BTN_DIGI` (0x120-0x13f), then `BTN_TRIGGER_HAPPY1..40` (0x2c0-0x2e7) | ascending code |
//! | Axis | `ABS_X..ABS_MISC` (0x00-0x27) except hats | ascending code |
//! | Hat | `ABS_HAT0X/Y..ABS_HAT3X/Y` (0x10-0x17), one per X/Y pair | ascending hat number |
//!
//! Axis values are normalised from the device's reported range to
//! `-1.0..=1.0`. Hat Y is flipped so that `y = 1` is up.
//!
//! ## Framing
//!
//! The kernel groups events into frames terminated by `SYN_REPORT`. Button
//! and axis events are released per frame. Hat events only update the hat's
//! state and mark it changed; [`EventMapper::take_settled_hats`] reports the
//! final position once the caller's settle delay has passed.
//!
//! Events come from evdev's synced [`EventStream`](evdev::EventStream), which
//! never hands out `SYN_DROPPED`. After a kernel buffer overrun it resyncs on
//! its own and emits compensating events for whatever changed, closed by a
//! `SYN_REPORT`, so a resync is just another frame here.
//!
//! ## Usage
//!
//! ```
//! use evdev::{EventType, InputEvent};
//! use visca_joystick::controller::mapper::{AxisRange, EventMapper, InputLayout};
//! use visca_joystick::controller::session::PhysicalEvent;
//!
//! let layout = InputLayout::new([0x130, 0x131], [AxisRange::new(0x00, -32768, 32767)]);
//! let mut mapper = EventMapper::new(layout);
//!
//! assert!(mapper.process_event(&InputEvent::new(EventType::KEY, 0x131, 1)).is_none());
//! let frame = mapper.process_event(&InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)).unwrap();
//! assert_eq!(frame, vec![PhysicalEvent::ButtonDown(1)]);
//! ```

use evdev::{InputEvent, InputEventKind, Synchronization};
use tracing::trace;

use super::session::{DeviceInfo, PhysicalEvent};

/// First joystick/gamepad button code (`BTN_JOYSTICK`).
pub const BTN_JOYSTICK: u16 = 0x120;
/// End of the joystick/gamepad button block (`BTN_DIGI`, exclusive).
pub const BTN_DIGI: u16 = 0x140;
/// First extra button code (`BTN_TRIGGER_HAPPY1`).
pub const BTN_TRIGGER_HAPPY: u16 = 0x2c0;
/// End of the extra button block (exclusive).
pub const BTN_TRIGGER_HAPPY_END: u16 = 0x2e8;
/// First hat axis code (`ABS_HAT0X`).
pub const ABS_HAT0X: u16 = 0x10;
/// Last hat axis code (`ABS_HAT3Y`).
pub const ABS_HAT3Y: u16 = 0x17;
/// End of the joystick axis block (`ABS_MISC`, exclusive).
pub const ABS_MISC: u16 = 0x28;

fn is_button_code(code: u16) -> bool {
    (BTN_JOYSTICK..BTN_DIGI).contains(&code) || (BTN_TRIGGER_HAPPY..BTN_TRIGGER_HAPPY_END).contains(&code)
}

fn is_hat_code(code: u16) -> bool {
    (ABS_HAT0X..=ABS_HAT3Y).contains(&code)
}

/// Reported range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub code: u16,
    pub minimum: i32,
    pub maximum: i32,
}

impl AxisRange {
    #[must_use]
    pub fn new(code: u16, minimum: i32, maximum: i32) -> Self {
        Self { code, minimum, maximum }
    }

    /// Maps a raw value onto `-1.0..=1.0`.
    #[must_use]
    pub fn normalise(&self, value: i32) -> f32 {
        let span = i64::from(self.maximum) - i64::from(self.minimum);
        if span <= 0 {
            return 0.0;
        }
        let offset = (i64::from(value) - i64::from(self.minimum)) as f64;
        let normalised = 2.0 * offset / span as f64 - 1.0;
        (normalised as f32).clamp(-1.0, 1.0)
    }
}

/// Dense index assignment for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLayout {
    buttons: Vec<u16>,
    axes: Vec<AxisRange>,
    hats: Vec<u16>,
}

impl InputLayout {
    /// Builds the layout from the device's supported key codes and
    /// absolute axes. Codes outside the joystick blocks are ignored.
    pub fn new(
        keys: impl IntoIterator<Item = u16>,
        abs: impl IntoIterator<Item = AxisRange>,
    ) -> Self {
        let mut buttons: Vec<u16> = keys.into_iter().filter(|c| is_button_code(*c)).collect();
        buttons.sort_unstable();
        buttons.dedup();

        let mut axes = Vec::new();
        let mut hats = Vec::new();
        for range in abs {
            if is_hat_code(range.code) {
                hats.push((range.code - ABS_HAT0X) / 2);
            } else if range.code < ABS_MISC {
                axes.push(range);
            }
        }
        axes.sort_unstable_by_key(|r| r.code);
        axes.dedup_by_key(|r| r.code);
        hats.sort_unstable();
        hats.dedup();

        Self { buttons, axes, hats }
    }

    #[must_use]
    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn hat_count(&self) -> usize {
        self.hats.len()
    }

    /// A joystick has at least one joystick-block button and one axis.
    #[must_use]
    pub fn is_joystick(&self) -> bool {
        self.buttons.iter().any(|c| (BTN_JOYSTICK..BTN_DIGI).contains(c)) && !self.axes.is_empty()
    }

    #[must_use]
    pub fn button_index(&self, code: u16) -> Option<usize> {
        self.buttons.iter().position(|c| *c == code)
    }

    #[must_use]
    pub fn axis_index(&self, code: u16) -> Option<usize> {
        self.axes.iter().position(|r| r.code == code)
    }

    /// Hat index for a hat axis code, and whether the code is the Y half.
    #[must_use]
    pub fn hat_index(&self, code: u16) -> Option<(usize, bool)> {
        if !is_hat_code(code) {
            return None;
        }
        let hat = (code - ABS_HAT0X) / 2;
        let is_y = (code - ABS_HAT0X) % 2 == 1;
        self.hats.iter().position(|h| *h == hat).map(|i| (i, is_y))
    }

    #[must_use]
    pub fn axis_range(&self, index: usize) -> Option<&AxisRange> {
        self.axes.get(index)
    }

    /// Counts for [`PhysicalEvent::DeviceAdded`].
    #[must_use]
    pub fn device_info(&self, name: &str) -> DeviceInfo {
        DeviceInfo::new(name, self.button_count(), self.axis_count(), self.hat_count())
    }
}

/// Frame accumulator and hat tracker for one device.
#[derive(Debug)]
pub struct EventMapper {
    layout: InputLayout,
    frame: Vec<PhysicalEvent>,
    hats: Vec<(i8, i8)>,
    changed_hats: Vec<bool>,
}

impl EventMapper {
    #[must_use]
    pub fn new(layout: InputLayout) -> Self {
        let hat_count = layout.hat_count();
        Self {
            layout,
            frame: Vec::new(),
            hats: vec![(0, 0); hat_count],
            changed_hats: vec![false; hat_count],
        }
    }

    #[must_use]
    pub fn layout(&self) -> &InputLayout {
        &self.layout
    }

    /// Processes one evdev event.
    ///
    /// Returns the completed frame on `SYN_REPORT` when it holds any button
    /// or axis events.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<Vec<PhysicalEvent>> {
        match event.kind() {
            InputEventKind::Synchronization(sync) if sync == Synchronization::SYN_REPORT => {
                if self.frame.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.frame))
                }
            }
            InputEventKind::Key(key) => {
                self.process_key(key.code(), event.value());
                None
            }
            InputEventKind::AbsAxis(axis) => {
                self.process_abs(axis.0, event.value());
                None
            }
            _ => None,
        }
    }

    fn process_key(&mut self, code: u16, value: i32) {
        let Some(index) = self.layout.button_index(code) else {
            trace!("Ignoring key 0x{:03x}", code);
            return;
        };
        match value {
            1 => self.frame.push(PhysicalEvent::ButtonDown(index)),
            0 => self.frame.push(PhysicalEvent::ButtonUp(index)),
            // autorepeat
            _ => {}
        }
    }

    fn process_abs(&mut self, code: u16, value: i32) {
        if let Some((hat, is_y)) = self.layout.hat_index(code) {
            let direction = value.signum() as i8;
            let state = &mut self.hats[hat];
            let previous = *state;
            if is_y {
                state.1 = -direction;
            } else {
                state.0 = direction;
            }
            if *state != previous {
                self.changed_hats[hat] = true;
            }
            return;
        }
        if let Some(axis) = self.layout.axis_index(code) {
            let value = self.layout.axes[axis].normalise(value);
            self.frame.push(PhysicalEvent::AxisMotion { axis, value });
        }
    }

    /// True when a hat has moved since the last [`EventMapper::take_settled_hats`].
    #[must_use]
    pub fn has_pending_hats(&self) -> bool {
        self.changed_hats.iter().any(|c| *c)
    }

    /// Current positions of every hat that moved, cleared on return.
    pub fn take_settled_hats(&mut self) -> Vec<PhysicalEvent> {
        let mut events = Vec::new();
        for (hat, changed) in self.changed_hats.iter_mut().enumerate() {
            if std::mem::take(changed) {
                events.push(PhysicalEvent::HatMotion {
                    hat,
                    value: self.hats[hat],
                });
            }
        }
        events
    }
}

/// Drops every axis sample that is superseded by a later sample of the same
/// axis. Other events and the relative order of survivors are unchanged.
#[must_use]
pub fn coalesce_axis_motion(events: Vec<PhysicalEvent>) -> Vec<PhysicalEvent> {
    let mut seen = Vec::new();
    let mut kept: Vec<PhysicalEvent> = events
        .into_iter()
        .rev()
        .filter(|event| match event {
            PhysicalEvent::AxisMotion { axis, .. } => {
                if seen.contains(axis) {
                    false
                } else {
                    seen.push(*axis);
                    true
                }
            }
            _ => true,
        })
        .collect();
    kept.reverse();
    kept
}
