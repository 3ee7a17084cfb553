//! # Axis Module
//!
//! Runtime state for one analog axis: dead-zone suppression, rescaling and
//! the "moving" hysteresis flag.
//!
//! Samples are normalised to `-1.0..=1.0`. A sample whose magnitude is at or
//! below the dead zone is dropped while the axis is at rest. Once the axis
//! is moving, such a sample is forwarded once as `0.0` so the handler can
//! issue its stop command, and the axis returns to rest.
//!
//! Outside the dead zone the magnitude is rescaled so the usable range
//! starts at zero: `(|raw| - dead_zone) / (1 - dead_zone)`.
//!
//! ## Usage
//!
//! ```
//! use visca_joystick::controller::axis::Axis;
//! use visca_joystick::controller::profile::ControlFunction;
//!
//! let mut zoom = Axis::new(ControlFunction::Zoom, 4, 0.3);
//! assert_eq!(zoom.sample(0.3), None);          // inside dead zone, at rest
//! let v = zoom.sample(-0.65).unwrap();         // rescaled, sign kept
//! assert!((v + 0.5).abs() < 1e-6);
//! assert_eq!(zoom.sample(0.1), Some(0.0));     // stop sample
//! assert_eq!(zoom.sample(0.1), None);          // back at rest
//! ```

use super::profile::ControlFunction;

/// Runtime state of one analog axis.
#[derive(Debug, Clone)]
pub struct Axis {
    function: ControlFunction,
    raw_index: usize,
    invert_sign: f32,
    dead_zone: f32,
    is_moving: bool,
    position: f32,
}

impl Axis {
    /// Creates an axis at rest.
    ///
    /// `dead_zone` is clamped to `0.0..1.0`.
    #[must_use]
    pub fn new(function: ControlFunction, raw_index: usize, dead_zone: f32) -> Self {
        Self {
            function,
            raw_index,
            invert_sign: 1.0,
            dead_zone: dead_zone.clamp(0.0, 0.99),
            is_moving: false,
            position: 0.0,
        }
    }

    #[must_use]
    pub fn unbound(raw_index: usize) -> Self {
        Self::new(ControlFunction::None, raw_index, 0.0)
    }

    /// Reports this axis with its sign flipped.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert_sign = -1.0;
        self
    }

    #[must_use]
    pub fn function(&self) -> ControlFunction {
        self.function
    }

    #[must_use]
    pub fn raw_index(&self) -> usize {
        self.raw_index
    }

    #[must_use]
    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    pub fn set_dead_zone(&mut self, dead_zone: f32) {
        self.dead_zone = dead_zone.clamp(0.0, 0.99);
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Last forwarded (filtered, rescaled, signed) value.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Feeds a raw normalised sample through the filter.
    ///
    /// Returns the value to forward to the handler, or `None` when the
    /// sample is suppressed.
    pub fn sample(&mut self, raw: f32) -> Option<f32> {
        let sign = self.invert_sign * if raw < 0.0 { -1.0 } else { 1.0 };
        let magnitude = raw.abs().min(1.0);

        if magnitude <= self.dead_zone {
            if !self.is_moving {
                return None;
            }
            self.is_moving = false;
            self.position = 0.0;
            return Some(0.0);
        }

        let scaled = (magnitude - self.dead_zone) / (1.0 - self.dead_zone);
        self.position = sign * scaled;
        self.is_moving = true;
        Some(self.position)
    }
}
