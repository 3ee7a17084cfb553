//! # Axis Speed Mapper
//!
//! Converts a normalised axis position into an integer camera speed using a
//! piecewise-linear sensitivity curve.
//!
//! A curve is two parallel ascending sequences: joystick breakpoints `joy`
//! (positions in `0.0..=1.0`) and camera breakpoints `cam` (speeds in camera
//! units). The magnitude of the position is interpolated along the curve and
//! rounded, then the sign of the position is reapplied (optionally flipped).
//! Positions beyond the first or last breakpoint clamp to the end values.
//!
//! The default curves give fine control near the centre and fast response
//! near full deflection:
//!
//! | Curve | joy | cam |
//! |-------|-----|-----|
//! | pan   | 0, 0.05, 0.3, 0.7, 0.9, 1 | 0, 0, 2, 8, 15, 20 |
//! | tilt  | 0, 0.07, 0.3, 0.65, 0.85, 1 | 0, 0, 3, 6, 14, 18 |
//! | zoom  | 0, 0.1, 1 | 0, 0, 7 |
//! | focus | 0, 0.1, 1 | 0, 0, 7 |
//!
//! ## Usage
//!
//! ```
//! use visca_joystick::controller::speed::{joy_pos_to_cam_speed, SensitivityTables};
//!
//! let tables = SensitivityTables::default();
//! assert_eq!(joy_pos_to_cam_speed(1.0, &tables.pan, false), 20);
//! assert_eq!(joy_pos_to_cam_speed(-1.0, &tables.pan, false), -20);
//! assert_eq!(joy_pos_to_cam_speed(1.0, &tables.pan, true), -20);
//! assert_eq!(joy_pos_to_cam_speed(0.02, &tables.pan, false), 0);
//! ```

use serde::Deserialize;
use tracing::trace;

/// Piecewise-linear mapping from axis magnitude to camera speed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensitivityCurve {
    /// Joystick breakpoints, ascending, within `0.0..=1.0`.
    pub joy: Vec<f32>,
    /// Camera speed at each joystick breakpoint.
    pub cam: Vec<f32>,
}

impl SensitivityCurve {
    #[must_use]
    pub fn new(joy: Vec<f32>, cam: Vec<f32>) -> Self {
        Self { joy, cam }
    }

    /// Checks the curve is usable. Returns a description of the first problem.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.joy.is_empty() {
            return Err("curve must have at least one breakpoint".to_string());
        }
        if self.joy.len() != self.cam.len() {
            return Err(format!(
                "joy and cam must have the same length ({} != {})",
                self.joy.len(),
                self.cam.len()
            ));
        }
        if self.joy.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err("joy breakpoints must be within 0.0 and 1.0".to_string());
        }
        if self.joy.windows(2).any(|w| w[1] < w[0]) {
            return Err("joy breakpoints must be ascending".to_string());
        }
        Ok(())
    }

    /// Interpolates `position` along the curve, clamping outside the breakpoints.
    #[must_use]
    pub fn interpolate(&self, position: f32) -> f32 {
        let (Some(&first_joy), Some(&last_joy)) = (self.joy.first(), self.joy.last()) else {
            return 0.0;
        };
        let first_cam = self.cam.first().copied().unwrap_or(0.0);
        let last_cam = self.cam.last().copied().unwrap_or(0.0);

        if position <= first_joy {
            return first_cam;
        }
        if position >= last_joy {
            return last_cam;
        }

        for (joy, cam) in self.joy.windows(2).zip(self.cam.windows(2)) {
            let (x0, x1) = (joy[0], joy[1]);
            if position < x1 {
                if x1 <= x0 {
                    return cam[1];
                }
                let t = (position - x0) / (x1 - x0);
                return cam[0] + t * (cam[1] - cam[0]);
            }
        }
        last_cam
    }
}

/// The four named curves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensitivityTables {
    #[serde(default = "default_pan")]
    pub pan: SensitivityCurve,
    #[serde(default = "default_tilt")]
    pub tilt: SensitivityCurve,
    #[serde(default = "default_zoom")]
    pub zoom: SensitivityCurve,
    #[serde(default = "default_focus")]
    pub focus: SensitivityCurve,
}

fn default_pan() -> SensitivityCurve {
    SensitivityCurve::new(vec![0.0, 0.05, 0.3, 0.7, 0.9, 1.0], vec![0.0, 0.0, 2.0, 8.0, 15.0, 20.0])
}

fn default_tilt() -> SensitivityCurve {
    SensitivityCurve::new(vec![0.0, 0.07, 0.3, 0.65, 0.85, 1.0], vec![0.0, 0.0, 3.0, 6.0, 14.0, 18.0])
}

fn default_zoom() -> SensitivityCurve {
    SensitivityCurve::new(vec![0.0, 0.1, 1.0], vec![0.0, 0.0, 7.0])
}

fn default_focus() -> SensitivityCurve {
    SensitivityCurve::new(vec![0.0, 0.1, 1.0], vec![0.0, 0.0, 7.0])
}

impl Default for SensitivityTables {
    fn default() -> Self {
        Self {
            pan: default_pan(),
            tilt: default_tilt(),
            zoom: default_zoom(),
            focus: default_focus(),
        }
    }
}

impl SensitivityTables {
    /// Named access, for configuration errors and logging.
    #[must_use]
    pub fn iter(&self) -> [(&'static str, &SensitivityCurve); 4] {
        [
            ("pan", &self.pan),
            ("tilt", &self.tilt),
            ("zoom", &self.zoom),
            ("focus", &self.focus),
        ]
    }
}

/// Converts an axis position (`-1.0..=1.0`) to a signed camera speed.
///
/// The sign follows the position; `invert` flips it.
#[must_use]
pub fn joy_pos_to_cam_speed(position: f32, curve: &SensitivityCurve, invert: bool) -> i32 {
    let mut sign = if position >= 0.0 { 1 } else { -1 };
    if invert {
        sign = -sign;
    }
    let speed = sign * curve.interpolate(position.abs()).round() as i32;
    trace!("joystick: {} -> {}", position, speed);
    speed
}
