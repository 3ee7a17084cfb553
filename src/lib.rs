//! # VISCA Joystick Library
//!
//! Drive PTZ cameras from a USB joystick or game controller.
//!
//! This library turns raw evdev input into camera-control functions (pan/tilt,
//! zoom, focus, presets, camera selection) and relays VISCA-over-IP traffic
//! between an external controller and the currently selected camera.

pub mod actions;
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod relay;
