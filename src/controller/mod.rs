//! # Controller Module
//!
//! Joystick and game-controller input engine.
//!
//! This module handles:
//! - Device profiles mapping raw indices to camera-control functions
//! - Button debounce with double-click and long-press detection
//! - Hats as eight-way preset buttons
//! - Dead-zone filtering and sensitivity curves for analog axes
//! - Joystick discovery via evdev, hot-plug and the input task

pub mod axis;
pub mod button;
pub mod hat;
pub mod joystick;
pub mod mapper;
pub mod profile;
pub mod session;
pub mod speed;
pub mod task;
