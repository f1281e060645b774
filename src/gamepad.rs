//! Manual-input boundary.
//!
//! Device polling lives outside this crate; routines that take manual input
//! (the gripper modes) see the controller only through the [`Gamepad`]
//! trait. The device is optional at runtime and may be absent.

use std::sync::Mutex;

/// Buttons the control routines react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    /// Standby mode select.
    Cross,
    /// Grasp mode select.
    Circle,
    /// Automatic transport mode select.
    Triangle,
    /// Manual transport mode select / phase step.
    Square,
    /// Phase step direction modifier.
    L1,
    /// Z-field sign flip.
    R1,
}

/// Analog axes the control routines read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StickAxis {
    /// Right trigger, raw value in [-1, 1]; scales field magnitude.
    R2,
}

/// Polled manual-input device.
pub trait Gamepad: Send + Sync {
    /// Whether `button` is currently held.
    fn is_pressed(&self, button: Button) -> bool;

    /// Raw analog axis value in [-1, 1].
    fn axis_value(&self, axis: StickAxis) -> f64;

    /// Left-stick tilt (polar angle) in degrees.
    fn tilt_angle(&self) -> f64;

    /// Left-stick azimuth in degrees.
    fn azimuth_angle(&self) -> f64;
}

/// Settable gamepad double for tests.
#[derive(Default)]
pub struct MockGamepad {
    state: Mutex<MockGamepadState>,
}

#[derive(Default)]
struct MockGamepadState {
    pressed: Vec<Button>,
    r2: f64,
    tilt: f64,
    azimuth: f64,
}

impl MockGamepad {
    /// Creates a pad with nothing pressed and all axes centered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the currently held buttons.
    pub fn press(&self, buttons: &[Button]) {
        if let Ok(mut s) = self.state.lock() {
            s.pressed = buttons.to_vec();
        }
    }

    /// Sets the R2 trigger value.
    pub fn set_r2(&self, value: f64) {
        if let Ok(mut s) = self.state.lock() {
            s.r2 = value;
        }
    }

    /// Sets left-stick tilt and azimuth in degrees.
    pub fn set_stick(&self, tilt_deg: f64, azimuth_deg: f64) {
        if let Ok(mut s) = self.state.lock() {
            s.tilt = tilt_deg;
            s.azimuth = azimuth_deg;
        }
    }
}

impl Gamepad for MockGamepad {
    fn is_pressed(&self, button: Button) -> bool {
        self.state
            .lock()
            .map(|s| s.pressed.contains(&button))
            .unwrap_or(false)
    }

    fn axis_value(&self, axis: StickAxis) -> f64 {
        match axis {
            StickAxis::R2 => self.state.lock().map(|s| s.r2).unwrap_or(0.0),
        }
    }

    fn tilt_angle(&self) -> f64 {
        self.state.lock().map(|s| s.tilt).unwrap_or(0.0)
    }

    fn azimuth_angle(&self) -> f64 {
        self.state.lock().map(|s| s.azimuth).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_gamepad_state() {
        let pad = MockGamepad::new();
        assert!(!pad.is_pressed(Button::Circle));

        pad.press(&[Button::Circle, Button::L1]);
        assert!(pad.is_pressed(Button::Circle));
        assert!(pad.is_pressed(Button::L1));
        assert!(!pad.is_pressed(Button::Cross));

        pad.set_r2(-1.0);
        assert_eq!(pad.axis_value(StickAxis::R2), -1.0);

        pad.set_stick(45.0, 90.0);
        assert_eq!(pad.tilt_angle(), 45.0);
        assert_eq!(pad.azimuth_angle(), 90.0);
    }
}
