//! Analog output boundary and mock implementation.
//!
//! The control engine never talks to the DAC card directly; it goes through
//! the [`AnalogOutput`] trait so tests and the headless runner can substitute
//! a recording mock. Writes are fire-and-forget: the physical card clips
//! out-of-range voltages itself, so no range checking happens here.

use std::collections::HashMap;
use std::sync::Mutex;

/// A multi-channel analog output device (one voltage per pin).
pub trait AnalogOutput: Send + Sync {
    /// Drives `pin` to `volts`. Fire-and-forget; hardware-level clipping is
    /// the card's responsibility.
    fn write(&self, pin: u8, volts: f64);
}

/// Recording mock DAC for tests and dry runs.
///
/// Stores the full write history and the last value per pin.
#[derive(Default)]
pub struct MockDac {
    inner: Mutex<MockDacState>,
}

#[derive(Default)]
struct MockDacState {
    history: Vec<(u8, f64)>,
    last: HashMap<u8, f64>,
}

impl MockDac {
    /// Creates an empty mock with no recorded writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last voltage written to `pin`, if any.
    pub fn last_written(&self, pin: u8) -> Option<f64> {
        self.inner.lock().ok()?.last.get(&pin).copied()
    }

    /// Complete write history in call order.
    pub fn history(&self) -> Vec<(u8, f64)> {
        self.inner
            .lock()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Number of writes recorded so far.
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|s| s.history.len()).unwrap_or(0)
    }

    /// Clears the recorded history (last-per-pin values included).
    pub fn reset(&self) {
        if let Ok(mut s) = self.inner.lock() {
            s.history.clear();
            s.last.clear();
        }
    }
}

impl AnalogOutput for MockDac {
    fn write(&self, pin: u8, volts: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.history.push((pin, volts));
            s.last.insert(pin, volts);
        }
    }
}
