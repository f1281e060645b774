//! Field translator: uniform field and gradient commands to per-coil writes.
//!
//! Each axis is driven by a pair of coils with individual calibration
//! factors. A uniform field drives both coils of the pair with the same
//! desired flux density divided by each coil's own factor (field-matched,
//! not current-matched). A gradient command drives only one coil of the
//! pair, producing a pulling force; the commanded value is a measure of coil
//! current, not actual field strength.
//!
//! The last-commanded `{x, y, z}` is cached for plot/GUI readers. It is
//! written only from the routine execution context; readers get an
//! eventually-consistent snapshot through relaxed atomics.

use crate::config::{CoilChannel, CoilSettings};
use crate::hardware::AnalogOutput;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One axis of the triaxial array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// X axis coil pair.
    X,
    /// Y axis coil pair.
    Y,
    /// Z axis coil pair.
    Z,
}

/// Last-commanded uniform field, in mT.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSnapshot {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

/// Translates field commands into analog-output writes.
///
/// Cheap to clone; clones share the DAC handle and the cached field state.
#[derive(Clone)]
pub struct FieldDriver {
    dac: Arc<dyn AnalogOutput>,
    coils: CoilSettings,
    cached: Arc<[AtomicU64; 3]>,
}

impl FieldDriver {
    /// Creates a driver over `dac` with the given coil calibration.
    pub fn new(dac: Arc<dyn AnalogOutput>, coils: CoilSettings) -> Self {
        Self {
            dac,
            coils,
            cached: Arc::new([AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)]),
        }
    }

    fn pair(&self, axis: Axis) -> (CoilChannel, CoilChannel) {
        match axis {
            Axis::X => (self.coils.x_pos, self.coils.x_neg),
            Axis::Y => (self.coils.y_pos, self.coils.y_neg),
            Axis::Z => (self.coils.z_pos, self.coils.z_neg),
        }
    }

    fn store(&self, axis: Axis, mt: f64) {
        self.cached[axis as usize].store(mt.to_bits(), Ordering::Relaxed);
    }

    fn load(&self, axis: Axis) -> f64 {
        f64::from_bits(self.cached[axis as usize].load(Ordering::Relaxed))
    }

    /// Commands a uniform field on one axis, driving both coils of the pair.
    pub fn set_axis(&self, axis: Axis, mt: f64) {
        let (pos, neg) = self.pair(axis);
        self.dac.write(pos.pin, mt / pos.mt_per_volt);
        self.dac.write(neg.pin, mt / neg.mt_per_volt);
        self.store(axis, mt);
    }

    /// Commands the X component of a uniform field.
    pub fn set_x(&self, mt: f64) {
        self.set_axis(Axis::X, mt);
    }

    /// Commands the Y component of a uniform field.
    pub fn set_y(&self, mt: f64) {
        self.set_axis(Axis::Y, mt);
    }

    /// Commands the Z component of a uniform field.
    pub fn set_z(&self, mt: f64) {
        self.set_axis(Axis::Z, mt);
    }

    /// Commands all three components of a uniform field.
    pub fn set_xyz(&self, x_mt: f64, y_mt: f64, z_mt: f64) {
        self.set_x(x_mt);
        self.set_y(y_mt);
        self.set_z(z_mt);
    }

    /// Commands a single-axis gradient by energizing one coil of the pair:
    /// the positive side for `mt > 0`, the negative side otherwise.
    ///
    /// Gradient mode and uniform mode share the same coil pair and cannot be
    /// superposed per axis, so the cached uniform value of `axis` is reset
    /// to 0.
    pub fn set_gradient(&self, axis: Axis, mt: f64) {
        let (pos, neg) = self.pair(axis);
        if mt > 0.0 {
            self.dac.write(pos.pin, mt / pos.mt_per_volt);
        } else {
            self.dac.write(neg.pin, mt / neg.mt_per_volt);
        }
        self.store(axis, 0.0);
    }

    /// Drives a single coil directly, bypassing the uniform-field cache.
    ///
    /// Used by replay and formula routines that prescribe per-coil values.
    pub fn drive_coil(&self, axis: Axis, positive_side: bool, mt: f64) {
        let (pos, neg) = self.pair(axis);
        let ch = if positive_side { pos } else { neg };
        self.dac.write(ch.pin, mt / ch.mt_per_volt);
    }

    /// Overwrites the cached field state without touching the hardware.
    ///
    /// Routines that drive coils individually use this to keep the plotting
    /// snapshot meaningful (per-axis sums of the coil values).
    pub fn store_cached(&self, x_mt: f64, y_mt: f64, z_mt: f64) {
        self.store(Axis::X, x_mt);
        self.store(Axis::Y, y_mt);
        self.store(Axis::Z, z_mt);
    }

    /// Eventually-consistent snapshot of the last-commanded uniform field.
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            x: self.load(Axis::X),
            y: self.load(Axis::Y),
            z: self.load(Axis::Z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hardware::MockDac;

    fn driver() -> (Arc<MockDac>, FieldDriver) {
        let settings = Settings::new(None).expect("defaults");
        let dac = Arc::new(MockDac::new());
        let driver = FieldDriver::new(dac.clone(), settings.coils);
        (dac, driver)
    }

    #[test]
    fn test_uniform_field_drives_both_coils_field_matched() {
        let (dac, driver) = driver();
        driver.set_x(10.0);

        // Same mT through each coil's own factor, not the same voltage.
        assert_eq!(dac.last_written(5), Some(10.0 / 4.433));
        assert_eq!(dac.last_written(1), Some(10.0 / 5.024));
        assert_eq!(driver.snapshot().x, 10.0);
    }

    #[test]
    fn test_gradient_drives_single_coil_by_sign() {
        let (dac, driver) = driver();
        driver.set_gradient(Axis::Y, 6.0);
        assert_eq!(dac.last_written(2), Some(6.0 / 5.224)); // positive side
        assert_eq!(dac.last_written(6), None);

        driver.set_gradient(Axis::Y, -6.0);
        assert_eq!(dac.last_written(6), Some(-6.0 / 5.224)); // negative side
    }

    #[test]
    fn test_gradient_zeroes_cached_axis_and_leaves_others() {
        let (_dac, driver) = driver();
        driver.set_xyz(1.0, 2.0, 3.0);

        driver.set_gradient(Axis::X, 5.0);
        let snap = driver.snapshot();
        assert_eq!(snap.x, 0.0);
        assert_eq!(snap.y, 2.0);
        assert_eq!(snap.z, 3.0);

        driver.set_gradient(Axis::X, -5.0);
        let snap = driver.snapshot();
        assert_eq!(snap.x, 0.0);
        assert_eq!(snap.y, 2.0);
        assert_eq!(snap.z, 3.0);
    }

    #[test]
    fn test_store_cached_does_not_write_hardware() {
        let (dac, driver) = driver();
        driver.store_cached(1.0, 1.5, -2.0);
        assert_eq!(dac.write_count(), 0);
        assert_eq!(
            driver.snapshot(),
            FieldSnapshot { x: 1.0, y: 1.5, z: -2.0 }
        );
    }
}
