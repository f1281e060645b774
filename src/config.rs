//! Application settings loaded from defaults, an optional TOML file, and
//! environment overrides.
//!
//! Uses the `config` crate with the layering order defaults < file < env
//! (prefix `MAGSTEER_`, `__` as separator), then deserializes into the typed
//! [`Settings`] struct and runs semantic validation. Coil calibration
//! defaults match the deployed rig.

use crate::error::{AppResult, SteerError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// One analog output channel driving a single coil.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct CoilChannel {
    /// DAC pin number wired to this coil.
    pub pin: u8,
    /// Calibration factor in mT per volt at the workspace center.
    pub mt_per_volt: f64,
}

/// Pin assignment and calibration for all six coils.
///
/// Each axis has a positive-side and a negative-side coil. Both are driven
/// for a uniform field; only one at a time for a gradient.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct CoilSettings {
    /// X axis, positive side.
    pub x_pos: CoilChannel,
    /// X axis, negative side.
    pub x_neg: CoilChannel,
    /// Y axis, positive side.
    pub y_pos: CoilChannel,
    /// Y axis, negative side.
    pub y_neg: CoilChannel,
    /// Z axis, positive side.
    pub z_pos: CoilChannel,
    /// Z axis, negative side.
    pub z_neg: CoilChannel,
}

/// Control engine scheduling and channel sizing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EngineSettings {
    /// Minimum control tick period in milliseconds. Also paces the retry
    /// cadence when no vision feed reports a detection.
    pub tick_period_ms: u64,
    /// Capacity of the engine command channel.
    pub command_channel_capacity: usize,
    /// Capacity of the engine event broadcast channel.
    pub event_channel_capacity: usize,
}

/// Replay source configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ReplaySettings {
    /// Path to the recorded per-coil voltage table.
    pub waveform_path: PathBuf,
}

/// Top-level application settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Settings {
    /// Engine scheduling parameters.
    pub engine: EngineSettings,
    /// Coil pin assignment and calibration.
    pub coils: CoilSettings,
    /// Replay source configuration.
    pub replay: ReplaySettings,
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file, and the
    /// environment, then validates them.
    pub fn new(config_path: Option<&str>) -> AppResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("engine.tick_period_ms", 5)?
            .set_default("engine.command_channel_capacity", 32)?
            .set_default("engine.event_channel_capacity", 16)?
            // Pin number and calibration factor (mT/V) per coil, as measured
            // on the rig.
            .set_default("coils.x_pos.pin", 5)?
            .set_default("coils.x_pos.mt_per_volt", 4.433)?
            .set_default("coils.x_neg.pin", 1)?
            .set_default("coils.x_neg.mt_per_volt", 5.024)?
            .set_default("coils.y_pos.pin", 2)?
            .set_default("coils.y_pos.mt_per_volt", 5.224)?
            .set_default("coils.y_neg.pin", 6)?
            .set_default("coils.y_neg.mt_per_volt", 5.224)?
            .set_default("coils.z_pos.pin", 3)?
            .set_default("coils.z_pos.mt_per_volt", 4.879)?
            .set_default("coils.z_neg.pin", 7)?
            .set_default("coils.z_neg.mt_per_volt", 5.0)?
            .set_default("replay.waveform_path", "data/waveform.csv")?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MAGSTEER").separator("__"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Control tick period as a [`Duration`].
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.engine.tick_period_ms)
    }

    fn validate(&self) -> AppResult<()> {
        if self.engine.tick_period_ms == 0 {
            return Err(SteerError::Configuration(
                "engine.tick_period_ms must be positive".into(),
            ));
        }
        if self.engine.command_channel_capacity == 0 || self.engine.event_channel_capacity == 0 {
            return Err(SteerError::Configuration(
                "channel capacities must be positive".into(),
            ));
        }

        let channels = self.coils.channels();
        for ch in &channels {
            if ch.mt_per_volt == 0.0 {
                return Err(SteerError::Configuration(format!(
                    "coil on pin {} has a zero calibration factor",
                    ch.pin
                )));
            }
        }
        for (i, a) in channels.iter().enumerate() {
            for b in channels.iter().skip(i + 1) {
                if a.pin == b.pin {
                    return Err(SteerError::Configuration(format!(
                        "two coils share output pin {}",
                        a.pin
                    )));
                }
            }
        }
        Ok(())
    }
}

impl CoilSettings {
    /// All six channels in a fixed order (X+, X-, Y+, Y-, Z+, Z-).
    pub fn channels(&self) -> [CoilChannel; 6] {
        [
            self.x_pos, self.x_neg, self.y_pos, self.y_neg, self.z_pos, self.z_neg,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::new(None).expect("defaults should load");
        assert_eq!(settings.engine.tick_period_ms, 5);
        assert_eq!(settings.coils.x_pos.pin, 5);
        assert!((settings.coils.x_pos.mt_per_volt - 4.433).abs() < 1e-9);
        assert_eq!(settings.coils.z_neg.pin, 7);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "[engine]\ntick_period_ms = 20").expect("write");
        let path = file.path().to_str().expect("utf8 path").to_string();

        let settings = Settings::new(Some(&path)).expect("file should load");
        assert_eq!(settings.engine.tick_period_ms, 20);
        // Untouched sections keep their defaults.
        assert_eq!(settings.coils.y_neg.pin, 6);
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "[coils.x_pos]\npin = 1\nmt_per_volt = 4.4").expect("write");
        let path = file.path().to_str().expect("utf8 path").to_string();

        let err = Settings::new(Some(&path)).expect_err("duplicate pin must fail");
        assert!(err.to_string().contains("share output pin"));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "[engine]\ntick_period_ms = 0").expect("write");
        let path = file.path().to_str().expect("utf8 path").to_string();

        assert!(Settings::new(Some(&path)).is_err());
    }
}
