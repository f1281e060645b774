//! Control routine catalog and dispatch.
//!
//! Every routine is one variant of the [`Routine`] enum, dispatched through a
//! single `match` in [`Routine::run`]. Name lookup falls back to
//! [`Routine::Unknown`], whose body logs a diagnostic and returns
//! immediately; selecting an unrecognized name never faults the engine.
//!
//! Routine bodies follow one shape: a loop that ticks at the configured
//! minimum period, checks the stop flag at the top of every iteration, reads
//! the parameter vector, and commands the field translator. Bodies never
//! block in a way that starves stop-flag polling; in particular the
//! closed-loop routines keep ticking (and keep checking the flag) while the
//! vision hub reports no detection.

pub mod drawing;
pub mod gripper;
pub mod osc;
pub mod path;
pub mod registry;
pub mod replay;
pub mod waves;

use crate::engine::{SharedControl, PARAM_SLOTS};
use crate::field::FieldDriver;
use crate::gamepad::Gamepad;
use crate::vision::VisionHub;
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Everything a routine body needs for one run.
///
/// Handed to the body by the engine at start; dropped when the body returns.
pub struct RoutineContext {
    /// Parameter vector and stop flag shared with the engine.
    pub control: Arc<SharedControl>,
    /// Field translator.
    pub field: FieldDriver,
    /// Position source and overlay sink.
    pub vision: VisionHub,
    /// Manual-input device, when attached.
    pub gamepad: Option<Arc<dyn Gamepad>>,
    /// Minimum control tick period.
    pub tick: Duration,
    /// Replay waveform file for the `fromCSV` routine.
    pub replay_path: PathBuf,
}

impl RoutineContext {
    /// Reads parameter slot `index`.
    pub fn param(&self, index: usize) -> f64 {
        self.control.params.get(index)
    }

    /// Reads all five parameter slots.
    pub fn params(&self) -> [f64; PARAM_SLOTS] {
        self.control.params.snapshot()
    }

    /// Whether a cooperative stop has been requested.
    pub fn stopped(&self) -> bool {
        self.control.stop_requested()
    }

    /// Tick source at the configured period. Missed ticks are skipped, not
    /// replayed in a burst.
    pub fn ticker(&self) -> Interval {
        self.ticker_with(self.tick)
    }

    /// Tick source at a routine-specific period (replay pacing, the fixed
    /// 200 Hz formula loop).
    pub fn ticker_with(&self, period: Duration) -> Interval {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }
}

/// The closed set of control routines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routine {
    /// Precessing cone field.
    TwistField,
    /// Rotating field in the XY plane.
    RotateXy,
    /// Rotating field in the YZ plane.
    RotateYz,
    /// Rotating field in the XZ plane.
    RotateXz,
    /// Sawtooth magnitude oscillation along a fixed direction.
    OscSaw,
    /// Triangle magnitude oscillation.
    OscTriangle,
    /// Square magnitude oscillation.
    OscSquare,
    /// Sine magnitude oscillation.
    OscSin,
    /// Cosine magnitude oscillation.
    OscCos,
    /// In-plane field sweeping between two angle bounds.
    OniCutting,
    /// Three-segment piecewise magnitude/angle profile in the XZ plane.
    Piecewise,
    /// Elliptical rotating field with asymmetric horizontal magnitudes.
    Ellipse,
    /// Overlay drawing demo (zero field).
    Drawing,
    /// Closed-loop waypoint follower over the "M" path.
    PathFollowing,
    /// Closed-loop frequency-sweep benchmark between two points.
    Benchmark,
    /// Manual gripper control via gamepad.
    Gripper,
    /// Replay of a recorded per-coil voltage table.
    ReplayCsv,
    /// Hard-coded formula source.
    FormulaField,
    /// Crawling gait: sawtooth magnitude with a slowly advancing angle.
    CrawlerWalking,
    /// Static in-plane field at a commanded angle.
    XyAngle,
    /// Fallback for unrecognized names; logs and returns.
    Unknown,
}

impl Routine {
    /// Every selectable routine, in catalog order.
    pub const ALL: [Routine; 20] = [
        Routine::TwistField,
        Routine::RotateXy,
        Routine::RotateYz,
        Routine::RotateXz,
        Routine::OscSaw,
        Routine::OscTriangle,
        Routine::OscSquare,
        Routine::OscSin,
        Routine::OscCos,
        Routine::OniCutting,
        Routine::Piecewise,
        Routine::Ellipse,
        Routine::Drawing,
        Routine::PathFollowing,
        Routine::Benchmark,
        Routine::Gripper,
        Routine::ReplayCsv,
        Routine::FormulaField,
        Routine::CrawlerWalking,
        Routine::XyAngle,
    ];

    /// Maps a routine name to its variant; unrecognized names map to
    /// [`Routine::Unknown`].
    pub fn parse(name: &str) -> Routine {
        match name {
            "twistField" => Routine::TwistField,
            "rotateXY" => Routine::RotateXy,
            "rotateYZ" => Routine::RotateYz,
            "rotateXZ" => Routine::RotateXz,
            "osc_saw" => Routine::OscSaw,
            "osc_triangle" => Routine::OscTriangle,
            "osc_square" => Routine::OscSquare,
            "osc_sin" => Routine::OscSin,
            "osc_cos" => Routine::OscCos,
            "oni_cutting" => Routine::OniCutting,
            "examplePiecewiseFunction" => Routine::Piecewise,
            "ellipse" => Routine::Ellipse,
            "drawing" => Routine::Drawing,
            "swimmerPathFollowing" => Routine::PathFollowing,
            "swimmerBenchmark" => Routine::Benchmark,
            "tianqiGripper" => Routine::Gripper,
            "fromCSV" => Routine::ReplayCsv,
            "formulaControlledField" => Routine::FormulaField,
            "crawler_walking" => Routine::CrawlerWalking,
            "xy_angle" => Routine::XyAngle,
            _ => Routine::Unknown,
        }
    }

    /// The catalog name of this routine.
    pub fn name(&self) -> &'static str {
        match self {
            Routine::TwistField => "twistField",
            Routine::RotateXy => "rotateXY",
            Routine::RotateYz => "rotateYZ",
            Routine::RotateXz => "rotateXZ",
            Routine::OscSaw => "osc_saw",
            Routine::OscTriangle => "osc_triangle",
            Routine::OscSquare => "osc_square",
            Routine::OscSin => "osc_sin",
            Routine::OscCos => "osc_cos",
            Routine::OniCutting => "oni_cutting",
            Routine::Piecewise => "examplePiecewiseFunction",
            Routine::Ellipse => "ellipse",
            Routine::Drawing => "drawing",
            Routine::PathFollowing => "swimmerPathFollowing",
            Routine::Benchmark => "swimmerBenchmark",
            Routine::Gripper => "tianqiGripper",
            Routine::ReplayCsv => "fromCSV",
            Routine::FormulaField => "formulaControlledField",
            Routine::CrawlerWalking => "crawler_walking",
            Routine::XyAngle => "xy_angle",
            Routine::Unknown => "unknown",
        }
    }

    /// Executes the routine body until it observes the stop flag or its own
    /// termination condition. Always returns cleanly.
    pub async fn run(self, ctx: RoutineContext) {
        match self {
            Routine::TwistField => waves::twist_field(&ctx).await,
            Routine::RotateXy => waves::rotate_xy(&ctx).await,
            Routine::RotateYz => waves::rotate_yz(&ctx).await,
            Routine::RotateXz => waves::rotate_xz(&ctx).await,
            Routine::OscSaw => waves::oscillate(&ctx, osc::Waveform::Saw).await,
            Routine::OscTriangle => waves::oscillate(&ctx, osc::Waveform::Triangle).await,
            Routine::OscSquare => waves::oscillate(&ctx, osc::Waveform::Square).await,
            Routine::OscSin => waves::oscillate(&ctx, osc::Waveform::Sin).await,
            Routine::OscCos => waves::oscillate(&ctx, osc::Waveform::Cos).await,
            Routine::OniCutting => waves::oni_cutting(&ctx).await,
            Routine::Piecewise => waves::piecewise(&ctx).await,
            Routine::Ellipse => waves::ellipse(&ctx).await,
            Routine::Drawing => drawing::drawing(&ctx).await,
            Routine::PathFollowing => path::path_following(&ctx).await,
            Routine::Benchmark => path::benchmark(&ctx).await,
            Routine::Gripper => gripper::gripper(&ctx).await,
            Routine::ReplayCsv => replay::replay_csv(&ctx).await,
            Routine::FormulaField => waves::formula_field(&ctx).await,
            Routine::CrawlerWalking => waves::crawler_walking(&ctx).await,
            Routine::XyAngle => waves::xy_angle(&ctx).await,
            Routine::Unknown => {
                warn!("Routine body not defined; returning immediately");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_for_catalog() {
        for routine in Routine::ALL {
            assert_eq!(Routine::parse(routine.name()), routine);
        }
    }

    #[test]
    fn test_parse_falls_back_to_unknown() {
        assert_eq!(Routine::parse("doesNotExist"), Routine::Unknown);
        assert_eq!(Routine::parse(""), Routine::Unknown);
    }
}
