//! Open-loop waveform routine bodies.
//!
//! All of these share one skeleton: tick at the configured period, check the
//! stop flag at loop top, read the parameter vector, command the field. The
//! parameter slots are positional per the registry entry of each routine.

use super::osc::{self, cosd, sind, Waveform};
use super::RoutineContext;
use crate::field::Axis;
use std::f64::consts::{PI, TAU};
use std::time::{Duration, Instant};

/// Rotating field in the XY plane: `Bx = p1·cos(2π·p0·t)`,
/// `By = p2·sin(2π·p0·t)`.
pub(super) async fn rotate_xy(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let theta = TAU * p[0] * start.elapsed().as_secs_f64();
        ctx.field.set_xyz(p[1] * theta.cos(), p[2] * theta.sin(), 0.0);
    }
}

/// Rotating field in the YZ plane.
pub(super) async fn rotate_yz(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let theta = TAU * p[0] * start.elapsed().as_secs_f64();
        ctx.field.set_xyz(0.0, p[1] * theta.cos(), p[2] * theta.sin());
    }
}

/// Rotating field in the XZ plane.
pub(super) async fn rotate_xz(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let theta = TAU * p[0] * start.elapsed().as_secs_f64();
        ctx.field.set_xyz(p[1] * theta.cos(), 0.0, p[2] * theta.sin());
    }
}

/// Magnitude oscillation along a fixed direction.
///
/// Params: frequency, bound1, bound2, azimuth (deg), polar (deg). The
/// magnitude follows `wave` between the bounds; the direction is fixed by
/// the two angles.
pub(super) async fn oscillate(ctx: &RoutineContext, wave: Waveform) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let magnitude = osc::osc_between(t, wave, p[0], p[1], p[2]);
        let (azimuth, polar) = (p[3], p[4]);
        ctx.field.set_xyz(
            magnitude * cosd(polar) * cosd(azimuth),
            magnitude * cosd(polar) * sind(azimuth),
            magnitude * sind(polar),
        );
    }
}

/// Precessing cone field.
///
/// Params: frequency, magnitude, azimuthal angle, polar angle, span angle.
/// The field traces a cone of half-angle `span/2` about an axis oriented by
/// the azimuthal and polar angles, precessing at the commanded frequency.
pub(super) async fn twist_field(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let (wt_cos, wt_sin) = {
            let wt = TAU * p[0] * t;
            (wt.cos(), wt.sin())
        };
        let (azim, polar, half_span) = (p[2], p[3], p[4] * 0.5);

        let bx = p[1]
            * (cosd(azim) * cosd(polar) * cosd(90.0 - half_span) * wt_cos
                - sind(azim) * cosd(90.0 - half_span) * wt_sin
                + cosd(azim) * sind(polar) * cosd(half_span));
        let by = p[1]
            * (sind(azim) * cosd(polar) * cosd(90.0 - half_span) * wt_cos
                + cosd(azim) * cosd(90.0 - half_span) * wt_sin
                + sind(azim) * sind(polar) * cosd(half_span));
        let bz = p[1]
            * (-sind(polar) * cosd(90.0 - half_span) * wt_cos + cosd(polar) * cosd(half_span));
        ctx.field.set_xyz(bx, by, bz);
    }
}

/// In-plane field whose angle sweeps sinusoidally between two bounds.
///
/// Params: frequency, magnitude, angle bound1 (deg), angle bound2 (deg).
pub(super) async fn oni_cutting(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let angle = osc::osc_between(t, Waveform::Sin, p[0], p[2], p[3]);
        ctx.field
            .set_xyz(p[1] * cosd(angle), p[1] * sind(angle), 0.0);
    }
}

/// Three-segment piecewise profile in the XZ plane.
///
/// Params: frequency, magnitude, angle (deg), period1 (0-1), period2 (0-1).
/// Time is normalized into [0, 1) so the shape is frequency-independent:
/// ramp up at 180°, swing from 180° to the commanded angle, ramp down.
pub(super) async fn piecewise(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let norm_t = osc::normalize_time(start.elapsed().as_secs_f64(), p[0]);
        let (magnitude, angle) = if norm_t < p[3] {
            (p[1] / p[3] * norm_t, 180.0)
        } else if norm_t < p[4] {
            (p[1], (180.0 - p[2]) / (p[3] - p[4]) * (norm_t - p[3]) + 180.0)
        } else {
            (p[1] / (p[4] - 1.0) * (norm_t - 1.0), p[2])
        };
        ctx.field
            .set_xyz(magnitude * sind(angle), 0.0, magnitude * cosd(angle));
    }
}

/// Elliptical rotating field with asymmetric horizontal magnitudes.
///
/// Params: frequency, azimuth (deg), B_horzF, B_vert, B_horzB. The forward
/// horizontal magnitude applies in the first half period, the backward one
/// in the second.
pub(super) async fn ellipse(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let theta = TAU * p[0] * t;
        let norm_t = osc::normalize_time(t, p[0]);
        let b_horz = if norm_t < 0.5 {
            p[2] * theta.cos()
        } else {
            p[4] * theta.cos()
        };
        ctx.field.set_xyz(
            b_horz * cosd(p[1]),
            b_horz * sind(p[1]),
            p[3] * theta.sin(),
        );
    }
}

/// Crawling gait: sawtooth magnitude with an angle creeping from π by π/4
/// over each period.
///
/// Params: Bmax (mT), frequency (Hz), Y scale.
pub(super) async fn crawler_walking(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let phase = osc::normalize_time(t, p[1]);
        let b0 = phase * p[0];
        let theta = PI + phase * PI / 4.0;
        ctx.field
            .set_xyz(b0 * theta.cos(), b0 * p[2] * theta.sin(), 0.0);
    }
}

/// Static in-plane field: magnitude p0 at angle p1 (deg).
pub(super) async fn xy_angle(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let p = ctx.params();
        ctx.field
            .set_xyz(p[0] * cosd(p[1]), p[0] * sind(p[1]), 0.0);
    }
}

/// Hard-coded formula source: a 1 Hz sine on X split evenly across both
/// coils of the pair, at a fixed 200 Hz update rate. Used for bring-up and
/// coil verification, so it drives the coils individually instead of going
/// through the uniform-field path.
pub(super) async fn formula_field(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker_with(Duration::from_millis(5));
    let start = Instant::now();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            return;
        }
        let t = start.elapsed().as_secs_f64();
        let x = (PI * t).sin();
        let (y, z) = (0.0, 0.0);

        for (axis, total) in [(Axis::X, x), (Axis::Y, y), (Axis::Z, z)] {
            ctx.field.drive_coil(axis, true, total / 2.0);
            ctx.field.drive_coil(axis, false, total / 2.0);
        }
        ctx.field.store_cached(x, y, z);
    }
}
