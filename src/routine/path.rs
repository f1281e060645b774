//! Closed-loop waypoint following.
//!
//! Two routines share the controller here: `swimmerPathFollowing` traverses
//! an "M"-shaped waypoint list once, and `swimmerBenchmark` shuttles between
//! two points while stepping through a frequency sweep. Positions are image
//! coordinates (pixels, y down), so headings are computed with a negated y
//! to get conventional angles.

use super::osc::{cosd, normalize_angle, sind};
use super::RoutineContext;
use crate::vision::{Overlay, TrackedPosition};
use log::{info, warn};
use std::f64::consts::TAU;
use std::time::Instant;

/// Waypoint list plus the thresholds that govern traversal.
#[derive(Clone, Debug)]
pub struct PathPlan {
    /// Goal points in image pixels.
    pub goals: Vec<(f64, f64)>,
    /// Distance at which a goal counts as reached.
    pub tolerance: f64,
    /// Deviation from the reference segment beyond which the controller
    /// steers straight back to the path.
    pub deviation_threshold: f64,
    /// Wrap to the first goal after the last instead of finishing.
    pub cyclic: bool,
}

impl PathPlan {
    /// Builds a plan from positions normalized to [0, 1] over an image of
    /// `width` x `height` pixels. Goals are truncated to whole pixels the
    /// same way the overlays draw them.
    pub fn from_normalized(
        points: &[(f64, f64)],
        width: u32,
        height: u32,
        tolerance: f64,
        deviation_threshold: f64,
        cyclic: bool,
    ) -> Self {
        let goals = points
            .iter()
            .map(|&(nx, ny)| {
                (
                    (f64::from(width) * nx).trunc(),
                    (f64::from(height) * ny).trunc(),
                )
            })
            .collect();
        PathPlan {
            goals,
            tolerance,
            deviation_threshold,
            cyclic,
        }
    }
}

/// One controller update.
#[derive(Clone, Copy, Debug)]
pub struct Steering {
    /// Commanded heading in degrees, conventional orientation.
    pub heading_deg: f64,
    /// Magnitude scale; drops to 0.5 close to the goal.
    pub scale: f64,
    /// Index of the goal reached on this update, if any.
    pub reached: Option<usize>,
    /// The last goal of a one-shot plan was reached.
    pub finished: bool,
}

/// Steers toward the current goal while correcting back onto the reference
/// segment from the previous goal.
pub struct PathController {
    plan: PathPlan,
    state: usize,
}

impl PathController {
    /// Starts at the first goal of `plan`.
    pub fn new(plan: PathPlan) -> Self {
        PathController { plan, state: 0 }
    }

    /// Current goal point.
    pub fn goal(&self) -> (f64, f64) {
        self.plan.goals[self.state]
    }

    /// All goal points, for overlay drawing.
    pub fn goals(&self) -> &[(f64, f64)] {
        &self.plan.goals
    }

    /// Updates the controller with the measured position and returns the
    /// steering command.
    pub fn tick(&mut self, x: f64, y: f64) -> Steering {
        let (goal_x, goal_y) = self.plan.goals[self.state];
        let (prev_x, prev_y) = if self.state > 0 {
            self.plan.goals[self.state - 1]
        } else {
            (goal_x, goal_y)
        };

        let distance = distance_between(x, y, goal_x, goal_y);
        let (foot_x, foot_y) = perpendicular_foot(x, y, prev_x, prev_y, goal_x, goal_y);
        let deviation = distance_between(x, y, foot_x, foot_y);

        let heading_deg = if deviation > self.plan.deviation_threshold {
            // Way off the path: head straight for the foot point.
            (-(foot_y - y)).atan2(foot_x - x).to_degrees()
        } else {
            let to_goal = (-(goal_y - y)).atan2(goal_x - x);
            let to_foot = (-(foot_y - y)).atan2(foot_x - x);
            let correction = if self.plan.deviation_threshold > 0.0 {
                normalize_angle(to_foot - to_goal) * deviation / self.plan.deviation_threshold
            } else {
                0.0
            };
            (to_goal + correction).to_degrees()
        };

        let scale = if distance <= self.plan.tolerance * 3.0 {
            0.5
        } else {
            1.0
        };

        let mut reached = None;
        let mut finished = false;
        if distance <= self.plan.tolerance {
            reached = Some(self.state);
            self.state += 1;
            if self.state == self.plan.goals.len() {
                if self.plan.cyclic {
                    self.state = 0;
                } else {
                    finished = true;
                }
            }
        }

        Steering {
            heading_deg,
            scale,
            reached,
            finished,
        }
    }
}

fn distance_between(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

/// Foot of the perpendicular from (px, py) onto the infinite line through
/// (x1, y1) and (x2, y2). A degenerate segment projects onto its point.
fn perpendicular_foot(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let (dx, dy) = (x2 - x1, y2 - y1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (x1, y1);
    }
    let t = ((px - x1) * dx + (py - y1) * dy) / len_sq;
    (x1 + t * dx, y1 + t * dy)
}

/// Rotating-field composition for corkscrew swimming: in-plane component
/// along `heading_deg`, out-of-plane component in quadrature.
fn swimming_field(t: f64, freq: f64, magnitude: f64, heading_deg: f64) -> (f64, f64, f64) {
    let theta = TAU * freq * t;
    (
        magnitude * theta.cos() * cosd(heading_deg),
        magnitude * theta.cos() * sind(heading_deg),
        magnitude * theta.sin(),
    )
}

fn draw_tracking_overlays(ctx: &RoutineContext, controller: &PathController, x: f64, y: f64) {
    let (goal_x, goal_y) = controller.goal();
    ctx.vision.clear_overlays();
    ctx.vision.add_overlay(Overlay::ClosedPath {
        points: controller
            .goals()
            .iter()
            .map(|&(x, y)| TrackedPosition { x, y })
            .collect(),
    });
    ctx.vision.add_overlay(Overlay::Circle {
        x: goal_x,
        y: goal_y,
        radius: 5.0,
    });
    ctx.vision.add_overlay(Overlay::Line {
        x1: x,
        y1: y,
        x2: goal_x,
        y2: goal_y,
    });
}

// "M"-shaped demonstration path over a 640x480 image.
const PATH_POINTS: [(f64, f64); 7] = [
    (0.2, 0.7),
    (0.3, 0.3),
    (0.4, 0.3),
    (0.5, 0.7),
    (0.6, 0.3),
    (0.7, 0.3),
    (0.8, 0.7),
];

/// One-shot traversal of the "M" path.
///
/// Params: frequency, magnitude, heading bias (deg). Records video on every
/// feed for the duration of the run.
pub(super) async fn path_following(ctx: &RoutineContext) {
    ctx.vision.start_recording("path");

    let plan = PathPlan::from_normalized(&PATH_POINTS, 640, 480, 10.0, 30.0, false);
    let mut controller = PathController::new(plan);
    let mut ticker = ctx.ticker();
    let start = Instant::now();

    loop {
        ticker.tick().await;
        if ctx.stopped() {
            break;
        }
        let Some(pos) = ctx.vision.position() else {
            warn!("No valid position from any feed");
            continue;
        };

        draw_tracking_overlays(ctx, &controller, pos.x, pos.y);
        let steering = controller.tick(pos.x, pos.y);
        if let Some(index) = steering.reached {
            info!("Step to point {}", index + 1);
        }
        if steering.finished {
            info!("Path following complete");
            break;
        }

        let p = ctx.params();
        let t = start.elapsed().as_secs_f64();
        let (bx, by, bz) = swimming_field(
            t,
            p[0],
            steering.scale * p[1],
            steering.heading_deg + p[2],
        );
        ctx.field.set_xyz(bx, by, bz);
    }

    ctx.vision.stop_recording();
}

// Frequency sweep for the velocity benchmark. The first entry only drives
// the approach to the home point; the sweep proper starts at index 1.
const BENCHMARK_SWEEP: [f64; 7] = [-23.0, -23.0, -25.0, -27.0, -29.0, -31.0, -33.0];
const BENCHMARK_MAGNITUDE: f64 = 8.0;

/// Velocity benchmark: shuttles between two diagonal points, stepping to the
/// next sweep frequency each time the home point is re-reached.
///
/// Params: heading bias (deg).
pub(super) async fn benchmark(ctx: &RoutineContext) {
    ctx.vision.start_recording("benchmark");

    // Direct pursuit: infinite deviation threshold disables the
    // path-correction term.
    let plan = PathPlan::from_normalized(
        &[(0.2, 0.2), (0.8, 0.8)],
        640,
        480,
        20.0,
        f64::INFINITY,
        true,
    );
    let mut controller = PathController::new(plan);
    let mut sweep_index = 0usize;
    let mut ticker = ctx.ticker();
    let start = Instant::now();

    info!(
        "Moving to the home position at {} Hz",
        BENCHMARK_SWEEP[sweep_index]
    );

    loop {
        ticker.tick().await;
        if ctx.stopped() {
            break;
        }
        let Some(pos) = ctx.vision.position() else {
            warn!("No valid position from any feed");
            continue;
        };

        draw_tracking_overlays(ctx, &controller, pos.x, pos.y);
        let steering = controller.tick(pos.x, pos.y);
        if steering.reached == Some(0) {
            sweep_index += 1;
            if sweep_index == BENCHMARK_SWEEP.len() {
                info!("Benchmark complete");
                break;
            }
            info!(
                "Case {} at {} Hz",
                sweep_index, BENCHMARK_SWEEP[sweep_index]
            );
        }

        let t = start.elapsed().as_secs_f64();
        let (bx, by, bz) = swimming_field(
            t,
            BENCHMARK_SWEEP[sweep_index],
            BENCHMARK_MAGNITUDE,
            steering.heading_deg + ctx.param(0),
        );
        ctx.field.set_xyz(bx, by, bz);
    }

    ctx.vision.stop_recording();
}
