//! Overlay drawing demo.
//!
//! Exercises the overlay pipeline without object detection: every tick it
//! clears and redraws a parameterized pattern stencil plus two fixed shapes,
//! while holding the field at zero. Records video on every feed.

use super::RoutineContext;
use crate::vision::Overlay;
use log::info;

/// Params: slot 0 pattern ID, slot 1 offsetX, slot 2 offsetY, slot 3 scale.
pub(super) async fn drawing(ctx: &RoutineContext) {
    ctx.vision.start_recording("drawing");

    let mut ticker = ctx.ticker();
    loop {
        ticker.tick().await;
        if ctx.stopped() {
            info!("Stopping drawing demo and saving recordings");
            ctx.vision.stop_recording();
            return;
        }

        let p = ctx.params();
        ctx.vision.clear_overlays();
        ctx.vision.add_overlay(Overlay::Pattern {
            id: p[0] as i64,
            offset_x: p[1],
            offset_y: p[2],
            scale: p[3],
        });
        ctx.vision.add_overlay(Overlay::Circle {
            x: 420.0,
            y: 330.0,
            radius: 55.0,
        });
        ctx.vision.add_overlay(Overlay::Arrow {
            x1: 0.0,
            y1: 0.0,
            x2: 325.0,
            y2: 325.0,
        });

        ctx.field.set_xyz(0.0, 0.0, 0.0);
    }
}
