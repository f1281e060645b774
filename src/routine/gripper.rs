//! Manual gripper control from a gamepad.
//!
//! Four modes selected by the face buttons, a Z-sign flip on R1, and a
//! global magnitude scale from the R2 trigger. Button edges are debounced
//! with a 0.2 s holdoff since the pad is polled every tick.

use super::osc::{cosd, sind};
use super::RoutineContext;
use crate::gamepad::{Button, StickAxis};
use log::{info, warn};
use std::f64::consts::{PI, TAU};
use std::time::Instant;

const BUTTON_HOLDOFF_SECS: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Zero field.
    Standby,
    /// Static field along the left stick direction.
    Grasp,
    /// Continuous rotation about the stick direction.
    TransportAuto,
    /// Phase stepped manually with SQUARE (+L1 reverses).
    TransportManual,
}

/// Params: slot 1 magnitude (mT), slot 2 rotation frequency (Hz).
pub(super) async fn gripper(ctx: &RoutineContext) {
    let Some(pad) = ctx.gamepad.clone() else {
        warn!("No gamepad attached; holding zero field until stop");
        standby_until_stop(ctx).await;
        return;
    };

    let mut ticker = ctx.ticker();
    let start = Instant::now();

    let mut mode = Mode::Standby;
    let mut z_sign = 1.0_f64;
    let mut rotation_offset_time = 0.0;
    let mut rotation_phase = 0.0;
    let mut last_mode_press = 0.0_f64;
    let mut last_r1_press = 0.0_f64;

    loop {
        ticker.tick().await;
        if ctx.stopped() {
            ctx.field.set_xyz(0.0, 0.0, 0.0);
            return;
        }
        let t = start.elapsed().as_secs_f64();

        if t - last_mode_press > BUTTON_HOLDOFF_SECS {
            if pad.is_pressed(Button::Cross) && mode != Mode::Standby {
                last_mode_press = t;
                mode = Mode::Standby;
                info!("[MODE] Standby");
            } else if pad.is_pressed(Button::Circle) && mode != Mode::Grasp {
                last_mode_press = t;
                mode = Mode::Grasp;
                info!("[MODE] Grasp");
            } else if pad.is_pressed(Button::Triangle) && mode != Mode::TransportAuto {
                last_mode_press = t;
                mode = Mode::TransportAuto;
                info!("[MODE] Transport Auto");
                // Continue the rotation from phase zero instead of jumping.
                rotation_offset_time = t;
            } else if pad.is_pressed(Button::Square) && mode != Mode::TransportManual {
                last_mode_press = t;
                mode = Mode::TransportManual;
                info!("[MODE] Transport Manual");
                rotation_phase = PI / 2.0;
            }
        }

        if t - last_r1_press > BUTTON_HOLDOFF_SECS && pad.is_pressed(Button::R1) {
            last_r1_press = t;
            z_sign = -z_sign;
            info!("Z field sign is now {}", z_sign);
        }

        // R2 rests at -1 and reads +1 fully pulled; map to [0, 1] scale
        // with the trigger released meaning full strength.
        let scale = 0.5 * (1.0 - pad.axis_value(StickAxis::R2));

        let magnitude = ctx.param(1);
        let (bx, by, bz) = match mode {
            Mode::Standby => (0.0, 0.0, 0.0),
            Mode::Grasp => {
                let polar = pad.tilt_angle();
                let azimuth = pad.azimuth_angle();
                (
                    magnitude * cosd(polar) * cosd(azimuth),
                    magnitude * cosd(polar) * sind(azimuth),
                    magnitude * sind(polar),
                )
            }
            Mode::TransportAuto => {
                let theta = -TAU * ctx.param(2) * (t - rotation_offset_time) + PI / 2.0;
                let azimuth = pad.azimuth_angle();
                (
                    magnitude * theta.cos() * cosd(azimuth),
                    magnitude * theta.cos() * sind(azimuth),
                    magnitude * theta.sin(),
                )
            }
            Mode::TransportManual => {
                if t - last_mode_press > BUTTON_HOLDOFF_SECS && pad.is_pressed(Button::Square) {
                    last_mode_press = t;
                    let step = PI / 16.0;
                    if pad.is_pressed(Button::L1) {
                        rotation_phase += step;
                    } else {
                        rotation_phase -= step;
                    }
                }
                let azimuth = pad.azimuth_angle();
                (
                    magnitude * rotation_phase.cos() * cosd(azimuth),
                    magnitude * rotation_phase.cos() * sind(azimuth),
                    magnitude * rotation_phase.sin(),
                )
            }
        };

        ctx.field
            .set_xyz(bx * scale, by * scale, bz * scale * z_sign);
    }
}

async fn standby_until_stop(ctx: &RoutineContext) {
    let mut ticker = ctx.ticker();
    loop {
        ticker.tick().await;
        ctx.field.set_xyz(0.0, 0.0, 0.0);
        if ctx.stopped() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Settings;
    use crate::engine::SharedControl;
    use crate::field::FieldDriver;
    use crate::gamepad::{Button, MockGamepad};
    use crate::hardware::MockDac;
    use crate::routine::{Routine, RoutineContext};
    use crate::vision::VisionHub;
    use std::sync::Arc;
    use std::time::Duration;

    fn context(pad: Option<Arc<MockGamepad>>) -> (Arc<MockDac>, RoutineContext) {
        let settings = Settings::new(None).expect("defaults");
        let dac = Arc::new(MockDac::new());
        let ctx = RoutineContext {
            control: Arc::new(SharedControl::default()),
            field: FieldDriver::new(dac.clone(), settings.coils),
            vision: VisionHub::default(),
            gamepad: pad.map(|p| p as _),
            tick: Duration::from_millis(1),
            replay_path: settings.replay.waveform_path.clone(),
        };
        (dac, ctx)
    }

    #[tokio::test]
    async fn test_missing_gamepad_holds_zero_field() {
        let (dac, ctx) = context(None);
        ctx.control.params.set(1, 15.0);
        let control = ctx.control.clone();
        let body = tokio::spawn(async move { Routine::Gripper.run(ctx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        control.request_stop();
        body.await.expect("body");

        assert!(dac.write_count() > 0);
        for pin in [5u8, 1, 2, 6, 3, 7] {
            assert_eq!(dac.last_written(pin), Some(0.0), "pin {pin} not zeroed");
        }
    }

    #[tokio::test]
    async fn test_grasp_mode_follows_stick_direction() {
        let pad = Arc::new(MockGamepad::new());
        pad.press(&[Button::Circle]);
        pad.set_r2(-1.0); // released: full scale
        pad.set_stick(0.0, 0.0); // flat, pointing along +X

        let (dac, ctx) = context(Some(pad));
        ctx.control.params.set(1, 10.0);
        let control = ctx.control.clone();
        let body = tokio::spawn(async move { Routine::Gripper.run(ctx).await });
        // Past the debounce holdoff so the mode switch registers.
        tokio::time::sleep(Duration::from_millis(300)).await;
        control.request_stop();
        body.await.expect("body");

        // Stop path zeroes the coils; inspect the drive history instead.
        let x_volts: Vec<f64> = dac
            .history()
            .into_iter()
            .filter(|&(pin, _)| pin == 5)
            .map(|(_, v)| v)
            .collect();
        let expected = 10.0 / 4.433;
        assert!(
            x_volts.iter().any(|v| (v - expected).abs() < 1e-9),
            "grasp field never reached +X coil"
        );
    }

    #[tokio::test]
    async fn test_r2_fully_pulled_kills_field() {
        let pad = Arc::new(MockGamepad::new());
        pad.press(&[Button::Circle]);
        pad.set_r2(1.0); // fully pulled: scale 0
        pad.set_stick(0.0, 0.0);

        let (dac, ctx) = context(Some(pad));
        ctx.control.params.set(1, 10.0);
        let control = ctx.control.clone();
        let body = tokio::spawn(async move { Routine::Gripper.run(ctx).await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        control.request_stop();
        body.await.expect("body");

        for (_, volts) in dac.history() {
            assert!(volts.abs() < 1e-9, "field driven with trigger pulled");
        }
    }
}
