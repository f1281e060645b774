//! Replay of a recorded per-coil drive table.
//!
//! The waveform file is CSV with a `t` timestamp column and one column per
//! coil (`X1_val` .. `Z2_val`), all in mT. Rows are applied verbatim with no
//! interpolation; pacing comes from the timestamp deltas.

use super::RoutineContext;
use crate::error::{AppResult, SteerError};
use crate::field::Axis;
use log::{error, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// One row of the waveform table.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ReplayRow {
    /// Timestamp in seconds, monotonically increasing.
    pub t: f64,
    /// X positive-side coil, mT.
    #[serde(rename = "X1_val")]
    pub x1: f64,
    /// X negative-side coil, mT.
    #[serde(rename = "X2_val")]
    pub x2: f64,
    /// Y positive-side coil, mT.
    #[serde(rename = "Y1_val")]
    pub y1: f64,
    /// Y negative-side coil, mT.
    #[serde(rename = "Y2_val")]
    pub y2: f64,
    /// Z positive-side coil, mT.
    #[serde(rename = "Z1_val")]
    pub z1: f64,
    /// Z negative-side coil, mT.
    #[serde(rename = "Z2_val")]
    pub z2: f64,
}

/// Loads and parses the whole waveform table up front, so a malformed file
/// is rejected before any coil is driven.
pub fn load_rows(path: &Path) -> AppResult<Vec<ReplayRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| SteerError::Replay(format!("{}: {}", path.display(), e)))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: ReplayRow =
            record.map_err(|e| SteerError::Replay(format!("{}: {}", path.display(), e)))?;
        rows.push(row);
    }
    Ok(rows)
}

pub(super) async fn replay_csv(ctx: &RoutineContext) {
    let rows = match load_rows(&ctx.replay_path) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Waveform replay aborted: {}", e);
            return;
        }
    };
    info!(
        "Replaying {} rows from {}",
        rows.len(),
        ctx.replay_path.display()
    );

    for (i, row) in rows.iter().enumerate() {
        if ctx.stopped() {
            info!("Replay stopped at row {}", i);
            return;
        }

        ctx.field.drive_coil(Axis::X, true, row.x1);
        ctx.field.drive_coil(Axis::X, false, row.x2);
        ctx.field.drive_coil(Axis::Y, true, row.y1);
        ctx.field.drive_coil(Axis::Y, false, row.y2);
        ctx.field.drive_coil(Axis::Z, true, row.z1);
        ctx.field.drive_coil(Axis::Z, false, row.z2);
        ctx.field
            .store_cached(row.x1 + row.x2, row.y1 + row.y2, row.z1 + row.z2);

        if let Some(next) = rows.get(i + 1) {
            let dt = next.t - row.t;
            if dt > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(dt)).await;
            }
        }
    }
    info!("Replay complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::engine::SharedControl;
    use crate::field::FieldDriver;
    use crate::hardware::MockDac;
    use crate::routine::{Routine, RoutineContext};
    use crate::vision::VisionHub;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    const HEADER: &str = "t,X1_val,X2_val,Y1_val,Y2_val,Z1_val,Z2_val";

    fn write_waveform(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("waveform.csv");
        let mut file = std::fs::File::create(&path).expect("create waveform");
        writeln!(file, "{HEADER}\n{body}").expect("write waveform");
        path
    }

    fn context(replay_path: PathBuf) -> (Arc<MockDac>, RoutineContext) {
        let settings = Settings::new(None).expect("defaults");
        let dac = Arc::new(MockDac::new());
        let ctx = RoutineContext {
            control: Arc::new(SharedControl::default()),
            field: FieldDriver::new(dac.clone(), settings.coils),
            vision: VisionHub::default(),
            gamepad: None,
            tick: std::time::Duration::from_millis(1),
            replay_path,
        };
        (dac, ctx)
    }

    #[test]
    fn test_load_rows_parses_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_waveform(&dir, "0.0,1.0,2.0,3.0,4.0,5.0,6.0\n0.5,0,0,0,0,0,0");
        let rows = load_rows(&path).expect("parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].t, 0.0);
        assert_eq!(rows[0].x2, 2.0);
        assert_eq!(rows[0].z2, 6.0);
        assert_eq!(rows[1].t, 0.5);
    }

    #[test]
    fn test_load_rows_rejects_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_waveform(&dir, "0.0,1.0,not_a_number,3.0,4.0,5.0,6.0");
        assert!(load_rows(&path).is_err());
        assert!(load_rows(&dir.path().join("missing.csv")).is_err());
    }

    #[tokio::test]
    async fn test_replay_drives_each_coil_through_its_factor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_waveform(&dir, "0.0,1.0,2.0,3.0,4.0,5.0,6.0");
        let (dac, ctx) = context(path);
        let field = ctx.field.clone();
        Routine::ReplayCsv.run(ctx).await;

        assert_eq!(dac.last_written(5), Some(1.0 / 4.433)); // X1
        assert_eq!(dac.last_written(1), Some(2.0 / 5.024)); // X2
        assert_eq!(dac.last_written(2), Some(3.0 / 5.224)); // Y1
        assert_eq!(dac.last_written(6), Some(4.0 / 5.224)); // Y2
        assert_eq!(dac.last_written(3), Some(5.0 / 4.879)); // Z1
        assert_eq!(dac.last_written(7), Some(6.0 / 5.000)); // Z2

        let snap = field.snapshot();
        assert_eq!(snap.x, 3.0);
        assert_eq!(snap.y, 7.0);
        assert_eq!(snap.z, 11.0);
    }

    #[tokio::test]
    async fn test_replay_malformed_file_returns_without_driving() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_waveform(&dir, "bogus row");
        let (dac, ctx) = context(path);
        Routine::ReplayCsv.run(ctx).await;
        assert_eq!(dac.write_count(), 0);
    }

    #[tokio::test]
    async fn test_replay_observes_stop_between_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Large delta after the first row; stop must cut the run short.
        let path = write_waveform(&dir, "0.0,1.0,0,0,0,0,0\n30.0,9.0,0,0,0,0,0");
        let (dac, ctx) = context(path);
        ctx.control.request_stop();
        tokio::time::timeout(std::time::Duration::from_secs(1), Routine::ReplayCsv.run(ctx))
            .await
            .expect("stop observed before first sleep");
        assert_eq!(dac.write_count(), 0);
    }
}
