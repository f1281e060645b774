//! Position source adapter and overlay sink.
//!
//! The vision subsystem (cameras, filters, detectors) lives outside this
//! crate. Routines see it only through the [`VisionFeed`] trait: a position
//! query, a fire-and-forget drawing-overlay sink, and recording control.
//! [`VisionHub`] fans these out over all configured feeds and averages the
//! reported positions to reduce single-camera error.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Agent position in image-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedPosition {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate (image convention: y grows downward).
    pub y: f64,
}

impl TrackedPosition {
    /// Convenience constructor.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A drawing primitive a routine wants visualized on the camera image.
///
/// Fire-and-forget; feeds may drop overlays they cannot render.
#[derive(Clone, Debug, PartialEq)]
pub enum Overlay {
    /// Circle marker (goal regions, waypoints).
    Circle {
        /// Center x in pixels.
        x: f64,
        /// Center y in pixels.
        y: f64,
        /// Radius in pixels.
        radius: f64,
    },
    /// Line segment (current heading, position-to-goal).
    Line {
        /// Start x.
        x1: f64,
        /// Start y.
        y1: f64,
        /// End x.
        x2: f64,
        /// End y.
        y2: f64,
    },
    /// Arrow from one point to another.
    Arrow {
        /// Tail x.
        x1: f64,
        /// Tail y.
        y1: f64,
        /// Head x.
        x2: f64,
        /// Head y.
        y2: f64,
    },
    /// Closed polyline through the waypoints of a path plan.
    ClosedPath {
        /// Polyline vertices in pixels.
        points: Vec<TrackedPosition>,
    },
    /// Named pattern stencil with offset and scale (drawing demo routine).
    Pattern {
        /// Pattern identifier.
        id: i64,
        /// Horizontal offset in pixels.
        offset_x: f64,
        /// Vertical offset in pixels.
        offset_y: f64,
        /// Uniform scale factor.
        scale: f64,
    },
}

/// Boundary trait for one vision feed.
///
/// All operations are non-blocking and infallible from the engine's point of
/// view: a feed that has no detection returns `None`, a feed that cannot
/// record simply ignores the request.
pub trait VisionFeed: Send + Sync {
    /// Current detected agent position, if any this tick.
    fn position(&self) -> Option<TrackedPosition>;

    /// Removes all overlays previously added by routines.
    fn clear_overlays(&self);

    /// Adds a drawing overlay for the next rendered frames.
    fn add_overlay(&self, overlay: Overlay);

    /// Begins video recording under the given base name.
    fn start_recording(&self, name: &str);

    /// Stops video recording and releases the writer.
    fn stop_recording(&self);
}

/// Fans vision operations out over all configured feeds.
///
/// Cheap to clone; clones share the feed list.
#[derive(Clone, Default)]
pub struct VisionHub {
    feeds: std::sync::Arc<Vec<std::sync::Arc<dyn VisionFeed>>>,
}

impl VisionHub {
    /// Creates a hub over the given feeds. An empty list is valid; position
    /// queries then always report "unavailable".
    pub fn new(feeds: Vec<std::sync::Arc<dyn VisionFeed>>) -> Self {
        Self {
            feeds: std::sync::Arc::new(feeds),
        }
    }

    /// Number of configured feeds.
    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Arithmetic mean of all feeds currently reporting a detection.
    ///
    /// Returns `None` only if no feed reports. Callers must treat `None` as
    /// transient (momentary occlusion is expected in vision tracking) and
    /// skip the tick rather than fault.
    pub fn position(&self) -> Option<TrackedPosition> {
        let detections: Vec<TrackedPosition> =
            self.feeds.iter().filter_map(|f| f.position()).collect();
        if detections.is_empty() {
            return None;
        }
        let n = detections.len() as f64;
        Some(TrackedPosition {
            x: detections.iter().map(|p| p.x).sum::<f64>() / n,
            y: detections.iter().map(|p| p.y).sum::<f64>() / n,
        })
    }

    /// Clears overlays on every feed.
    pub fn clear_overlays(&self) {
        for feed in self.feeds.iter() {
            feed.clear_overlays();
        }
    }

    /// Adds an overlay on every feed.
    pub fn add_overlay(&self, overlay: Overlay) {
        for feed in self.feeds.iter() {
            feed.add_overlay(overlay.clone());
        }
    }

    /// Starts recording on every feed, suffixing the base name with the feed
    /// index so writers do not collide.
    pub fn start_recording(&self, base_name: &str) {
        for (i, feed) in self.feeds.iter().enumerate() {
            feed.start_recording(&format!("{}{}.avi", base_name, i + 1));
        }
    }

    /// Stops recording on every feed.
    pub fn stop_recording(&self) {
        for feed in self.feeds.iter() {
            feed.stop_recording();
        }
    }
}

/// Scripted feed for tests: pops one queued response per position query.
///
/// When the script is exhausted it keeps returning the configured fallback.
#[derive(Default)]
pub struct ScriptedFeed {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    script: VecDeque<Option<TrackedPosition>>,
    fallback: Option<TrackedPosition>,
    overlays: Vec<Overlay>,
    clear_count: usize,
    recording: Option<String>,
}

impl ScriptedFeed {
    /// Feed that always reports `position`.
    pub fn steady(position: TrackedPosition) -> Self {
        let feed = Self::default();
        if let Ok(mut s) = feed.state.lock() {
            s.fallback = Some(position);
        }
        feed
    }

    /// Feed that never detects anything.
    pub fn blind() -> Self {
        Self::default()
    }

    /// Feed that plays back `script` one entry per query, then repeats the
    /// last entry.
    pub fn scripted(script: Vec<Option<TrackedPosition>>) -> Self {
        let feed = Self::default();
        if let Ok(mut s) = feed.state.lock() {
            s.fallback = script.last().copied().flatten();
            s.script = script.into();
        }
        feed
    }

    /// Overlays added since the last clear.
    pub fn overlays(&self) -> Vec<Overlay> {
        self.state
            .lock()
            .map(|s| s.overlays.clone())
            .unwrap_or_default()
    }

    /// Number of times overlays were cleared.
    pub fn clear_count(&self) -> usize {
        self.state.lock().map(|s| s.clear_count).unwrap_or(0)
    }

    /// Active recording name, if recording.
    pub fn recording(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.recording.clone())
    }
}

impl VisionFeed for ScriptedFeed {
    fn position(&self) -> Option<TrackedPosition> {
        let mut s = self.state.lock().ok()?;
        match s.script.pop_front() {
            Some(entry) => entry,
            None => s.fallback,
        }
    }

    fn clear_overlays(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.overlays.clear();
            s.clear_count += 1;
        }
    }

    fn add_overlay(&self, overlay: Overlay) {
        if let Ok(mut s) = self.state.lock() {
            s.overlays.push(overlay);
        }
    }

    fn start_recording(&self, name: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.recording = Some(name.to_string());
        }
    }

    fn stop_recording(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.recording = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_position_averages_reporting_feeds() {
        let hub = VisionHub::new(vec![
            Arc::new(ScriptedFeed::steady(TrackedPosition::new(100.0, 200.0))),
            Arc::new(ScriptedFeed::steady(TrackedPosition::new(110.0, 220.0))),
            Arc::new(ScriptedFeed::blind()),
        ]);

        // The blind feed is excluded from the mean, not treated as zero.
        assert_eq!(hub.position(), Some(TrackedPosition::new(105.0, 210.0)));
    }

    #[test]
    fn test_position_unavailable_only_when_all_feeds_blind() {
        let hub = VisionHub::new(vec![
            Arc::new(ScriptedFeed::blind()),
            Arc::new(ScriptedFeed::blind()),
        ]);
        assert_eq!(hub.position(), None);
    }

    #[test]
    fn test_empty_hub_reports_unavailable() {
        let hub = VisionHub::new(Vec::new());
        assert_eq!(hub.position(), None);
    }

    #[test]
    fn test_recording_names_are_per_feed() {
        let f1 = Arc::new(ScriptedFeed::blind());
        let f2 = Arc::new(ScriptedFeed::blind());
        let hub = VisionHub::new(vec![f1.clone(), f2.clone()]);

        hub.start_recording("path");
        assert_eq!(f1.recording().as_deref(), Some("path1.avi"));
        assert_eq!(f2.recording().as_deref(), Some("path2.avi"));

        hub.stop_recording();
        assert_eq!(f1.recording(), None);
    }

    #[test]
    fn test_scripted_feed_plays_back_then_repeats() {
        let feed = ScriptedFeed::scripted(vec![
            Some(TrackedPosition::new(1.0, 1.0)),
            None,
            Some(TrackedPosition::new(2.0, 2.0)),
        ]);
        assert_eq!(feed.position(), Some(TrackedPosition::new(1.0, 1.0)));
        assert_eq!(feed.position(), None);
        assert_eq!(feed.position(), Some(TrackedPosition::new(2.0, 2.0)));
        // Exhausted: repeats the final entry.
        assert_eq!(feed.position(), Some(TrackedPosition::new(2.0, 2.0)));
    }
}
