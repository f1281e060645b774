//! Parameter registry: per-routine display labels and value ranges.
//!
//! The front end queries this catalog when a routine is selected so it can
//! relabel the five parameter inputs and clamp their ranges. Lookups by an
//! unknown name fall back to the `default` entry instead of failing.

use crate::engine::PARAM_SLOTS;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Display metadata for one routine's parameter vector.
#[derive(Clone, Copy, Debug)]
pub struct RoutineDescriptor {
    /// Input labels; unused slots read "N/A".
    pub labels: [&'static str; PARAM_SLOTS],
    /// Lower bounds.
    pub min: [f64; PARAM_SLOTS],
    /// Upper bounds.
    pub max: [f64; PARAM_SLOTS],
    /// Values loaded into the slots on selection.
    pub default: [f64; PARAM_SLOTS],
}

const DEFAULT_DESCRIPTOR: RoutineDescriptor = RoutineDescriptor {
    labels: ["param0", "param1", "param2", "param3", "param4"],
    min: [0.0; PARAM_SLOTS],
    max: [0.0; PARAM_SLOTS],
    default: [0.0; PARAM_SLOTS],
};

const OSC_LABELS: [&str; PARAM_SLOTS] = [
    "Frequency (Hz)",
    "bound1 (mT)",
    "bound2 (mT)",
    "Azimuth [0,360] (deg)",
    "Polar [-90,90] (deg)",
];

static CATALOG: Lazy<HashMap<&'static str, RoutineDescriptor>> = Lazy::new(|| {
    let osc = RoutineDescriptor {
        labels: OSC_LABELS,
        min: [-100.0, -20.0, -20.0, 0.0, -90.0],
        max: [100.0, 20.0, 20.0, 360.0, 90.0],
        default: [0.0; PARAM_SLOTS],
    };
    let rotate = |a: &'static str, b: &'static str| RoutineDescriptor {
        labels: ["Frequency (Hz)", a, b, "N/A", "N/A"],
        min: [-100.0, -25.0, -25.0, -25.0, -25.0],
        max: [100.0, 25.0, 25.0, 25.0, 25.0],
        default: [0.0; PARAM_SLOTS],
    };
    let idle = RoutineDescriptor {
        labels: ["N/A"; PARAM_SLOTS],
        ..DEFAULT_DESCRIPTOR
    };

    HashMap::from([
        (
            "twistField",
            RoutineDescriptor {
                labels: [
                    "Frequency (Hz)",
                    "Magnitude (mT)",
                    "AzimuthalAngle (deg)",
                    "PolarAngle (deg)",
                    "SpanAngle (deg)",
                ],
                min: [-100.0, 0.0, -1080.0, 0.0, 0.0],
                max: [100.0, 25.0, 1080.0, 180.0, 360.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
        ("rotateXY", rotate("Magnitude-X (mT)", "Magnitude-Y (mT)")),
        ("rotateYZ", rotate("Magnitude-Y (mT)", "Magnitude-Z (mT)")),
        ("rotateXZ", rotate("Magnitude-X (mT)", "Magnitude-Z (mT)")),
        ("osc_saw", osc),
        ("osc_triangle", osc),
        ("osc_square", osc),
        ("osc_sin", osc),
        ("osc_cos", osc),
        (
            "oni_cutting",
            RoutineDescriptor {
                labels: [
                    "Frequency (Hz)",
                    "Magnitude (mT)",
                    "angleBound1 (deg)",
                    "angleBound2 (deg)",
                    "N/A",
                ],
                min: [-100.0, -25.0, -720.0, -720.0, 0.0],
                max: [100.0, 25.0, 720.0, 720.0, 0.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
        (
            "examplePiecewiseFunction",
            RoutineDescriptor {
                labels: [
                    "Frequency (Hz)",
                    "Magnitude (mT)",
                    "angle (deg)",
                    "period1 (0-1)",
                    "period2 (0-1)",
                ],
                min: [-20.0, 0.0, -360.0, 0.0, 0.0],
                max: [20.0, 20.0, 360.0, 1.0, 1.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
        (
            "ellipse",
            RoutineDescriptor {
                labels: [
                    "Frequency (Hz)",
                    "Azimuthal Angle (deg)",
                    "B_horzF (mT)",
                    "B_vert (mT)",
                    "B_horzB (mT)",
                ],
                min: [-100.0, -720.0, 0.0, 0.0, 0.0],
                max: [100.0, 720.0, 20.0, 20.0, 20.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
        (
            "drawing",
            RoutineDescriptor {
                labels: ["pattern ID", "offsetX", "offsetY", "N/A", "N/A"],
                min: [0.0; PARAM_SLOTS],
                max: [2.0, 1000.0, 1000.0, 10.0, 0.0],
                default: [0.0, 0.0, 0.0, 1.0, 0.0],
            },
        ),
        (
            "swimmerPathFollowing",
            RoutineDescriptor {
                labels: [
                    "Frequency (Hz)",
                    "Magnitude (mT)",
                    "temp angle",
                    "N/A",
                    "N/A",
                ],
                min: [-100.0, 0.0, 0.0, 0.0, 0.0],
                max: [100.0, 20.0, 360.0, 0.0, 0.0],
                default: [-20.0, 2.0, 0.0, 0.0, 0.0],
            },
        ),
        (
            "swimmerBenchmark",
            RoutineDescriptor {
                labels: ["bias angle (deg)", "N/A", "N/A", "N/A", "N/A"],
                min: [0.0; PARAM_SLOTS],
                max: [360.0, 0.0, 0.0, 0.0, 0.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
        (
            "tianqiGripper",
            RoutineDescriptor {
                labels: [
                    "N/A",
                    "Magnitude (mT)",
                    "Frequency (Hz)",
                    "Direction (deg)",
                    "N/A",
                ],
                min: [0.0, 0.0, 0.0, -720.0, 0.0],
                max: [10.0, 20.0, 120.0, 720.0, 0.0],
                default: [0.0, 15.0, 0.5, 0.0, 0.0],
            },
        ),
        ("fromCSV", idle),
        ("formulaControlledField", idle),
        (
            "crawler_walking",
            RoutineDescriptor {
                labels: ["Bmax (mT)", "Frequency (Hz)", "Max2", "N/A", "N/A"],
                min: [-50.0, 0.0, -50.0, 0.0, 0.0],
                max: [50.0, 10.0, 50.0, 0.0, 0.0],
                default: [5.0, 5.0, 5.0, 0.0, 0.0],
            },
        ),
        (
            "xy_angle",
            RoutineDescriptor {
                labels: ["Magnitude (mT)", "Angle (deg)", "N/A", "N/A", "N/A"],
                min: [-50.0, 0.0, -50.0, 0.0, 0.0],
                max: [50.0, 360.0, 50.0, 0.0, 0.0],
                default: [0.0; PARAM_SLOTS],
            },
        ),
    ])
});

/// Descriptor for `name`, or the default entry when the name is unknown.
pub fn descriptor_for(name: &str) -> &'static RoutineDescriptor {
    CATALOG.get(name).unwrap_or(&DEFAULT_DESCRIPTOR)
}

/// Parameter labels for `name`.
pub fn labels_for(name: &str) -> [&'static str; PARAM_SLOTS] {
    descriptor_for(name).labels
}

/// Per-slot (min, max, default) triples for `name`.
pub fn ranges_for(name: &str) -> [(f64, f64, f64); PARAM_SLOTS] {
    let d = descriptor_for(name);
    std::array::from_fn(|i| (d.min[i], d.max[i], d.default[i]))
}
