//! Per-sample value filters: pressure curve, tablet rotation, raw averaging.
//!
//! These run before the state machine sees a sample.  Rotation and averaging
//! belong to the physical link (every tool on the tablet is affected); the
//! pressure curve belongs to the logical device that wins arbitration.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of steps in a pressure curve lookup table.
const PRESSURE_RESOLUTION: usize = 1024;

/// Control points of the identity curve.
const LINEAR_CURVE: [i32; 4] = [0, 0, 100, 100];

/// A cubic Bézier pressure curve from (0,0) to (100,100).
///
/// The two inner control points are stored as `[x0, y0, x1, y1]`, each in
/// `0..=100`.  The default `[0, 0, 100, 100]` is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureCurve {
    points: [i32; 4],
    table: Option<Vec<u16>>,
}

impl Default for PressureCurve {
    fn default() -> Self {
        Self {
            points: LINEAR_CURVE,
            table: None,
        }
    }
}

impl PressureCurve {
    /// Builds a curve from its inner control points.
    ///
    /// Returns `None` if any point lies outside `0..=100`.
    pub fn new(points: [i32; 4]) -> Option<Self> {
        if points.iter().any(|p| !(0..=100).contains(p)) {
            return None;
        }
        if points == LINEAR_CURVE {
            return Some(Self::default());
        }
        Some(Self {
            points,
            table: Some(build_table(points)),
        })
    }

    /// The inner control points `[x0, y0, x1, y1]`.
    pub fn points(&self) -> [i32; 4] {
        self.points
    }

    pub fn is_linear(&self) -> bool {
        self.table.is_none()
    }

    /// Maps a raw pressure in `0..=max_z` through the curve.
    pub fn apply(&self, z: i32, max_z: i32) -> i32 {
        let Some(table) = &self.table else {
            return z;
        };
        if max_z <= 0 {
            return z;
        }
        let z = z.clamp(0, max_z) as i64;
        let idx = (z * PRESSURE_RESOLUTION as i64 / max_z as i64) as usize;
        let out = table[idx.min(PRESSURE_RESOLUTION)] as i64;
        (out * max_z as i64 / PRESSURE_RESOLUTION as i64) as i32
    }
}

/// Samples the Bézier densely and fills a lookup table indexed by input
/// pressure, forward-filling any index the sampling skipped.
fn build_table(points: [i32; 4]) -> Vec<u16> {
    let [x0, y0, x1, y1] = points.map(|p| p as f64 / 100.0);
    let mut table: Vec<Option<u16>> = vec![None; PRESSURE_RESOLUTION + 1];
    let steps = PRESSURE_RESOLUTION * 4;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let u = 1.0 - t;
        let bx = 3.0 * u * u * t * x0 + 3.0 * u * t * t * x1 + t * t * t;
        let by = 3.0 * u * u * t * y0 + 3.0 * u * t * t * y1 + t * t * t;
        let idx = (bx * PRESSURE_RESOLUTION as f64).round() as usize;
        let val = (by * PRESSURE_RESOLUTION as f64).round() as u16;
        if let Some(slot) = table.get_mut(idx.min(PRESSURE_RESOLUTION)) {
            slot.get_or_insert(val);
        }
    }

    let mut last = 0u16;
    table
        .into_iter()
        .map(|v| {
            if let Some(v) = v {
                last = v;
            }
            last
        })
        .collect()
}

/// Rotation of the whole tablet relative to its natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    None,
    /// Rotated 90° clockwise.
    Cw,
    /// Rotated 90° counter-clockwise.
    Ccw,
    /// Rotated 180°.
    Half,
}

impl Rotation {
    /// Rotates a tablet coordinate for a tablet reporting up to `max_x` × `max_y`.
    pub fn apply(self, x: i32, y: i32, max_x: i32, max_y: i32) -> (i32, i32) {
        match self {
            Rotation::None => (x, y),
            Rotation::Cw => (max_y - y, x),
            Rotation::Ccw => (y, max_x - x),
            Rotation::Half => (max_x - x, max_y - y),
        }
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Rotation::None),
            "CW" => Ok(Rotation::Cw),
            "CCW" => Ok(Rotation::Ccw),
            "HALF" => Ok(Rotation::Half),
            _ => Err(format!("invalid rotation '{s}': use NONE, CW, CCW or HALF")),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rotation::None => "NONE",
            Rotation::Cw => "CW",
            Rotation::Ccw => "CCW",
            Rotation::Half => "HALF",
        })
    }
}

/// Moving average over the last N in-proximity positions.
#[derive(Debug, Clone, Default)]
pub struct RawAverager {
    window: VecDeque<(i32, i32)>,
}

impl RawAverager {
    /// Adds a position and returns the average over the last `samples` positions.
    pub fn push(&mut self, x: i32, y: i32, samples: usize) -> (i32, i32) {
        let samples = samples.max(1);
        self.window.push_back((x, y));
        while self.window.len() > samples {
            self.window.pop_front();
        }
        let n = self.window.len() as i64;
        let (sx, sy) = self
            .window
            .iter()
            .fold((0i64, 0i64), |(ax, ay), &(x, y)| (ax + x as i64, ay + y as i64));
        ((sx / n) as i32, (sy / n) as i32)
    }

    /// Forgets all history (the tool left proximity).
    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
