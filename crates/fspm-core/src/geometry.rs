use serde::{Deserialize, Serialize};

/// Direction or position in world space.
pub type Vec3 = [f64; 3];

/// Relative pull of each tropism on a new shoot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GrowthDirectionWeights {
    pub light: f64,
    pub gravity: f64,
    pub inertia: f64,
}

impl Default for GrowthDirectionWeights {
    fn default() -> Self {
        Self {
            light: 0.3,
            gravity: 0.2,
            inertia: 0.5,
        }
    }
}

/// Orientation cues applied when a new metamer is spawned.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tropism {
    pub sun_vector: Vec3,
    pub up_vector: Vec3,
    pub weights: GrowthDirectionWeights,
}

impl Default for Tropism {
    fn default() -> Self {
        Self {
            sun_vector: [0.0, 1.0, 0.0],
            up_vector: [0.0, 1.0, 0.0],
            weights: GrowthDirectionWeights::default(),
        }
    }
}

impl Tropism {
    pub fn is_finite(&self) -> bool {
        self.sun_vector.iter().all(|v| v.is_finite())
            && self.up_vector.iter().all(|v| v.is_finite())
            && self.weights.light.is_finite()
            && self.weights.gravity.is_finite()
            && self.weights.inertia.is_finite()
    }

    /// Unit growth direction for a shoot whose parent points along `parent_vector`.
    pub fn direction_for(&self, parent_vector: Vec3) -> Vec3 {
        normalize(growth_direction(
            self.sun_vector,
            self.up_vector,
            parent_vector,
            self.weights,
        ))
    }
}

/// Weighted sum of the light, gravity and parent-inertia vectors.
pub fn growth_direction(
    sun_vector: Vec3,
    up_vector: Vec3,
    parent_vector: Vec3,
    weights: GrowthDirectionWeights,
) -> Vec3 {
    add(
        add(scale(sun_vector, weights.light), scale(up_vector, weights.gravity)),
        scale(parent_vector, weights.inertia),
    )
}

/// Unit vector along `v`; the zero vector when `v` has no length.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len > 0.0 && len.is_finite() {
        scale(v, 1.0 / len)
    } else {
        [0.0, 0.0, 0.0]
    }
}

pub fn length(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn scale(v: Vec3, w: f64) -> Vec3 {
    [v[0] * w, v[1] * w, v[2] * w]
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}
