// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertical extents, end-face centroids and bounding box of an element mesh.
//!
//! Everything is computed from the kernel's flat `x, y, z` buffer in one
//! pass for the box and one pass per end face, then converted to
//! millimetres through the kernel path.

use crate::convert::kernel_to_mm;
use thiserror::Error;

/// Fraction of the element height within which a vertex counts as lying on
/// the base or top face
pub const END_FACE_TOLERANCE: f64 = 0.01;

/// Relative slack added to the end-face band (numpy `isclose` default)
const RELATIVE_TOLERANCE: f64 = 1e-5;

/// Why an element has no measured geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegradedReason {
    #[error("mesh has {0} complete vertices, at least 3 are needed")]
    TooFewVertices(usize),

    #[error("mesh coordinates are not finite")]
    NonFinite,

    #[error("element could not be decoded: {0}")]
    Decode(String),

    #[error("geometry kernel failed: {0}")]
    Kernel(String),
}

/// Raw extents in kernel units (metres)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshExtents {
    pub base_z: f64,
    pub top_z: f64,
    /// Mean x/y of the base-face vertices, NaN when none qualify
    pub base_x: f64,
    pub base_y: f64,
    /// Mean x/y of the top-face vertices, NaN when none qualify
    pub top_x: f64,
    pub top_y: f64,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl MeshExtents {
    /// Measure a flat vertex buffer; a trailing partial vertex is ignored
    pub fn compute(positions: &[f64]) -> Result<Self, DegradedReason> {
        let count = positions.len() / 3;
        if count < 3 {
            return Err(DegradedReason::TooFewVertices(count));
        }

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for vertex in positions.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex[axis]);
                max[axis] = max[axis].max(vertex[axis]);
            }
        }
        if min.iter().chain(&max).any(|v| !v.is_finite()) {
            return Err(DegradedReason::NonFinite);
        }

        let (base_z, top_z) = (min[2], max[2]);
        let tol = (top_z - base_z) * END_FACE_TOLERANCE;
        let (base_x, base_y) = face_centroid(positions, base_z, tol);
        let (top_x, top_y) = face_centroid(positions, top_z, tol);

        Ok(Self {
            base_z,
            top_z,
            base_x,
            base_y,
            top_x,
            top_y,
            min,
            max,
        })
    }
}

#[inline]
fn is_close(z: f64, target: f64, tol: f64) -> bool {
    (z - target).abs() <= tol + RELATIVE_TOLERANCE * target.abs()
}

/// Mean x/y over vertices whose z lies within `tol` of `target`
fn face_centroid(positions: &[f64], target: f64, tol: f64) -> (f64, f64) {
    let (mut sum_x, mut sum_y, mut n) = (0.0, 0.0, 0usize);
    for vertex in positions.chunks_exact(3) {
        if is_close(vertex[2], target, tol) {
            sum_x += vertex[0];
            sum_y += vertex[1];
            n += 1;
        }
    }
    if n == 0 {
        (f64::NAN, f64::NAN)
    } else {
        (sum_x / n as f64, sum_y / n as f64)
    }
}

/// The seven extent fields, in millimetres
///
/// `base_x`/`base_y`/`top_x`/`top_y` may hold NaN when their end face had
/// no vertices; consumers treat that like absence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extents {
    pub base_z: Option<f64>,
    pub top_z: Option<f64>,
    pub centroid_z: Option<f64>,
    pub base_x: Option<f64>,
    pub base_y: Option<f64>,
    pub top_x: Option<f64>,
    pub top_y: Option<f64>,
}

impl Extents {
    /// Every field absent
    pub fn absent() -> Self {
        Self::default()
    }
}

impl From<&MeshExtents> for Extents {
    fn from(raw: &MeshExtents) -> Self {
        Self {
            base_z: Some(kernel_to_mm(raw.base_z)),
            top_z: Some(kernel_to_mm(raw.top_z)),
            centroid_z: Some(kernel_to_mm((raw.base_z + raw.top_z) / 2.0)),
            base_x: Some(kernel_to_mm(raw.base_x)),
            base_y: Some(kernel_to_mm(raw.base_y)),
            top_x: Some(kernel_to_mm(raw.top_x)),
            top_y: Some(kernel_to_mm(raw.top_y)),
        }
    }
}

/// Axis-aligned bounding box in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Spans along x, y and z
    pub fn spans(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Horizontal spans as `(width, length)`, smaller first
    pub fn horizontal_spans(&self) -> (f64, f64) {
        let [dx, dy, _] = self.spans();
        if dx > dy {
            (dy, dx)
        } else {
            (dx, dy)
        }
    }
}

impl From<&MeshExtents> for BoundingBox {
    fn from(raw: &MeshExtents) -> Self {
        Self {
            min: raw.min.map(kernel_to_mm),
            max: raw.max.map(kernel_to_mm),
        }
    }
}

/// Outcome of measuring one element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementGeometry {
    Measured { extents: Extents, bbox: BoundingBox },
    Degraded { reason: DegradedReason },
}

impl ElementGeometry {
    /// Measure a kernel mesh (metres)
    pub fn from_mesh(positions: &[f64]) -> Self {
        match MeshExtents::compute(positions) {
            Ok(raw) => ElementGeometry::Measured {
                extents: Extents::from(&raw),
                bbox: BoundingBox::from(&raw),
            },
            Err(reason) => ElementGeometry::Degraded { reason },
        }
    }

    pub fn degraded(reason: DegradedReason) -> Self {
        ElementGeometry::Degraded { reason }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ElementGeometry::Degraded { .. })
    }

    /// Extents, all absent when degraded
    pub fn extents(&self) -> Extents {
        match self {
            ElementGeometry::Measured { extents, .. } => *extents,
            ElementGeometry::Degraded { .. } => Extents::absent(),
        }
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        match self {
            ElementGeometry::Measured { bbox, .. } => Some(bbox),
            ElementGeometry::Degraded { .. } => None,
        }
    }
}
