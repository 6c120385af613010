// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Derived engineering features and the per-element feature record.

use crate::extents::{BoundingBox, ElementGeometry, Extents};
use serde::{Deserialize, Serialize};

/// Number of numeric features in a record
pub const FEATURE_COUNT: usize = 20;

/// Canonical feature order, as consumed by the tilt models
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "base_z",
    "top_z",
    "centroid_z",
    "base_x",
    "base_y",
    "top_x",
    "top_y",
    "min_x",
    "min_y",
    "min_z",
    "max_x",
    "max_y",
    "max_z",
    "column_height_mm",
    "width_mm",
    "length_mm",
    "cross_section_area_mm2",
    "aspect_ratio",
    "height_to_width_ratio",
    "height_above_ground",
];

/// Present and not NaN
#[inline]
fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Features derived from extents and the bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedFeatures {
    pub column_height_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub cross_section_area_mm2: Option<f64>,
    pub aspect_ratio: Option<f64>,
    pub height_to_width_ratio: Option<f64>,
    pub height_above_ground: Option<f64>,
}

/// Derive heights, footprint and ratios; each field is absent when any of
/// its inputs is
pub fn derive_features(extents: &Extents, bbox: Option<&BoundingBox>) -> DerivedFeatures {
    let base_z = usable(extents.base_z);
    let top_z = usable(extents.top_z);
    let column_height_mm = base_z.zip(top_z).map(|(base, top)| top - base);

    let (width_mm, length_mm) = match bbox.map(BoundingBox::horizontal_spans) {
        Some((width, length)) => (usable(Some(width)), usable(Some(length))),
        None => (None, None),
    };
    let cross_section_area_mm2 = width_mm.zip(length_mm).map(|(w, l)| w * l);

    let nonzero_width = width_mm.filter(|w| *w != 0.0);
    let aspect_ratio = nonzero_width.zip(length_mm).map(|(w, l)| l / w);
    let height_to_width_ratio = nonzero_width.zip(column_height_mm).map(|(w, h)| h / w);

    DerivedFeatures {
        column_height_mm,
        width_mm,
        length_mm,
        cross_section_area_mm2,
        aspect_ratio,
        height_to_width_ratio,
        height_above_ground: base_z,
    }
}

/// One structural element's measurements, serialized as a flat map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub element_id: Option<String>,
    pub base_z: Option<f64>,
    pub top_z: Option<f64>,
    pub centroid_z: Option<f64>,
    pub base_x: Option<f64>,
    pub base_y: Option<f64>,
    pub top_x: Option<f64>,
    pub top_y: Option<f64>,
    pub min_x: Option<f64>,
    pub min_y: Option<f64>,
    pub min_z: Option<f64>,
    pub max_x: Option<f64>,
    pub max_y: Option<f64>,
    pub max_z: Option<f64>,
    pub column_height_mm: Option<f64>,
    pub width_mm: Option<f64>,
    pub length_mm: Option<f64>,
    pub cross_section_area_mm2: Option<f64>,
    pub aspect_ratio: Option<f64>,
    pub height_to_width_ratio: Option<f64>,
    pub height_above_ground: Option<f64>,
    pub source_file: String,
}

impl FeatureRecord {
    /// Assemble the record for one measured (or degraded) element
    pub fn new(element_id: Option<String>, geometry: &ElementGeometry, source_file: impl Into<String>) -> Self {
        let extents = geometry.extents();
        let bbox = geometry.bbox();
        let derived = derive_features(&extents, bbox);
        let corner = |pick: fn(&BoundingBox) -> f64| bbox.map(pick);

        Self {
            element_id,
            base_z: extents.base_z,
            top_z: extents.top_z,
            centroid_z: extents.centroid_z,
            base_x: extents.base_x,
            base_y: extents.base_y,
            top_x: extents.top_x,
            top_y: extents.top_y,
            min_x: corner(|b| b.min[0]),
            min_y: corner(|b| b.min[1]),
            min_z: corner(|b| b.min[2]),
            max_x: corner(|b| b.max[0]),
            max_y: corner(|b| b.max[1]),
            max_z: corner(|b| b.max[2]),
            column_height_mm: derived.column_height_mm,
            width_mm: derived.width_mm,
            length_mm: derived.length_mm,
            cross_section_area_mm2: derived.cross_section_area_mm2,
            aspect_ratio: derived.aspect_ratio,
            height_to_width_ratio: derived.height_to_width_ratio,
            height_above_ground: derived.height_above_ground,
            source_file: source_file.into(),
        }
    }

    /// The 20 features in canonical order, absent or NaN as `None`
    pub fn features(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.base_z,
            self.top_z,
            self.centroid_z,
            self.base_x,
            self.base_y,
            self.top_x,
            self.top_y,
            self.min_x,
            self.min_y,
            self.min_z,
            self.max_x,
            self.max_y,
            self.max_z,
            self.column_height_mm,
            self.width_mm,
            self.length_mm,
            self.cross_section_area_mm2,
            self.aspect_ratio,
            self.height_to_width_ratio,
            self.height_above_ground,
        ]
        .map(usable)
    }

    /// Classifier input: canonical order with unavailable features as 0.0
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        self.features().map(|v| v.unwrap_or(0.0))
    }

    /// True when no extent or derived feature is available
    pub fn is_degraded(&self) -> bool {
        self.features().iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extents::DegradedReason;
    use approx::assert_relative_eq;

    fn bbox(min: [f64; 3], max: [f64; 3]) -> BoundingBox {
        BoundingBox { min, max }
    }

    fn extents(base_z: f64, top_z: f64) -> Extents {
        Extents {
            base_z: Some(base_z),
            top_z: Some(top_z),
            centroid_z: Some((base_z + top_z) / 2.0),
            ..Extents::absent()
        }
    }

    #[test]
    fn test_full_derivation() {
        let derived = derive_features(
            &extents(100.0, 3100.0),
            Some(&bbox([0.0, 0.0, 100.0], [600.0, 400.0, 3100.0])),
        );
        assert_eq!(derived.column_height_mm, Some(3000.0));
        assert_eq!(derived.width_mm, Some(400.0));
        assert_eq!(derived.length_mm, Some(600.0));
        assert_eq!(derived.cross_section_area_mm2, Some(240_000.0));
        assert_relative_eq!(derived.aspect_ratio.unwrap(), 1.5);
        assert_relative_eq!(derived.height_to_width_ratio.unwrap(), 7.5);
        assert_eq!(derived.height_above_ground, Some(100.0));
    }

    #[test]
    fn test_zero_width_has_no_ratios() {
        let derived = derive_features(
            &extents(0.0, 3000.0),
            Some(&bbox([0.0, 0.0, 0.0], [500.0, 0.0, 3000.0])),
        );
        assert_eq!(derived.width_mm, Some(0.0));
        assert_eq!(derived.cross_section_area_mm2, Some(0.0));
        assert_eq!(derived.aspect_ratio, None);
        assert_eq!(derived.height_to_width_ratio, None);
    }

    #[test]
    fn test_missing_inputs_short_circuit() {
        let derived = derive_features(&Extents::absent(), None);
        assert_eq!(derived, DerivedFeatures::default());

        let mut partial = extents(0.0, 3000.0);
        partial.top_z = Some(f64::NAN);
        let derived = derive_features(&partial, Some(&bbox([0.0; 3], [1.0, 2.0, 3.0])));
        assert_eq!(derived.column_height_mm, None);
        assert_eq!(derived.height_to_width_ratio, None);
        assert_eq!(derived.aspect_ratio, Some(2.0));
        assert_eq!(derived.height_above_ground, Some(0.0));
    }

    #[test]
    fn test_unit_cube_record() {
        let mut cube = Vec::new();
        for z in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for x in [0.0, 1.0] {
                    cube.extend_from_slice(&[x, y, z]);
                }
            }
        }
        let geometry = ElementGeometry::from_mesh(&cube);
        let record = FeatureRecord::new(Some("cube".into()), &geometry, "cube.ifc");

        assert_eq!(record.base_z, Some(0.0));
        assert_eq!(record.top_z, Some(1000.0));
        assert_eq!(record.centroid_z, Some(500.0));
        assert_eq!(record.width_mm, Some(1000.0));
        assert_eq!(record.length_mm, Some(1000.0));
        assert_eq!(record.cross_section_area_mm2, Some(1_000_000.0));
        assert_eq!(record.aspect_ratio, Some(1.0));
        assert_eq!(record.column_height_mm, Some(1000.0));
        assert_eq!(record.max_x, Some(1000.0));
        assert!(!record.is_degraded());
    }

    #[test]
    fn test_degraded_record_vector() {
        let geometry = ElementGeometry::degraded(DegradedReason::TooFewVertices(0));
        let record = FeatureRecord::new(None, &geometry, "a.ifc");
        assert!(record.is_degraded());
        assert_eq!(record.feature_vector(), [0.0; FEATURE_COUNT]);
        assert_eq!(record.source_file, "a.ifc");
    }

    #[test]
    fn test_vector_order_and_nan() {
        let geometry = ElementGeometry::from_mesh(&[0.0, 0.0, 0.0, 0.4, 0.6, 0.0, 0.0, 0.0, 3.0]);
        let mut record = FeatureRecord::new(None, &geometry, "a.ifc");
        record.top_x = Some(f64::NAN);

        let vector = record.feature_vector();
        assert_eq!(vector[1], 3000.0);
        assert_eq!(vector[5], 0.0);
        assert_eq!(vector[14], 400.0);
        assert_eq!(vector[15], 600.0);
        assert_eq!(vector[19], 0.0);
        assert_eq!(FEATURE_NAMES[14], "width_mm");
    }
}
