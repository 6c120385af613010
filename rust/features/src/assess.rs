// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tilt assessment around opaque classifier and regressor models.
//!
//! The models themselves live outside this crate. A classifier labels a
//! column as plumb (class 0) or tilted; only tilted columns are sent to the
//! regressor for a tilt ratio, which is then compared with the caller's
//! deviation tolerance in millimetres.

use crate::features::FeatureRecord;
use crate::vector::fit_to_width;
use serde::{Deserialize, Serialize};

/// Tilt class predictor
pub trait TiltClassifier {
    /// Input width the model was trained on
    fn expected_width(&self) -> usize;

    fn predict(&self, features: &[f64]) -> i64;
}

/// Tilt ratio predictor for columns classified as tilted
pub trait TiltRegressor {
    /// Input width the model was trained on
    fn expected_width(&self) -> usize;

    fn predict(&self, features: &[f64]) -> f64;
}

/// Tilt ratio compared with the deviation tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaningStatus {
    #[serde(rename = "within tolerance")]
    WithinTolerance,
    #[serde(rename = "leaning too much")]
    LeaningTooMuch,
    #[serde(rename = "no tolerance provided")]
    NoTolerance,
}

impl LeaningStatus {
    pub fn classify(tilt_ratio: f64, tolerance_mm: Option<f64>) -> Self {
        match tolerance_mm {
            Some(tolerance) if tilt_ratio.abs() <= tolerance => LeaningStatus::WithinTolerance,
            Some(_) => LeaningStatus::LeaningTooMuch,
            None => LeaningStatus::NoTolerance,
        }
    }
}

/// A feature record with its tilt predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltAssessment {
    #[serde(flatten)]
    pub record: FeatureRecord,
    pub tilt_class: i64,
    pub tilt_ratio: f64,
    pub deviation_tolerance: Option<f64>,
    pub leaning_status: LeaningStatus,
}

/// Classify a record, regress its tilt when tilted, and judge the result
pub fn assess(
    record: FeatureRecord,
    classifier: &dyn TiltClassifier,
    regressor: &dyn TiltRegressor,
    tolerance_mm: Option<f64>,
) -> TiltAssessment {
    let vector = record.feature_vector();

    let tilt_class = classifier.predict(&fit_to_width(&vector, classifier.expected_width()));
    let tilt_ratio = if tilt_class == 0 {
        0.0
    } else {
        regressor.predict(&fit_to_width(&vector, regressor.expected_width()))
    };

    TiltAssessment {
        record,
        tilt_class,
        tilt_ratio,
        deviation_tolerance: tolerance_mm,
        leaning_status: LeaningStatus::classify(tilt_ratio, tolerance_mm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extents::ElementGeometry;
    use std::cell::Cell;

    /// Tilted when the column is taller than 2 m
    struct HeightClassifier;

    impl TiltClassifier for HeightClassifier {
        fn expected_width(&self) -> usize {
            24
        }

        fn predict(&self, features: &[f64]) -> i64 {
            assert_eq!(features.len(), 24);
            i64::from(features[13] > 2000.0)
        }
    }

    /// Returns a fixed ratio and counts its calls
    struct FixedRegressor {
        ratio: f64,
        calls: Cell<usize>,
    }

    impl TiltRegressor for FixedRegressor {
        fn expected_width(&self) -> usize {
            10
        }

        fn predict(&self, features: &[f64]) -> f64 {
            assert_eq!(features.len(), 10);
            self.calls.set(self.calls.get() + 1);
            self.ratio
        }
    }

    fn record(height: f64) -> FeatureRecord {
        let positions = [0.0, 0.0, 0.0, 0.3, 0.3, 0.0, 0.0, 0.0, height];
        FeatureRecord::new(Some("c".into()), &ElementGeometry::from_mesh(&positions), "m.ifc")
    }

    #[test]
    fn test_plumb_column_skips_regressor() {
        let regressor = FixedRegressor { ratio: 9.0, calls: Cell::new(0) };
        let result = assess(record(1.0), &HeightClassifier, &regressor, Some(5.0));
        assert_eq!(result.tilt_class, 0);
        assert_eq!(result.tilt_ratio, 0.0);
        assert_eq!(regressor.calls.get(), 0);
        assert_eq!(result.leaning_status, LeaningStatus::WithinTolerance);
    }

    #[test]
    fn test_tilted_column_against_tolerance() {
        let regressor = FixedRegressor { ratio: -7.5, calls: Cell::new(0) };
        let result = assess(record(3.0), &HeightClassifier, &regressor, Some(5.0));
        assert_eq!(result.tilt_class, 1);
        assert_eq!(result.tilt_ratio, -7.5);
        assert_eq!(result.leaning_status, LeaningStatus::LeaningTooMuch);

        let result = assess(record(3.0), &HeightClassifier, &regressor, None);
        assert_eq!(result.leaning_status, LeaningStatus::NoTolerance);
        assert_eq!(regressor.calls.get(), 2);
    }

    #[test]
    fn test_status_boundary_is_inclusive() {
        assert_eq!(LeaningStatus::classify(5.0, Some(5.0)), LeaningStatus::WithinTolerance);
        assert_eq!(LeaningStatus::classify(-5.0, Some(5.0)), LeaningStatus::WithinTolerance);
        assert_eq!(LeaningStatus::classify(5.01, Some(5.0)), LeaningStatus::LeaningTooMuch);
    }
}
