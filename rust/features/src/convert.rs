// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length conversion to millimetres.
//!
//! A length either comes from the geometry kernel, which always reports
//! metres, or carries the unit the model declares. The two paths never mix:
//! kernel output ignores the declared unit entirely.

use column_qa_core::LengthUnit;

/// Millimetres per metre, the kernel's output unit
pub const MM_PER_METRE: f64 = 1000.0;

/// Where a length value was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementSource {
    /// Read from the model, in its declared unit
    Declared,
    /// Produced by the geometry kernel, in metres
    GeometryKernel,
}

/// Convert an optional length to millimetres
///
/// Absent stays absent. Unrecognized unit tokens pass the value through.
pub fn convert_to_mm(value: Option<f64>, declared_unit: &str, source: MeasurementSource) -> Option<f64> {
    let value = value?;
    Some(match source {
        MeasurementSource::GeometryKernel => kernel_to_mm(value),
        MeasurementSource::Declared => match LengthUnit::parse_token(declared_unit) {
            Some(unit) => unit.to_millimetres(value),
            None => value,
        },
    })
}

/// Kernel metres to millimetres
#[inline]
pub fn kernel_to_mm(value: f64) -> f64 {
    value * MM_PER_METRE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_propagates() {
        assert_eq!(convert_to_mm(None, "METRE", MeasurementSource::Declared), None);
        assert_eq!(convert_to_mm(None, "METRE", MeasurementSource::GeometryKernel), None);
    }

    #[test]
    fn test_kernel_path_ignores_declared_unit() {
        for unit in ["MILLIMETRE", "METRE", "FOOT", "PARSEC", ""] {
            assert_eq!(
                convert_to_mm(Some(2.5), unit, MeasurementSource::GeometryKernel),
                Some(2500.0)
            );
        }
    }

    #[test]
    fn test_declared_units() {
        let declared = |v, unit| convert_to_mm(Some(v), unit, MeasurementSource::Declared);
        assert_eq!(declared(12.0, "MILLIMETRE"), Some(12.0));
        assert_eq!(declared(12.0, "mm"), Some(12.0));
        assert_eq!(declared(1.5, "METRE"), Some(1500.0));
        assert_eq!(declared(1.5, "m"), Some(1500.0));
        assert_eq!(declared(10.0, "FOOT"), Some(3048.0));
        assert_eq!(declared(10.0, "feet"), Some(3048.0));
        assert_eq!(declared(7.0, "CUBIT"), Some(7.0));
    }

    #[test]
    fn test_nan_passes_through() {
        let converted = convert_to_mm(Some(f64::NAN), "METRE", MeasurementSource::GeometryKernel);
        assert!(converted.is_some_and(f64::is_nan));
    }
}
