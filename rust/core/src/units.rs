// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction for IFC files
//!
//! Two separate questions are answered here:
//!
//! - which length unit the model *declares* (`resolve_length_unit`), reported
//!   as one of the three units feature extraction distinguishes;
//! - how many metres one model length unit spans (`extract_length_unit_scale`),
//!   which the geometry kernel applies so that its output is always in metres.

use crate::decoder::EntityDecoder;
use crate::entity::DecodedEntity;
use crate::error::{Error, Result};
use crate::schema::IfcType;
use std::fmt;

/// Length unit a model declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum LengthUnit {
    #[default]
    Millimetre,
    Metre,
    Foot,
}

impl LengthUnit {
    /// Interpret a unit token the way converters match them: "MILLIMETRE"
    /// or "MM", then "METRE" or "M", then "FOOT"/"FEET" (case-insensitive,
    /// substring match)
    pub fn parse_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        if token.contains("MILLIMETRE") || token == "MM" {
            Some(LengthUnit::Millimetre)
        } else if token.contains("METRE") || token == "M" {
            Some(LengthUnit::Metre)
        } else if token.contains("FOOT") || token.contains("FEET") {
            Some(LengthUnit::Foot)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LengthUnit::Millimetre => "MILLIMETRE",
            LengthUnit::Metre => "METRE",
            LengthUnit::Foot => "FOOT",
        }
    }

    /// Millimetres in one unit
    pub fn millimetres_per_unit(&self) -> f64 {
        match self {
            LengthUnit::Millimetre => 1.0,
            LengthUnit::Metre => 1000.0,
            LengthUnit::Foot => 304.8,
        }
    }

    /// Convert a value in this unit to millimetres
    #[inline]
    pub fn to_millimetres(&self, value: f64) -> f64 {
        value * self.millimetres_per_unit()
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SI Prefix multipliers as defined in IFC specification
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

fn is_length_unit(unit: &DecodedEntity) -> bool {
    unit.get_enum(1) == Some("LENGTHUNIT")
}

fn is_conversion_based(unit: &DecodedEntity) -> bool {
    matches!(
        unit.ifc_type,
        IfcType::IfcConversionBasedUnit | IfcType::IfcConversionBasedUnitWithOffset
    )
}

/// Walk the units of every assignment, in order, yielding each decodable unit
fn for_each_unit<T>(
    decoder: &mut EntityDecoder,
    assignment_ids: &[u32],
    mut visit: impl FnMut(&mut EntityDecoder, &DecodedEntity) -> Option<T>,
) -> Option<T> {
    for &assignment_id in assignment_ids {
        let assignment = match decoder.decode_by_id(assignment_id) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!(id = assignment_id, error = %e, "Skipping undecodable unit assignment");
                continue;
            }
        };
        let Some(units) = assignment.get_list(0) else {
            continue;
        };

        for unit_id in units.iter().filter_map(|u| u.as_entity_ref()) {
            let unit = match decoder.decode_by_id(unit_id) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::debug!(id = unit_id, error = %e, "Skipping undecodable unit");
                    continue;
                }
            };
            if let Some(found) = visit(decoder, &unit) {
                return Some(found);
            }
        }
    }
    None
}

fn declared_length_unit(decoder: &mut EntityDecoder, assignment_ids: &[u32]) -> Option<LengthUnit> {
    for_each_unit(decoder, assignment_ids, |_, unit| {
        if !is_length_unit(unit) {
            return None;
        }
        if unit.ifc_type == IfcType::IfcSIUnit {
            // IFCSIUNIT(Dimensions, UnitType, Prefix, Name)
            if unit.get_enum(2) == Some("MILLI") {
                return Some(LengthUnit::Millimetre);
            }
            if unit.get_enum(3) == Some("METRE") {
                return Some(LengthUnit::Metre);
            }
        } else if is_conversion_based(unit) {
            // IFCCONVERSIONBASEDUNIT(Dimensions, UnitType, Name, ConversionFactor)
            let name = unit.get_string(2).unwrap_or_default();
            if name.to_ascii_uppercase().contains("FOOT") {
                return Some(LengthUnit::Foot);
            }
        }
        None
    })
}

/// Resolve the model's declared length unit, defaulting to millimetres
///
/// Assignments are visited in the order given and their units in declaration
/// order; the first recognizable length unit wins.
pub fn resolve_length_unit(decoder: &mut EntityDecoder, assignment_ids: &[u32]) -> LengthUnit {
    declared_length_unit(decoder, assignment_ids).unwrap_or_else(|| {
        tracing::debug!("No recognizable length unit declared, assuming millimetres");
        LengthUnit::default()
    })
}

/// Like [`resolve_length_unit`] but fails instead of assuming millimetres
pub fn resolve_length_unit_strict(
    decoder: &mut EntityDecoder,
    assignment_ids: &[u32],
) -> Result<LengthUnit> {
    declared_length_unit(decoder, assignment_ids).ok_or(Error::UnresolvedLengthUnit)
}

/// Metres spanned by one unit of an IFCSIUNIT
fn si_unit_scale(unit: &DecodedEntity) -> f64 {
    unit.get_enum(2).map_or(1.0, get_si_prefix_multiplier)
}

/// Metres spanned by one unit of an IFCCONVERSIONBASEDUNIT, if resolvable
fn conversion_unit_scale(decoder: &mut EntityDecoder, unit: &DecodedEntity) -> Option<f64> {
    // IFCMEASUREWITHUNIT(ValueComponent, UnitComponent)
    let factor = decoder.resolve_ref(unit.get(3)?).ok()??;
    if factor.ifc_type != IfcType::IfcMeasureWithUnit {
        return None;
    }
    let value = factor.get_float(0)?;
    let base = decoder.resolve_ref(factor.get(1)?).ok()??;
    let base_scale = if base.ifc_type == IfcType::IfcSIUnit {
        si_unit_scale(&base)
    } else {
        1.0
    };
    Some(value * base_scale)
}

/// Extract the length unit scale (metres per model unit) from the unit
/// assignments; 0.001 for millimetres, 0.3048 for feet
///
/// Defaults to 1.0 when no length unit can be read.
pub fn extract_length_unit_scale(decoder: &mut EntityDecoder, assignment_ids: &[u32]) -> f64 {
    let scale = for_each_unit(decoder, assignment_ids, |decoder, unit| {
        if !is_length_unit(unit) {
            return None;
        }
        match unit.ifc_type {
            IfcType::IfcSIUnit => Some(si_unit_scale(unit)),
            _ if is_conversion_based(unit) => conversion_unit_scale(decoder, unit),
            _ => None,
        }
    });

    match scale {
        Some(scale) if scale.is_finite() && scale > 0.0 => scale,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::EntityDecoder;

    fn resolve(data: &str, assignments: &[u32]) -> (LengthUnit, f64) {
        let mut decoder = EntityDecoder::new(data);
        let unit = resolve_length_unit(&mut decoder, assignments);
        let scale = extract_length_unit_scale(&mut decoder, assignments);
        (unit, scale)
    }

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(get_si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(get_si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(get_si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(get_si_prefix_multiplier(""), 1.0);
    }

    #[test]
    fn test_millimetre_declaration() {
        let data = "#1=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);\
                    #2=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\
                    #3=IFCUNITASSIGNMENT((#1,#2));";
        let (unit, scale) = resolve(data, &[3]);
        assert_eq!(unit, LengthUnit::Millimetre);
        assert_eq!(scale, 0.001);
    }

    #[test]
    fn test_metre_declaration() {
        let data = "#2=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);#3=IFCUNITASSIGNMENT((#2));";
        assert_eq!(resolve(data, &[3]), (LengthUnit::Metre, 1.0));
    }

    #[test]
    fn test_centimetre_reports_metre_but_scales_by_prefix() {
        let data = "#2=IFCSIUNIT(*,.LENGTHUNIT.,.CENTI.,.METRE.);#3=IFCUNITASSIGNMENT((#2));";
        let (unit, scale) = resolve(data, &[3]);
        assert_eq!(unit, LengthUnit::Metre);
        assert_eq!(scale, 0.01);
    }

    #[test]
    fn test_foot_conversion_unit() {
        let data = "#1=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);\
                    #2=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(0.3048),#1);\
                    #3=IFCDIMENSIONALEXPONENTS(1,0,0,0,0,0,0);\
                    #4=IFCCONVERSIONBASEDUNIT(#3,.LENGTHUNIT.,'FOOT',#2);\
                    #5=IFCUNITASSIGNMENT((#4));";
        let (unit, scale) = resolve(data, &[5]);
        assert_eq!(unit, LengthUnit::Foot);
        assert!((scale - 0.3048).abs() < 1e-12);
    }

    #[test]
    fn test_first_declaration_wins() {
        let data = "#1=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);\
                    #2=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\
                    #3=IFCUNITASSIGNMENT((#1));\
                    #4=IFCUNITASSIGNMENT((#2));";
        assert_eq!(resolve(data, &[3, 4]).0, LengthUnit::Metre);
        assert_eq!(resolve(data, &[4, 3]).0, LengthUnit::Millimetre);
    }

    #[test]
    fn test_default_and_strict() {
        let data = "#1=IFCSIUNIT(*,.PLANEANGLEUNIT.,$,.RADIAN.);#2=IFCUNITASSIGNMENT((#1));";
        assert_eq!(resolve(data, &[2]), (LengthUnit::Millimetre, 1.0));
        assert_eq!(resolve(data, &[]), (LengthUnit::Millimetre, 1.0));

        let mut decoder = EntityDecoder::new(data);
        assert!(matches!(
            resolve_length_unit_strict(&mut decoder, &[2]),
            Err(Error::UnresolvedLengthUnit)
        ));
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(LengthUnit::parse_token("millimetre"), Some(LengthUnit::Millimetre));
        assert_eq!(LengthUnit::parse_token("MM"), Some(LengthUnit::Millimetre));
        assert_eq!(LengthUnit::parse_token("METRE"), Some(LengthUnit::Metre));
        assert_eq!(LengthUnit::parse_token("m"), Some(LengthUnit::Metre));
        assert_eq!(LengthUnit::parse_token("US_SURVEY_FOOT"), Some(LengthUnit::Foot));
        assert_eq!(LengthUnit::parse_token("FEET"), Some(LengthUnit::Foot));
        assert_eq!(LengthUnit::parse_token("INCH"), None);
        assert_eq!(LengthUnit::Foot.to_millimetres(10.0), 3048.0);
    }
}
