// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checks for the entities the parser, unit resolver and geometry
//! kernel look at, schema version detection, and the product type tree used
//! to answer "all elements of type X" queries the way IFC toolkits do
//! (subtypes included, names unknown to the schema rejected).

use std::fmt;

macro_rules! ifc_types {
    ($($variant:ident => $keyword:literal),* $(,)?) => {
        /// IFC entity types handled by this crate
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum IfcType {
            $($variant,)*
            /// Any entity type not listed above
            Unknown,
        }

        impl IfcType {
            /// Parse from a STEP keyword (case-insensitive)
            pub fn from_name(name: &str) -> Self {
                $(if name.eq_ignore_ascii_case($keyword) {
                    return Self::$variant;
                })*
                Self::Unknown
            }

            /// Canonical schema name
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                    Self::Unknown => "Unknown",
                }
            }
        }
    };
}

ifc_types! {
    // Project and units
    IfcProject => "IFCPROJECT",
    IfcUnitAssignment => "IFCUNITASSIGNMENT",
    IfcSIUnit => "IFCSIUNIT",
    IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",
    IfcConversionBasedUnitWithOffset => "IFCCONVERSIONBASEDUNITWITHOFFSET",
    IfcMeasureWithUnit => "IFCMEASUREWITHUNIT",

    // Structural elements
    IfcColumn => "IFCCOLUMN",
    IfcColumnStandardCase => "IFCCOLUMNSTANDARDCASE",
    IfcBeam => "IFCBEAM",
    IfcMember => "IFCMEMBER",
    IfcWall => "IFCWALL",
    IfcSlab => "IFCSLAB",

    // Placement
    IfcLocalPlacement => "IFCLOCALPLACEMENT",
    IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D",
    IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D",
    IfcCartesianPoint => "IFCCARTESIANPOINT",
    IfcDirection => "IFCDIRECTION",
    IfcCartesianTransformationOperator3D => "IFCCARTESIANTRANSFORMATIONOPERATOR3D",
    IfcCartesianTransformationOperator3DnonUniform => "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM",

    // Representation
    IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
    IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
    IfcRepresentationMap => "IFCREPRESENTATIONMAP",
    IfcMappedItem => "IFCMAPPEDITEM",

    // Solids and surfaces
    IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",
    IfcTriangulatedFaceSet => "IFCTRIANGULATEDFACESET",
    IfcPolygonalFaceSet => "IFCPOLYGONALFACESET",
    IfcIndexedPolygonalFace => "IFCINDEXEDPOLYGONALFACE",
    IfcIndexedPolygonalFaceWithVoids => "IFCINDEXEDPOLYGONALFACEWITHVOIDS",
    IfcCartesianPointList2D => "IFCCARTESIANPOINTLIST2D",
    IfcCartesianPointList3D => "IFCCARTESIANPOINTLIST3D",
    IfcFacetedBrep => "IFCFACETEDBREP",
    IfcClosedShell => "IFCCLOSEDSHELL",
    IfcFace => "IFCFACE",
    IfcFaceOuterBound => "IFCFACEOUTERBOUND",
    IfcFaceBound => "IFCFACEBOUND",
    IfcPolyLoop => "IFCPOLYLOOP",
    IfcBooleanResult => "IFCBOOLEANRESULT",
    IfcBooleanClippingResult => "IFCBOOLEANCLIPPINGRESULT",

    // Profiles and curves
    IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF",
    IfcRectangleHollowProfileDef => "IFCRECTANGLEHOLLOWPROFILEDEF",
    IfcCircleProfileDef => "IFCCIRCLEPROFILEDEF",
    IfcCircleHollowProfileDef => "IFCCIRCLEHOLLOWPROFILEDEF",
    IfcIShapeProfileDef => "IFCISHAPEPROFILEDEF",
    IfcArbitraryClosedProfileDef => "IFCARBITRARYCLOSEDPROFILEDEF",
    IfcArbitraryProfileDefWithVoids => "IFCARBITRARYPROFILEDEFWITHVOIDS",
    IfcPolyline => "IFCPOLYLINE",
    IfcIndexedPolyCurve => "IFCINDEXEDPOLYCURVE",
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IFC schema release declared in the file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemaVersion {
    Ifc2x3,
    Ifc4,
    Ifc4x3,
}

impl SchemaVersion {
    /// Detect from the FILE_SCHEMA header entry, defaulting to IFC2X3
    pub fn detect(content: &str) -> Self {
        let header_end = content.find("DATA;").unwrap_or(content.len());
        let header = &content[..header_end];
        let declared = header
            .find("FILE_SCHEMA")
            .map(|at| &header[at..])
            .and_then(|rest| {
                let open = rest.find('\'')?;
                let close = rest[open + 1..].find('\'')?;
                Some(rest[open + 1..open + 1 + close].to_ascii_uppercase())
            });

        match declared.as_deref() {
            Some(name) if name.starts_with("IFC4X3") => Self::Ifc4x3,
            Some(name) if name.starts_with("IFC4") => Self::Ifc4,
            _ => Self::Ifc2x3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ifc2x3 => "IFC2X3",
            Self::Ifc4 => "IFC4",
            Self::Ifc4x3 => "IFC4X3",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IfcBuildingElement was renamed IfcBuiltElement in IFC4X3; children
/// reference this name and it resolves per schema.
const BUILT_ELEMENT: &str = "IfcBuiltElement";

/// A product entity type and where it sits in the inheritance tree
#[derive(Debug, Clone, Copy)]
pub struct ElementType {
    pub name: &'static str,
    supertype: Option<&'static str>,
    since: SchemaVersion,
    until: Option<SchemaVersion>,
}

impl ElementType {
    const fn new(name: &'static str, supertype: Option<&'static str>) -> Self {
        Self {
            name,
            supertype,
            since: SchemaVersion::Ifc2x3,
            until: None,
        }
    }

    const fn since(mut self, version: SchemaVersion) -> Self {
        self.since = version;
        self
    }

    const fn until(mut self, version: SchemaVersion) -> Self {
        self.until = Some(version);
        self
    }

    /// Whether the type exists in a schema release
    pub fn exists_in(&self, schema: SchemaVersion) -> bool {
        schema >= self.since && self.until.map_or(true, |last| schema <= last)
    }

    /// Direct supertype in a schema release
    pub fn supertype_in(&self, schema: SchemaVersion) -> Option<&'static str> {
        match self.supertype {
            Some(BUILT_ELEMENT) if schema < SchemaVersion::Ifc4x3 => Some("IfcBuildingElement"),
            other => other,
        }
    }
}

use SchemaVersion::{Ifc4, Ifc4x3};

const B: Option<&str> = Some(BUILT_ELEMENT);

static ELEMENT_TYPES: &[ElementType] = &[
    ElementType::new("IfcProduct", None),
    ElementType::new("IfcElement", Some("IfcProduct")),
    ElementType::new("IfcBuildingElement", Some("IfcElement")).until(Ifc4),
    ElementType::new(BUILT_ELEMENT, Some("IfcElement")).since(Ifc4x3),
    ElementType::new("IfcColumn", B),
    ElementType::new("IfcColumnStandardCase", Some("IfcColumn")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcBeam", B),
    ElementType::new("IfcBeamStandardCase", Some("IfcBeam")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcMember", B),
    ElementType::new("IfcMemberStandardCase", Some("IfcMember")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcPlate", B),
    ElementType::new("IfcPlateStandardCase", Some("IfcPlate")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcSlab", B),
    ElementType::new("IfcSlabStandardCase", Some("IfcSlab")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcSlabElementedCase", Some("IfcSlab")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcWall", B),
    ElementType::new("IfcWallStandardCase", Some("IfcWall")).until(Ifc4),
    ElementType::new("IfcWallElementedCase", Some("IfcWall")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcFooting", B),
    ElementType::new("IfcPile", B),
    ElementType::new("IfcRailing", B),
    ElementType::new("IfcRamp", B),
    ElementType::new("IfcRampFlight", B),
    ElementType::new("IfcRoof", B),
    ElementType::new("IfcStair", B),
    ElementType::new("IfcStairFlight", B),
    ElementType::new("IfcCovering", B),
    ElementType::new("IfcCurtainWall", B),
    ElementType::new("IfcDoor", B),
    ElementType::new("IfcDoorStandardCase", Some("IfcDoor")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcWindow", B),
    ElementType::new("IfcWindowStandardCase", Some("IfcWindow")).since(Ifc4).until(Ifc4),
    ElementType::new("IfcBuildingElementProxy", B),
    ElementType::new("IfcChimney", B).since(Ifc4),
    ElementType::new("IfcShadingDevice", B).since(Ifc4),
    ElementType::new("IfcBearing", B).since(Ifc4x3),
];

/// Look up a product type by name (case-insensitive) in a schema release
pub fn element_type(name: &str, schema: SchemaVersion) -> Option<&'static ElementType> {
    ELEMENT_TYPES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name) && t.exists_in(schema))
}

/// Whether `name` is `ancestor` or one of its subtypes in a schema release
pub fn is_subtype_of(name: &str, ancestor: &str, schema: SchemaVersion) -> bool {
    let mut current = element_type(name, schema);
    // The tree is shallow; the bound only guards against a malformed table
    for _ in 0..ELEMENT_TYPES.len() {
        let Some(t) = current else {
            return false;
        };
        if t.name.eq_ignore_ascii_case(ancestor) {
            return true;
        }
        current = t
            .supertype_in(schema)
            .and_then(|parent| element_type(parent, schema));
    }
    false
}
