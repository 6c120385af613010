// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ExtrudedAreaSolid processor - extrusion of 2D profiles.

use crate::extrusion::extrude_profile;
use crate::placement::{parse_direction, resolve_axis2_placement_3d};
use crate::profiles::ProfileProcessor;
use crate::router::GeometryProcessor;
use crate::{Error, Mesh, Result, Vector3};
use column_qa_core::{DecodedEntity, EntityDecoder, IfcType};
use nalgebra::Matrix4;

/// Handles IfcExtrudedAreaSolid
#[derive(Debug, Default)]
pub struct ExtrudedAreaSolidProcessor {
    profile_processor: ProfileProcessor,
}

impl ExtrudedAreaSolidProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeometryProcessor for ExtrudedAreaSolidProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcExtrudedAreaSolid: SweptArea, Position, ExtrudedDirection, Depth
        let profile_entity = entity
            .get(0)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::geometry(format!("#{} missing SweptArea", entity.id)))?;
        let profile = self.profile_processor.process(&profile_entity, decoder)?;

        let direction = match entity.get(2).map(|attr| decoder.resolve_ref(attr)).transpose()? {
            Some(Some(direction)) => parse_direction(&direction)?,
            _ => Vector3::z(),
        };
        let direction = direction
            .try_normalize(1e-12)
            .ok_or_else(|| Error::InvalidExtrusion(format!("#{} has a zero direction", entity.id)))?;

        let depth = entity
            .get_float(3)
            .ok_or_else(|| Error::InvalidExtrusion(format!("#{} missing Depth", entity.id)))?;

        // Shear (x, y, d) to (x + dx*d, y + dy*d, dz*d): the profile plane is
        // kept and the sweep follows ExtrudedDirection
        let mut shear = Matrix4::identity();
        shear[(0, 2)] = direction.x;
        shear[(1, 2)] = direction.y;
        shear[(2, 2)] = direction.z;

        let position = resolve_axis2_placement_3d(decoder, entity.get(1))?;
        extrude_profile(&profile, depth, Some(position * shear))
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcExtrudedAreaSolid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SOLIDS: &str = r#"
#1=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,400.,600.);
#2=IFCDIRECTION((0.,0.,1.));
#3=IFCCARTESIANPOINT((0.,0.,100.));
#4=IFCAXIS2PLACEMENT3D(#3,$,$);
#5=IFCEXTRUDEDAREASOLID(#1,#4,#2,3000.);
#6=IFCDIRECTION((0.,0.,-1.));
#7=IFCEXTRUDEDAREASOLID(#1,$,#6,3000.);
#8=IFCDIRECTION((0.6,0.,0.8));
#9=IFCEXTRUDEDAREASOLID(#1,$,#8,1000.);
"#;

    fn extrude(id: u32) -> Mesh {
        let mut decoder = EntityDecoder::new(SOLIDS);
        let entity = decoder.decode_by_id(id).unwrap();
        ExtrudedAreaSolidProcessor::new()
            .process(&entity, &mut decoder)
            .unwrap()
    }

    #[test]
    fn test_upright_extrusion() {
        let (min, max) = extrude(5).bounds().unwrap();
        assert_relative_eq!(min.x, -200.0);
        assert_relative_eq!(max.y, 300.0);
        assert_relative_eq!(min.z, 100.0);
        assert_relative_eq!(max.z, 3100.0);
    }

    #[test]
    fn test_downward_extrusion() {
        let (min, max) = extrude(7).bounds().unwrap();
        assert_relative_eq!(min.z, -3000.0);
        assert_relative_eq!(max.z, 0.0);
    }

    #[test]
    fn test_slanted_extrusion_keeps_profile_plane() {
        let (min, max) = extrude(9).bounds().unwrap();
        assert_relative_eq!(min.z, 0.0);
        assert_relative_eq!(max.z, 800.0, epsilon = 1e-9);
        assert_relative_eq!(min.x, -200.0);
        assert_relative_eq!(max.x, 800.0, epsilon = 1e-9);
    }
}
