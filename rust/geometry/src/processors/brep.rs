// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IfcFacetedBrep processor.
//!
//! A faceted brep is a closed shell of planar faces, each bounded by poly
//! loops. The first outer bound (or the first bound when none is marked
//! outer) is the face boundary; the remaining bounds are holes.

use crate::placement::parse_cartesian_point;
use crate::router::GeometryProcessor;
use crate::triangulation::triangulate_face;
use crate::{Error, Mesh, Point3, Result};
use column_qa_core::{DecodedEntity, EntityDecoder, IfcType};

/// Handles IfcFacetedBrep
#[derive(Debug, Default)]
pub struct FacetedBrepProcessor;

impl FacetedBrepProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Points of a face bound, reversed when its Orientation is false
    fn bound_points(
        bound: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Option<Vec<Point3<f64>>>> {
        // IfcFaceBound: Bound, Orientation
        let Some(poly_loop) = bound.get(0).map(|attr| decoder.resolve_ref(attr)).transpose()?.flatten()
        else {
            return Ok(None);
        };
        if poly_loop.ifc_type != IfcType::IfcPolyLoop {
            tracing::debug!(id = poly_loop.id, ifc_type = %poly_loop.type_name, "Unsupported loop");
            return Ok(None);
        }

        let Some(polygon) = poly_loop.get(0) else {
            return Ok(None);
        };
        let mut points = decoder
            .resolve_ref_list(polygon)?
            .iter()
            .map(|point| parse_cartesian_point(point))
            .collect::<Result<Vec<_>>>()?;

        if bound.get_enum(1) == Some("F") {
            points.reverse();
        }
        Ok((points.len() >= 3).then_some(points))
    }

    /// Triangulate one IfcFace into `mesh`
    fn add_face(face: &DecodedEntity, decoder: &mut EntityDecoder, mesh: &mut Mesh) -> Result<()> {
        let Some(bounds_attr) = face.get(0) else {
            return Ok(());
        };
        let bounds = decoder.resolve_ref_list(bounds_attr)?;

        let outer_index = bounds
            .iter()
            .position(|b| b.ifc_type == IfcType::IfcFaceOuterBound)
            .unwrap_or(0);

        let mut outer = None;
        let mut holes = Vec::new();
        for (i, bound) in bounds.iter().enumerate() {
            let Some(points) = Self::bound_points(bound, decoder)? else {
                continue;
            };
            if i == outer_index {
                outer = Some(points);
            } else {
                holes.push(points);
            }
        }

        let Some(outer) = outer else {
            return Ok(());
        };
        let triangles = triangulate_face(&outer, &holes)?;

        let base = mesh.vertex_count() as u32;
        for point in outer.iter().chain(holes.iter().flatten()) {
            mesh.add_vertex(*point);
        }
        for tri in triangles.chunks_exact(3) {
            mesh.add_triangle(
                base + tri[0] as u32,
                base + tri[1] as u32,
                base + tri[2] as u32,
            );
        }
        Ok(())
    }
}

impl GeometryProcessor for FacetedBrepProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcFacetedBrep: Outer (IfcClosedShell)
        let shell = entity
            .get(0)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::geometry(format!("#{} missing Outer shell", entity.id)))?;

        // IfcClosedShell: CfsFaces
        let faces_attr = shell
            .get(0)
            .ok_or_else(|| Error::geometry(format!("#{} has no faces", shell.id)))?;
        let faces = decoder.resolve_ref_list(faces_attr)?;

        let mut mesh = Mesh::new();
        for face in faces {
            if let Err(e) = Self::add_face(&face, decoder, &mut mesh) {
                tracing::debug!(id = face.id, error = %e, "Skipping brep face");
            }
        }

        if mesh.is_empty() {
            return Err(Error::EmptyMesh(format!("#{} produced no faces", entity.id)));
        }
        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcFacetedBrep]
    }
}
