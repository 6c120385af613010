// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellated geometry processors - pre-tessellated/polygon meshes.
//!
//! Handles IfcTriangulatedFaceSet (explicit triangle meshes) and
//! IfcPolygonalFaceSet (polygon meshes requiring triangulation).

use crate::router::GeometryProcessor;
use crate::triangulation::triangulate_face;
use crate::{Error, Mesh, Point3, Result};
use column_qa_core::{AttributeValue, DecodedEntity, EntityDecoder, IfcType};

/// Read the CoordList of an IfcCartesianPointList3D referenced by `attr`
fn coordinate_list(decoder: &mut EntityDecoder, attr: Option<&AttributeValue>) -> Result<Vec<Point3<f64>>> {
    let list = attr
        .map(|attr| decoder.resolve_ref(attr))
        .transpose()?
        .flatten()
        .ok_or_else(|| Error::geometry("Face set missing Coordinates"))?;

    if list.ifc_type != IfcType::IfcCartesianPointList3D {
        return Err(Error::geometry(format!(
            "Expected IfcCartesianPointList3D, got {}",
            list.type_name
        )));
    }

    Ok(list
        .get_list(0)
        .ok_or_else(|| Error::geometry("CartesianPointList3D missing CoordList"))?
        .iter()
        .filter_map(|coord| coord.as_coordinates::<3>())
        .map(|[x, y, z]| Point3::new(x, y, z))
        .collect())
}

/// Optional PnIndex remapping (1-based)
fn pn_index(attr: Option<&AttributeValue>) -> Option<Vec<i64>> {
    let list = attr?.as_list()?;
    Some(list.iter().filter_map(|v| v.as_int()).collect())
}

/// Convert 1-based, possibly remapped, indices to 0-based positions
fn resolve_indices(indices: &[AttributeValue], remap: Option<&[i64]>, point_count: usize) -> Option<Vec<usize>> {
    indices
        .iter()
        .map(|value| {
            let mut idx = value.as_int()?;
            if let Some(remap) = remap {
                idx = *remap.get(usize::try_from(idx - 1).ok()?)?;
            }
            let idx = usize::try_from(idx - 1).ok()?;
            (idx < point_count).then_some(idx)
        })
        .collect()
}

/// Handles IfcTriangulatedFaceSet
#[derive(Debug, Default)]
pub struct TriangulatedFaceSetProcessor;

impl TriangulatedFaceSetProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProcessor for TriangulatedFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcTriangulatedFaceSet: Coordinates, Normals, Closed, CoordIndex, PnIndex
        let points = coordinate_list(decoder, entity.get(0))?;
        let remap = pn_index(entity.get(4));

        let triangles = entity
            .get_list(3)
            .ok_or_else(|| Error::geometry("TriangulatedFaceSet missing CoordIndex"))?;

        let mut mesh = Mesh::with_capacity(points.len(), triangles.len() * 3);
        for point in &points {
            mesh.add_vertex(*point);
        }

        for triangle in triangles {
            let indices = triangle
                .as_list()
                .and_then(|t| resolve_indices(t, remap.as_deref(), points.len()));
            match indices.as_deref() {
                Some(&[a, b, c]) => mesh.add_triangle(a as u32, b as u32, c as u32),
                _ => tracing::debug!(id = entity.id, "Skipping malformed triangle"),
            }
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcTriangulatedFaceSet]
    }
}

/// Handles IfcPolygonalFaceSet - polygon faces that need triangulation
#[derive(Debug, Default)]
pub struct PolygonalFaceSetProcessor;

impl PolygonalFaceSetProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryProcessor for PolygonalFaceSetProcessor {
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcPolygonalFaceSet: Coordinates, Closed, Faces, PnIndex
        let points = coordinate_list(decoder, entity.get(0))?;
        let remap = pn_index(entity.get(3));

        let faces_attr = entity
            .get(2)
            .ok_or_else(|| Error::geometry("PolygonalFaceSet missing Faces"))?;
        let faces = decoder.resolve_ref_list(faces_attr)?;

        let mut mesh = Mesh::new();
        for point in &points {
            mesh.add_vertex(*point);
        }

        for face in faces {
            // IfcIndexedPolygonalFace: CoordIndex (+ InnerCoordIndices with voids)
            let Some(outer) = face
                .get_list(0)
                .and_then(|f| resolve_indices(f, remap.as_deref(), points.len()))
            else {
                continue;
            };

            let inner: Vec<Vec<usize>> = if face.ifc_type == IfcType::IfcIndexedPolygonalFaceWithVoids {
                face.get_list(1)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|loop_| loop_.as_list())
                    .filter_map(|l| resolve_indices(l, remap.as_deref(), points.len()))
                    .collect()
            } else {
                Vec::new()
            };

            let outer_points: Vec<Point3<f64>> = outer.iter().map(|&i| points[i]).collect();
            let hole_points: Vec<Vec<Point3<f64>>> = inner
                .iter()
                .map(|l| l.iter().map(|&i| points[i]).collect())
                .collect();

            let triangles = match triangulate_face(&outer_points, &hole_points) {
                Ok(triangles) => triangles,
                Err(e) => {
                    tracing::debug!(id = face.id, error = %e, "Skipping face");
                    continue;
                }
            };

            // Triangle corners index the face's own loops; map back to the set
            let lookup: Vec<usize> = outer.iter().chain(inner.iter().flatten()).copied().collect();
            for tri in triangles.chunks_exact(3) {
                mesh.add_triangle(
                    lookup[tri[0]] as u32,
                    lookup[tri[1]] as u32,
                    lookup[tri[2]] as u32,
                );
            }
        }

        Ok(mesh)
    }

    fn supported_types(&self) -> Vec<IfcType> {
        vec![IfcType::IfcPolygonalFaceSet]
    }
}
