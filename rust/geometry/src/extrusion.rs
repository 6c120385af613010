// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D profiles to 3D meshes

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::profile::{Profile2D, Triangulation};
use nalgebra::{Matrix4, Point2, Point3};

/// Extrude a 2D profile along the Z axis
///
/// `transform` maps the local extrusion space (profile in XY, depth along
/// +Z) into the caller's frame.
pub fn extrude_profile(
    profile: &Profile2D,
    depth: f64,
    transform: Option<Matrix4<f64>>,
) -> Result<Mesh> {
    if !(depth > 0.0) {
        return Err(Error::InvalidExtrusion(format!(
            "Depth must be positive, got {}",
            depth
        )));
    }

    let triangulation = profile.triangulate()?;

    let side_vertex_count = (profile.outer.len()
        + profile.holes.iter().map(|h| h.len()).sum::<usize>())
        * 4;
    let mut mesh = Mesh::with_capacity(
        triangulation.points.len() * 2 + side_vertex_count,
        triangulation.indices.len() * 2 + side_vertex_count * 3 / 2,
    );

    create_cap_mesh(&triangulation, 0.0, true, &mut mesh);
    create_cap_mesh(&triangulation, depth, false, &mut mesh);

    create_side_walls(&profile.outer, depth, &mut mesh);
    for hole in &profile.holes {
        create_side_walls(hole, depth, &mut mesh);
    }

    if let Some(mat) = transform {
        mesh.transform(&mat);
    }

    Ok(mesh)
}

/// Create a cap mesh (top or bottom) from triangulation
fn create_cap_mesh(triangulation: &Triangulation, z: f64, flip: bool, mesh: &mut Mesh) {
    let base_index = mesh.vertex_count() as u32;

    for point in &triangulation.points {
        mesh.add_vertex(Point3::new(point.x, point.y, z));
    }

    for tri in triangulation.indices.chunks_exact(3) {
        let i0 = base_index + tri[0] as u32;
        let i1 = base_index + tri[1] as u32;
        let i2 = base_index + tri[2] as u32;

        // Bottom cap faces down
        if flip {
            mesh.add_triangle(i0, i2, i1);
        } else {
            mesh.add_triangle(i0, i1, i2);
        }
    }
}

/// Create side walls for a profile boundary
fn create_side_walls(boundary: &[Point2<f64>], depth: f64, mesh: &mut Mesh) {
    for (i, p0) in boundary.iter().enumerate() {
        let p1 = &boundary[(i + 1) % boundary.len()];

        // Duplicate consecutive points
        if (p1 - p0).norm_squared() < 1e-20 {
            continue;
        }

        let idx = mesh.add_vertex(Point3::new(p0.x, p0.y, 0.0));
        mesh.add_vertex(Point3::new(p1.x, p1.y, 0.0));
        mesh.add_vertex(Point3::new(p1.x, p1.y, depth));
        mesh.add_vertex(Point3::new(p0.x, p0.y, depth));

        mesh.add_triangle(idx, idx + 1, idx + 2);
        mesh.add_triangle(idx, idx + 2, idx + 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{create_circle, create_rectangle};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_extrude_rectangle() {
        let profile = create_rectangle(10.0, 5.0);
        let mesh = extrude_profile(&profile, 20.0, None).unwrap();

        // 2 caps of 4 vertices plus 4 side quads
        assert_eq!(mesh.vertex_count(), 8 + 16);
        assert_eq!(mesh.triangle_count(), 4 + 8);

        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, -5.0);
        assert_relative_eq!(max.x, 5.0);
        assert_relative_eq!(min.y, -2.5);
        assert_relative_eq!(max.y, 2.5);
        assert_relative_eq!(min.z, 0.0);
        assert_relative_eq!(max.z, 20.0);
    }

    #[test]
    fn test_extrude_with_transform() {
        let profile = create_rectangle(10.0, 5.0);
        let transform = Matrix4::new_translation(&Vector3::new(100.0, 200.0, 300.0));

        let mesh = extrude_profile(&profile, 20.0, Some(transform)).unwrap();

        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 95.0);
        assert_relative_eq!(max.y, 202.5);
        assert_relative_eq!(min.z, 300.0);
        assert_relative_eq!(max.z, 320.0);
    }

    #[test]
    fn test_extrude_hollow_circle() {
        let profile = create_circle(10.0, Some(5.0));
        let mesh = extrude_profile(&profile, 15.0, None).unwrap();

        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(max.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(min.x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(max.z, 15.0);
        assert!(mesh.triangle_count() > 4 * 24);
    }

    #[test]
    fn test_invalid_depth() {
        let profile = create_rectangle(10.0, 5.0);
        assert!(extrude_profile(&profile, -1.0, None).is_err());
        assert!(extrude_profile(&profile, 0.0, None).is_err());
        assert!(extrude_profile(&profile, f64::NAN, None).is_err());
    }
}
