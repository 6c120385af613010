// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Planar 3D faces are projected onto their best-fit plane and handed to
//! earcutr.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Polygon normal by Newell's method (robust for non-convex loops)
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    normal.try_normalize(1e-12).unwrap_or_else(Vector3::z)
}

/// Project points onto the plane through `origin` perpendicular to `normal`
fn project_to_2d(
    points: &[Point3<f64>],
    normal: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Vec<Point2<f64>> {
    // Axis least parallel to the normal gives a stable basis
    let reference = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    points
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect()
}

/// Triangulate a planar 3D face with optional holes
///
/// Returns triangle indices into `outer` followed by every hole, in order.
pub fn triangulate_face(outer: &[Point3<f64>], holes: &[Vec<Point3<f64>>]) -> Result<Vec<usize>> {
    let n = outer.len();
    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    // Triangles need no work
    if n == 3 && holes.is_empty() {
        return Ok(vec![0, 1, 2]);
    }

    let normal = calculate_polygon_normal(outer);
    let mut flat = Vec::with_capacity(2 * (n + holes.iter().map(|h| h.len()).sum::<usize>()));
    let mut hole_indices = Vec::with_capacity(holes.len());

    for p in project_to_2d(outer, &normal, &outer[0]) {
        flat.extend_from_slice(&[p.x, p.y]);
    }
    for hole in holes {
        hole_indices.push(flat.len() / 2);
        for p in project_to_2d(hole, &normal, &outer[0]) {
            flat.extend_from_slice(&[p.x, p.y]);
        }
    }

    earcutr::earcut(&flat, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}
