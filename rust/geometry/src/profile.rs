// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Profile definitions and triangulation

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Point2};
use std::f64::consts::PI;

/// Segments used to approximate full circles
pub const CIRCLE_SEGMENTS: usize = 24;

/// 2D Profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile; a repeated closing point is dropped
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer: open_loop(outer),
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        let hole = open_loop(hole);
        if hole.len() >= 3 {
            self.holes.push(hole);
        }
    }

    /// Apply a 2D homogeneous transform to every point
    pub fn transform(&mut self, matrix: &Matrix3<f64>) {
        let apply = |p: &mut Point2<f64>| *p = matrix.transform_point(p);
        self.outer.iter_mut().for_each(apply);
        self.holes.iter_mut().flatten().for_each(apply);
    }

    /// Triangulate the profile using earcutr
    /// Returns triangle indices into the flattened vertex array
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(
                "Profile must have at least 3 vertices".to_string(),
            ));
        }

        let mut points = Vec::with_capacity(
            self.outer.len() + self.holes.iter().map(|h| h.len()).sum::<usize>(),
        );
        points.extend_from_slice(&self.outer);

        let mut hole_indices = Vec::with_capacity(self.holes.len());
        for hole in &self.holes {
            hole_indices.push(points.len());
            points.extend_from_slice(hole);
        }

        let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
        let indices = earcutr::earcut(&flat, &hole_indices, 2)
            .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated profile result
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices
    pub indices: Vec<usize>,
}

fn open_loop(mut points: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Create a rectangular profile centered at the origin
pub fn create_rectangle(width: f64, height: f64) -> Profile2D {
    let half_w = width / 2.0;
    let half_h = height / 2.0;

    Profile2D::new(vec![
        Point2::new(-half_w, -half_h),
        Point2::new(half_w, -half_h),
        Point2::new(half_w, half_h),
        Point2::new(-half_w, half_h),
    ])
}

/// Points on a circle, counter-clockwise
pub fn circle_points(radius: f64) -> Vec<Point2<f64>> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Create a circular profile (with optional hole)
pub fn create_circle(radius: f64, hole_radius: Option<f64>) -> Profile2D {
    let mut profile = Profile2D::new(circle_points(radius));

    if let Some(hole_r) = hole_radius {
        let mut hole = circle_points(hole_r);
        hole.reverse();
        profile.add_hole(hole);
    }

    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_profile() {
        let profile = create_rectangle(10.0, 5.0);
        assert_eq!(profile.outer.len(), 4);
        assert!(profile.holes.is_empty());

        let tri = profile.triangulate().unwrap();
        assert_eq!(tri.indices.len(), 6);
    }

    #[test]
    fn test_closing_point_dropped() {
        let profile = Profile2D::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        ]);
        assert_eq!(profile.outer.len(), 3);
    }

    #[test]
    fn test_hollow_circle_triangulates() {
        let profile = create_circle(10.0, Some(5.0));
        assert_eq!(profile.holes.len(), 1);

        let tri = profile.triangulate().unwrap();
        assert_eq!(tri.points.len(), 2 * CIRCLE_SEGMENTS);
        assert_eq!(tri.indices.len() % 3, 0);
        assert!(tri.indices.len() > CIRCLE_SEGMENTS * 3);
    }

    #[test]
    fn test_degenerate_profile() {
        let profile = Profile2D::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(profile.triangulate().is_err());
    }

    #[test]
    fn test_transform() {
        let mut profile = create_rectangle(2.0, 2.0);
        profile.transform(&Matrix3::new_translation(&nalgebra::Vector2::new(5.0, 0.0)));
        assert_eq!(profile.outer[0], Point2::new(4.0, -1.0));
    }
}
