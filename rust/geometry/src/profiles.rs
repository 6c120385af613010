// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile Processors - IFC profile definitions to 2D contours
//!
//! Covers the sections structural columns are modelled with: solid and
//! hollow rectangles and circles, I-sections, and arbitrary closed outlines
//! (polylines or indexed poly curves, optionally with voids).

use crate::placement::parse_axis2_placement_2d;
use crate::profile::{circle_points, create_rectangle, Profile2D};
use crate::{Error, Result};
use column_qa_core::{AttributeValue, DecodedEntity, EntityDecoder, IfcType};
use nalgebra::Point2;
use std::f64::consts::PI;

/// Segments per half turn when flattening arcs
const ARC_SEGMENTS_PER_PI: f64 = 12.0;

/// Profile processor - processes IFC profiles into 2D contours
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileProcessor;

impl ProfileProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Process any supported IFC profile definition
    pub fn process(&self, profile: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Profile2D> {
        match profile.ifc_type {
            IfcType::IfcArbitraryClosedProfileDef | IfcType::IfcArbitraryProfileDefWithVoids => {
                self.process_arbitrary(profile, decoder)
            }
            _ => self.process_parametric(profile, decoder),
        }
    }

    /// Parametric profiles are centered on their Position (attribute 2)
    fn process_parametric(
        &self,
        profile: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Profile2D> {
        let mut contour = match profile.ifc_type {
            IfcType::IfcRectangleProfileDef => self.process_rectangle(profile)?,
            IfcType::IfcRectangleHollowProfileDef => self.process_rectangle_hollow(profile)?,
            IfcType::IfcCircleProfileDef => self.process_circle(profile)?,
            IfcType::IfcCircleHollowProfileDef => self.process_circle_hollow(profile)?,
            IfcType::IfcIShapeProfileDef => self.process_i_shape(profile)?,
            _ => {
                return Err(Error::InvalidProfile(format!(
                    "Unsupported profile type: {}",
                    profile.type_name
                )))
            }
        };

        if let Some(position) = profile.get(2) {
            if let Some(placement) = decoder.resolve_ref(position)? {
                if placement.ifc_type == IfcType::IfcAxis2Placement2D {
                    let transform = parse_axis2_placement_2d(&placement, decoder)?;
                    contour.transform(&transform);
                }
            }
        }

        Ok(contour)
    }

    fn dimension(&self, profile: &DecodedEntity, index: usize, name: &str) -> Result<f64> {
        match profile.get_float(index) {
            Some(value) if value.is_finite() && value > 0.0 => Ok(value),
            Some(value) => Err(Error::InvalidProfile(format!(
                "#{} {} must be positive, got {}",
                profile.id, name, value
            ))),
            None => Err(Error::InvalidProfile(format!(
                "#{} missing {}",
                profile.id, name
            ))),
        }
    }

    /// IfcRectangleProfileDef: ProfileType, ProfileName, Position, XDim, YDim
    fn process_rectangle(&self, profile: &DecodedEntity) -> Result<Profile2D> {
        let x_dim = self.dimension(profile, 3, "XDim")?;
        let y_dim = self.dimension(profile, 4, "YDim")?;
        Ok(create_rectangle(x_dim, y_dim))
    }

    /// IfcRectangleHollowProfileDef: ..., XDim, YDim, WallThickness, fillet radii
    fn process_rectangle_hollow(&self, profile: &DecodedEntity) -> Result<Profile2D> {
        let x_dim = self.dimension(profile, 3, "XDim")?;
        let y_dim = self.dimension(profile, 4, "YDim")?;
        let wall = self.dimension(profile, 5, "WallThickness")?;

        let inner_x = x_dim - 2.0 * wall;
        let inner_y = y_dim - 2.0 * wall;
        if inner_x <= 0.0 || inner_y <= 0.0 {
            return Err(Error::InvalidProfile(format!(
                "#{} WallThickness {} leaves no void in {} x {}",
                profile.id, wall, x_dim, y_dim
            )));
        }

        let mut result = create_rectangle(x_dim, y_dim);
        let mut inner = create_rectangle(inner_x, inner_y).outer;
        inner.reverse();
        result.add_hole(inner);
        Ok(result)
    }

    /// IfcCircleProfileDef: ProfileType, ProfileName, Position, Radius
    fn process_circle(&self, profile: &DecodedEntity) -> Result<Profile2D> {
        let radius = self.dimension(profile, 3, "Radius")?;
        Ok(Profile2D::new(circle_points(radius)))
    }

    /// IfcCircleHollowProfileDef: ..., Radius, WallThickness
    fn process_circle_hollow(&self, profile: &DecodedEntity) -> Result<Profile2D> {
        let radius = self.dimension(profile, 3, "Radius")?;
        let wall = self.dimension(profile, 4, "WallThickness")?;
        if wall >= radius {
            return Err(Error::InvalidProfile(format!(
                "#{} WallThickness {} exceeds Radius {}",
                profile.id, wall, radius
            )));
        }

        let mut result = Profile2D::new(circle_points(radius));
        let mut inner = circle_points(radius - wall);
        inner.reverse();
        result.add_hole(inner);
        Ok(result)
    }

    /// IfcIShapeProfileDef: ..., OverallWidth, OverallDepth, WebThickness, FlangeThickness, ...
    fn process_i_shape(&self, profile: &DecodedEntity) -> Result<Profile2D> {
        let overall_width = self.dimension(profile, 3, "OverallWidth")?;
        let overall_depth = self.dimension(profile, 4, "OverallDepth")?;
        let web_thickness = self.dimension(profile, 5, "WebThickness")?;
        let flange_thickness = self.dimension(profile, 6, "FlangeThickness")?;

        let half_width = overall_width / 2.0;
        let half_depth = overall_depth / 2.0;
        let half_web = web_thickness / 2.0;
        let inner = half_depth - flange_thickness;

        Ok(Profile2D::new(vec![
            // Bottom flange
            Point2::new(-half_width, -half_depth),
            Point2::new(half_width, -half_depth),
            Point2::new(half_width, -inner),
            // Right side of web
            Point2::new(half_web, -inner),
            Point2::new(half_web, inner),
            // Top flange
            Point2::new(half_width, inner),
            Point2::new(half_width, half_depth),
            Point2::new(-half_width, half_depth),
            Point2::new(-half_width, inner),
            // Left side of web
            Point2::new(-half_web, inner),
            Point2::new(-half_web, -inner),
            Point2::new(-half_width, -inner),
        ]))
    }

    /// IfcArbitraryClosedProfileDef: ProfileType, ProfileName, OuterCurve
    /// (+ InnerCurves for IfcArbitraryProfileDefWithVoids)
    fn process_arbitrary(
        &self,
        profile: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Profile2D> {
        let curve = profile
            .get(2)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::InvalidProfile(format!("#{} missing OuterCurve", profile.id)))?;

        let mut result = Profile2D::new(self.process_curve(&curve, decoder)?);

        if profile.ifc_type == IfcType::IfcArbitraryProfileDefWithVoids {
            if let Some(inner_curves) = profile.get(3) {
                for inner in decoder.resolve_ref_list(inner_curves)? {
                    result.add_hole(self.process_curve(&inner, decoder)?);
                }
            }
        }

        Ok(result)
    }

    /// Process a bounded 2D curve into points
    pub fn process_curve(
        &self,
        curve: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Vec<Point2<f64>>> {
        match curve.ifc_type {
            IfcType::IfcPolyline => self.process_polyline(curve, decoder),
            IfcType::IfcIndexedPolyCurve => self.process_indexed_polycurve(curve, decoder),
            _ => Err(Error::InvalidProfile(format!(
                "Unsupported curve type: {}",
                curve.type_name
            ))),
        }
    }

    /// IfcPolyline: Points
    fn process_polyline(
        &self,
        polyline: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Vec<Point2<f64>>> {
        let points_attr = polyline
            .get(0)
            .ok_or_else(|| Error::geometry("Polyline missing Points"))?;

        let points = decoder
            .resolve_ref_list(points_attr)?
            .iter()
            .filter(|p| p.ifc_type == IfcType::IfcCartesianPoint)
            .filter_map(|p| p.get(0).and_then(|c| c.as_coordinates::<2>()))
            .map(|[x, y]| Point2::new(x, y))
            .collect();
        Ok(points)
    }

    /// IfcIndexedPolyCurve: Points (IfcCartesianPointList2D), Segments, SelfIntersect
    fn process_indexed_polycurve(
        &self,
        curve: &DecodedEntity,
        decoder: &mut EntityDecoder,
    ) -> Result<Vec<Point2<f64>>> {
        let point_list = curve
            .get(0)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::geometry("IndexedPolyCurve missing Points"))?;

        let all_points: Vec<Point2<f64>> = point_list
            .get_list(0)
            .ok_or_else(|| Error::geometry("CartesianPointList2D missing CoordList"))?
            .iter()
            .filter_map(|coord| coord.as_coordinates::<2>())
            .map(|[x, y]| Point2::new(x, y))
            .collect();

        // No segments: the points in order
        let segments = match curve.get_list(1) {
            Some(segments) => segments,
            None => return Ok(all_points),
        };

        let mut result: Vec<Point2<f64>> = Vec::with_capacity(all_points.len());
        let mut push = |p: Point2<f64>| {
            if result.last() != Some(&p) {
                result.push(p);
            }
        };

        for segment in segments {
            // IFCLINEINDEX((1,2,...)) or IFCARCINDEX((1,2,3)), 1-based
            let (kind, indices) = match segment {
                AttributeValue::Typed(kind, args) => match args.first().and_then(|a| a.as_list()) {
                    Some(indices) => (kind.as_str(), indices),
                    None => continue,
                },
                AttributeValue::List(indices) => ("IFCLINEINDEX", indices.as_slice()),
                _ => continue,
            };
            let points: Vec<Point2<f64>> = indices
                .iter()
                .filter_map(|i| i.as_int())
                .filter_map(|i| usize::try_from(i - 1).ok())
                .filter_map(|i| all_points.get(i).copied())
                .collect();

            if kind.eq_ignore_ascii_case("IFCARCINDEX") && points.len() == 3 {
                approximate_arc_3pt(points[0], points[1], points[2])
                    .into_iter()
                    .for_each(&mut push);
            } else {
                points.into_iter().for_each(&mut push);
            }
        }

        Ok(result)
    }
}

/// Flatten the arc through three points
fn approximate_arc_3pt(p1: Point2<f64>, p2: Point2<f64>, p3: Point2<f64>) -> Vec<Point2<f64>> {
    let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));
    if d.abs() < 1e-12 {
        // Collinear
        return vec![p1, p2, p3];
    }

    let s1 = p1.x * p1.x + p1.y * p1.y;
    let s2 = p2.x * p2.x + p2.y * p2.y;
    let s3 = p3.x * p3.x + p3.y * p3.y;
    let center = Point2::new(
        (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d,
        (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d,
    );
    let radius = (p1 - center).norm();
    let angle_of = |p: Point2<f64>| (p.y - center.y).atan2(p.x - center.x);

    // Counter-clockwise when the turn p1 -> p2 -> p3 is to the left
    let ccw = (p2 - p1).perp(&(p3 - p2)) > 0.0;
    let start = angle_of(p1);
    let mut sweep = angle_of(p3) - start;
    if ccw && sweep <= 0.0 {
        sweep += 2.0 * PI;
    } else if !ccw && sweep >= 0.0 {
        sweep -= 2.0 * PI;
    }

    let segments = ((sweep.abs() / PI * ARC_SEGMENTS_PER_PI).ceil() as usize).max(2);
    let mut points: Vec<Point2<f64>> = (0..segments)
        .map(|i| {
            let angle = start + sweep * (i as f64) / (segments as f64);
            Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect();
    points.push(p3);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn process(content: &str, id: u32) -> Result<Profile2D> {
        let mut decoder = EntityDecoder::new(content);
        let entity = decoder.decode_by_id(id).unwrap();
        ProfileProcessor::new().process(&entity, &mut decoder)
    }

    fn extent(points: &[Point2<f64>]) -> (f64, f64, f64, f64) {
        points.iter().fold(
            (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
            |(x0, x1, y0, y1), p| (x0.min(p.x), x1.max(p.x), y0.min(p.y), y1.max(p.y)),
        )
    }

    #[test]
    fn test_rectangle_profile_with_position() {
        let content = r#"
#1=IFCCARTESIANPOINT((50.,0.));
#2=IFCAXIS2PLACEMENT2D(#1,$);
#3=IFCRECTANGLEPROFILEDEF(.AREA.,$,#2,100.0,200.0);
"#;
        let profile = process(content, 3).unwrap();
        assert_eq!(profile.outer.len(), 4);
        assert_eq!(extent(&profile.outer), (0.0, 100.0, -100.0, 100.0));
    }

    #[test]
    fn test_hollow_profiles() {
        let content = r#"
#1=IFCRECTANGLEHOLLOWPROFILEDEF(.AREA.,$,$,300.,200.,10.,$,$);
#2=IFCCIRCLEHOLLOWPROFILEDEF(.AREA.,$,$,150.,8.);
#3=IFCRECTANGLEHOLLOWPROFILEDEF(.AREA.,$,$,300.,200.,150.,$,$);
"#;
        let rect = process(content, 1).unwrap();
        assert_eq!(rect.holes.len(), 1);
        assert_eq!(extent(&rect.holes[0]), (-140.0, 140.0, -90.0, 90.0));

        let tube = process(content, 2).unwrap();
        assert_eq!(tube.outer.len(), 24);
        assert_eq!(tube.holes.len(), 1);

        assert!(process(content, 3).is_err());
    }

    #[test]
    fn test_i_shape_profile() {
        let content = "#1=IFCISHAPEPROFILEDEF(.AREA.,$,$,200.0,300.0,10.0,15.0,$,$,$);";
        let profile = process(content, 1).unwrap();
        assert_eq!(profile.outer.len(), 12);
        assert_eq!(extent(&profile.outer), (-100.0, 100.0, -150.0, 150.0));
    }

    #[test]
    fn test_arbitrary_polyline_profile() {
        let content = r#"
#1=IFCCARTESIANPOINT((0.0,0.0));
#2=IFCCARTESIANPOINT((100.0,0.0));
#3=IFCCARTESIANPOINT((100.0,100.0));
#4=IFCCARTESIANPOINT((0.0,100.0));
#5=IFCPOLYLINE((#1,#2,#3,#4,#1));
#6=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#5);
"#;
        let profile = process(content, 6).unwrap();
        // Closing point dropped
        assert_eq!(profile.outer.len(), 4);
    }

    #[test]
    fn test_indexed_polycurve_with_arc() {
        let content = r#"
#1=IFCCARTESIANPOINTLIST2D(((0.,0.),(100.,0.),(200.,100.),(100.,200.),(0.,200.)));
#2=IFCINDEXEDPOLYCURVE(#1,(IFCLINEINDEX((5,1,2)),IFCARCINDEX((2,3,4)),IFCLINEINDEX((4,5))),.F.);
#3=IFCARBITRARYCLOSEDPROFILEDEF(.AREA.,$,#2);
"#;
        let profile = process(content, 3).unwrap();
        assert!(profile.outer.len() > 5);

        let (min_x, max_x, min_y, max_y) = extent(&profile.outer);
        assert_relative_eq!(min_x, 0.0);
        assert_relative_eq!(max_x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(min_y, 0.0);
        assert_relative_eq!(max_y, 200.0);
    }

    #[test]
    fn test_unsupported_profile() {
        let content = "#1=IFCLSHAPEPROFILEDEF(.AREA.,$,$,100.,100.,10.,$,$,$,$);";
        assert!(matches!(process(content, 1), Err(Error::InvalidProfile(_))));
    }
}
