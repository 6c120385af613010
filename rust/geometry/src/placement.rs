// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement parsing: axis placements, local placement chains and
//! cartesian transformation operators, all as homogeneous matrices.

use crate::{Error, Point3, Result, Vector3};
use column_qa_core::{AttributeValue, DecodedEntity, EntityDecoder, IfcType};
use nalgebra::{Matrix3, Matrix4, Point2};

/// Deepest `PlacementRelTo` chain followed before giving up
///
/// Guards against circular references in malformed files.
pub const MAX_PLACEMENT_DEPTH: usize = 100;

/// Coordinates of an IfcCartesianPoint (missing components are 0.0)
pub fn parse_cartesian_point(point: &DecodedEntity) -> Result<Point3<f64>> {
    if point.ifc_type != IfcType::IfcCartesianPoint {
        return Err(Error::geometry(format!(
            "Expected IfcCartesianPoint, got {}",
            point.type_name
        )));
    }
    let [x, y, z] = point
        .get(0)
        .and_then(|coords| coords.as_coordinates::<3>())
        .ok_or_else(|| Error::geometry(format!("#{} has no coordinates", point.id)))?;
    Ok(Point3::new(x, y, z))
}

/// Ratios of an IfcDirection
pub fn parse_direction(direction: &DecodedEntity) -> Result<Vector3<f64>> {
    if direction.ifc_type != IfcType::IfcDirection {
        return Err(Error::geometry(format!(
            "Expected IfcDirection, got {}",
            direction.type_name
        )));
    }
    let [x, y, z] = direction
        .get(0)
        .and_then(|ratios| ratios.as_coordinates::<3>())
        .ok_or_else(|| Error::geometry(format!("#{} has no direction ratios", direction.id)))?;
    Ok(Vector3::new(x, y, z))
}

/// Follow an optional point reference
fn resolve_point(decoder: &mut EntityDecoder, attr: Option<&AttributeValue>) -> Result<Option<Point3<f64>>> {
    match attr {
        Some(attr) => match decoder.resolve_ref(attr)? {
            Some(point) => parse_cartesian_point(&point).map(Some),
            None => Ok(None),
        },
        None => Ok(None),
    }
}

/// Follow an optional direction reference
fn resolve_direction(
    decoder: &mut EntityDecoder,
    attr: Option<&AttributeValue>,
) -> Result<Option<Vector3<f64>>> {
    match attr {
        Some(attr) => match decoder.resolve_ref(attr)? {
            Some(direction) => parse_direction(&direction).map(Some),
            None => Ok(None),
        },
        None => Ok(None),
    }
}

/// Orthonormal frame from a Z axis and an approximate X axis
fn orthonormal_axes(z_axis: Vector3<f64>, x_hint: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let z = z_axis.try_normalize(1e-12).unwrap_or_else(Vector3::z);

    // Project X onto the plane perpendicular to Z
    let projected = x_hint - z * x_hint.dot(&z);
    let x = projected.try_normalize(1e-6).unwrap_or_else(|| {
        // X and Z parallel: any perpendicular will do
        let helper = if z.z.abs() < 0.9 { Vector3::z() } else { Vector3::x() };
        helper.cross(&z).normalize()
    });
    let y = z.cross(&x).normalize();
    (x, y, z)
}

#[rustfmt::skip]
fn frame_matrix(x: Vector3<f64>, y: Vector3<f64>, z: Vector3<f64>, origin: Point3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        x.x, y.x, z.x, origin.x,
        x.y, y.y, z.y, origin.y,
        x.z, y.z, z.z, origin.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Parse IfcAxis2Placement3D (Location, Axis, RefDirection) into a transform
pub fn parse_axis2_placement_3d(
    placement: &DecodedEntity,
    decoder: &mut EntityDecoder,
) -> Result<Matrix4<f64>> {
    let location = resolve_point(decoder, placement.get(0))?.unwrap_or_else(Point3::origin);
    let z_axis = resolve_direction(decoder, placement.get(1))?.unwrap_or_else(Vector3::z);
    let x_axis = resolve_direction(decoder, placement.get(2))?.unwrap_or_else(Vector3::x);

    let (x, y, z) = orthonormal_axes(z_axis, x_axis);
    Ok(frame_matrix(x, y, z, location))
}

/// Parse IfcAxis2Placement2D (Location, RefDirection) into a 2D transform
pub fn parse_axis2_placement_2d(
    placement: &DecodedEntity,
    decoder: &mut EntityDecoder,
) -> Result<Matrix3<f64>> {
    let location = resolve_point(decoder, placement.get(0))?.unwrap_or_else(Point3::origin);
    let direction = resolve_direction(decoder, placement.get(1))?.unwrap_or_else(Vector3::x);

    let (cos, sin) = match nalgebra::Vector2::new(direction.x, direction.y).try_normalize(1e-10) {
        Some(d) => (d.x, d.y),
        None => (1.0, 0.0),
    };
    let origin = Point2::new(location.x, location.y);

    #[rustfmt::skip]
    let matrix = Matrix3::new(
        cos, -sin, origin.x,
        sin, cos, origin.y,
        0.0, 0.0, 1.0,
    );
    Ok(matrix)
}

/// Any IfcAxis2Placement3D reference, or identity when absent
pub fn resolve_axis2_placement_3d(
    decoder: &mut EntityDecoder,
    attr: Option<&AttributeValue>,
) -> Result<Matrix4<f64>> {
    let Some(attr) = attr else {
        return Ok(Matrix4::identity());
    };
    match decoder.resolve_ref(attr)? {
        Some(placement) if placement.ifc_type == IfcType::IfcAxis2Placement3D => {
            parse_axis2_placement_3d(&placement, decoder)
        }
        _ => Ok(Matrix4::identity()),
    }
}

/// Resolve an IfcLocalPlacement chain into its world transform
///
/// Other placement kinds (grid, linear) are treated as identity.
pub fn local_placement_transform(
    placement: &DecodedEntity,
    decoder: &mut EntityDecoder,
) -> Result<Matrix4<f64>> {
    let mut transform = Matrix4::identity();
    let mut current = Some(std::sync::Arc::new(placement.clone()));

    for _ in 0..=MAX_PLACEMENT_DEPTH {
        let Some(placement) = current.take() else {
            return Ok(transform);
        };
        if placement.ifc_type != IfcType::IfcLocalPlacement {
            return Ok(transform);
        }

        // IfcLocalPlacement: PlacementRelTo, RelativePlacement
        let local = resolve_axis2_placement_3d(decoder, placement.get(1))?;
        transform = local * transform;

        current = match placement.get(0) {
            Some(parent) => decoder.resolve_ref(parent)?,
            None => None,
        };
    }

    tracing::debug!(
        id = placement.id,
        depth = MAX_PLACEMENT_DEPTH,
        "Placement chain too deep, truncating"
    );
    Ok(transform)
}

/// Parse IfcCartesianTransformationOperator3D (and its non-uniform subtype)
///
/// Attributes: Axis1, Axis2, LocalOrigin, Scale, Axis3 (+ Scale2, Scale3).
pub fn parse_transformation_operator_3d(
    operator: &DecodedEntity,
    decoder: &mut EntityDecoder,
) -> Result<Matrix4<f64>> {
    let axis1 = resolve_direction(decoder, operator.get(0))?;
    let axis2 = resolve_direction(decoder, operator.get(1))?;
    let origin = resolve_point(decoder, operator.get(2))?.unwrap_or_else(Point3::origin);
    let axis3 = resolve_direction(decoder, operator.get(4))?;

    let scale = operator.get_float(3).unwrap_or(1.0);
    let (scale_y, scale_z) = if operator.ifc_type == IfcType::IfcCartesianTransformationOperator3DnonUniform {
        (
            operator.get_float(5).unwrap_or(scale),
            operator.get_float(6).unwrap_or(scale),
        )
    } else {
        (scale, scale)
    };

    let z_axis = axis3.unwrap_or_else(|| match (axis1, axis2) {
        (Some(x), Some(y)) => x.cross(&y),
        _ => Vector3::z(),
    });
    let x_axis = axis1.unwrap_or_else(Vector3::x);
    let (x, y, z) = orthonormal_axes(z_axis, x_axis);

    Ok(frame_matrix(x * scale, y * scale_y, z * scale_z, origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CHAIN: &str = r#"
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT($,#2);
#4=IFCCARTESIANPOINT((1000.,2000.,0.));
#5=IFCAXIS2PLACEMENT3D(#4,$,$);
#6=IFCLOCALPLACEMENT(#3,#5);
#7=IFCCARTESIANPOINT((0.,0.,3000.));
#8=IFCDIRECTION((0.,1.,0.));
#9=IFCDIRECTION((0.,0.,1.));
#10=IFCAXIS2PLACEMENT3D(#7,#9,#8);
#11=IFCLOCALPLACEMENT(#6,#10);
#12=IFCLOCALPLACEMENT(#12,#2);
#13=IFCAXIS2PLACEMENT2D(#4,#8);
#14=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#4,2.,$);
"#;

    #[test]
    fn test_local_placement_chain() {
        let mut decoder = EntityDecoder::new(CHAIN);
        let placement = decoder.decode_by_id(11).unwrap();
        let transform = local_placement_transform(&placement, &mut decoder).unwrap();

        // Rotated 90 degrees about Z, lifted to the storey
        let p = transform.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 2001.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 3000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_circular_placement_terminates() {
        let mut decoder = EntityDecoder::new(CHAIN);
        let placement = decoder.decode_by_id(12).unwrap();
        let transform = local_placement_transform(&placement, &mut decoder).unwrap();
        assert_eq!(transform, Matrix4::identity());
    }

    #[test]
    fn test_axis2_placement_2d() {
        let mut decoder = EntityDecoder::new(CHAIN);
        let placement = decoder.decode_by_id(13).unwrap();
        let transform = parse_axis2_placement_2d(&placement, &mut decoder).unwrap();
        let p = transform.transform_point(&Point2::new(1.0, 0.0));
        assert_relative_eq!(p.x, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 2001.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transformation_operator_scale() {
        let mut decoder = EntityDecoder::new(CHAIN);
        let operator = decoder.decode_by_id(14).unwrap();
        let transform = parse_transformation_operator_3d(&operator, &mut decoder).unwrap();
        let p = transform.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p.x, 1002.0);
        assert_relative_eq!(p.y, 2002.0);
        assert_relative_eq!(p.z, 2.0);
    }

    #[test]
    fn test_point_type_checked() {
        let mut decoder = EntityDecoder::new(CHAIN);
        let direction = decoder.decode_by_id(8).unwrap();
        assert!(parse_cartesian_point(&direction).is_err());
        assert_eq!(parse_direction(&direction).unwrap(), Vector3::y());
    }
}
