// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Column QA Geometry
//!
//! Turns IFC products into world-space triangle meshes in metres, using
//! earcutr for triangulation and nalgebra for transformations. The
//! [`GeometryKernel`] trait is the seam the feature extraction depends on;
//! [`GeometryRouter`] is the shipped implementation.

pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod placement;
pub mod processors;
pub mod profile;
pub mod profiles;
pub mod router;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use extrusion::extrude_profile;
pub use mesh::Mesh;
pub use placement::{local_placement_transform, MAX_PLACEMENT_DEPTH};
pub use processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, PolygonalFaceSetProcessor,
    TriangulatedFaceSetProcessor,
};
pub use profile::Profile2D;
pub use profiles::ProfileProcessor;
pub use router::{GeometryKernel, GeometryProcessor, GeometryRouter};
pub use triangulation::triangulate_face;
