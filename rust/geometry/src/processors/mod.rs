// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Processors
//!
//! One processor per family of representation items:
//!
//! - `extrusion`: ExtrudedAreaSolid (the usual column body)
//! - `tessellated`: TriangulatedFaceSet, PolygonalFaceSet
//! - `brep`: FacetedBrep
//!
//! Items that wrap other items (mapped items, boolean results) are resolved
//! by the router, which owns the dispatch table.

mod brep;
mod extrusion;
mod tessellated;

pub use brep::FacetedBrepProcessor;
pub use extrusion::ExtrudedAreaSolidProcessor;
pub use tessellated::{PolygonalFaceSetProcessor, TriangulatedFaceSetProcessor};
