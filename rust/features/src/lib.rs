// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Column QA Features
//!
//! Geometric feature extraction for structural columns: every requested
//! element of an IFC model is meshed by a [`GeometryKernel`], measured, and
//! summarized as a [`FeatureRecord`] of heights, footprint and ratios in
//! millimetres.
//!
//! ```no_run
//! use column_qa_features::{extract_file, DEFAULT_STRUCTURAL_TYPES};
//!
//! let records = extract_file("tower.ifc", DEFAULT_STRUCTURAL_TYPES)?;
//! for record in &records {
//!     println!("{:?}: {:?} mm", record.element_id, record.column_height_mm);
//! }
//! # Ok::<(), column_qa_features::Error>(())
//! ```
//!
//! Per-element problems never fail a run: the element's record simply has
//! its geometry fields absent. Only an unreadable model is an [`Error`].

pub mod assess;
pub mod convert;
pub mod error;
pub mod extents;
pub mod features;
pub mod pipeline;
pub mod vector;

pub use assess::{assess, LeaningStatus, TiltAssessment, TiltClassifier, TiltRegressor};
pub use convert::{convert_to_mm, kernel_to_mm, MeasurementSource};
pub use error::{Error, Result};
pub use extents::{BoundingBox, DegradedReason, ElementGeometry, Extents, MeshExtents};
pub use features::{derive_features, DerivedFeatures, FeatureRecord, FEATURE_COUNT, FEATURE_NAMES};
pub use pipeline::{
    extract_file, ExtractOptions, ExtractionPipeline, FeatureRecords, DEFAULT_STRUCTURAL_TYPES,
};
pub use vector::fit_to_width;

pub use column_qa_core::{IfcModel, LengthUnit};
pub use column_qa_geometry::{GeometryKernel, GeometryRouter};
