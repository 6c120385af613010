// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction pipeline: one feature record per requested element.
//!
//! The model is parsed once and its length unit resolved once per call.
//! Elements are then measured one at a time (or fanned out over rayon by
//! [`ExtractionPipeline::extract_parallel`]). A failure on one element
//! degrades that element's record; only model-level problems are errors.

use crate::error::Result;
use crate::extents::{DegradedReason, ElementGeometry};
use crate::features::FeatureRecord;
use column_qa_core::{
    resolve_length_unit, resolve_length_unit_strict, ElementRef, EntityDecoder, IfcModel,
    LengthUnit, TypeQuery,
};
use column_qa_geometry::{GeometryKernel, GeometryRouter};
use rayon::prelude::*;
use std::path::Path;

/// Structural types extracted when the caller names none
pub const DEFAULT_STRUCTURAL_TYPES: &[&str] = &["IfcColumn"];

/// Extraction settings
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Fail instead of assuming millimetres when no length unit is declared
    pub strict_units: bool,
}

/// Measures elements of a model through a geometry kernel
#[derive(Debug)]
pub struct ExtractionPipeline<K> {
    kernel: K,
    options: ExtractOptions,
}

impl ExtractionPipeline<GeometryRouter> {
    /// Pipeline using the built-in kernel scaled for `model`
    pub fn for_model(model: &IfcModel, options: ExtractOptions) -> Self {
        Self::new(GeometryRouter::for_model(model), options)
    }
}

impl<K: GeometryKernel> ExtractionPipeline<K> {
    pub fn new(kernel: K, options: ExtractOptions) -> Self {
        Self { kernel, options }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Lazily measure every element of `types`, types in the order given
    pub fn extract<'m>(&'m self, model: &'m IfcModel, types: &[&str]) -> Result<FeatureRecords<'m, K>> {
        let (unit, elements) = self.plan(model, types)?;
        Ok(FeatureRecords {
            kernel: &self.kernel,
            decoder: model.decoder(),
            elements: elements.into_iter(),
            source: model.source(),
            unit,
        })
    }

    /// Same records as [`extract`](Self::extract), in the same order, with
    /// elements measured in parallel
    pub fn extract_parallel(&self, model: &IfcModel, types: &[&str]) -> Result<Vec<FeatureRecord>> {
        let (_, elements) = self.plan(model, types)?;
        let records: Vec<FeatureRecord> = elements
            .par_iter()
            .map(|element| {
                let mut decoder = model.decoder();
                measure_element(&self.kernel, &mut decoder, element, model.source())
            })
            .collect();

        tracing::info!(
            source = model.source(),
            records = records.len(),
            "Parallel extraction complete"
        );
        Ok(records)
    }

    /// Length unit the model declares, under this pipeline's strictness
    pub fn resolve_unit(&self, model: &IfcModel) -> Result<LengthUnit> {
        let mut decoder = model.decoder();
        let assignments = model.unit_assignments();
        if self.options.strict_units {
            Ok(resolve_length_unit_strict(&mut decoder, &assignments)?)
        } else {
            Ok(resolve_length_unit(&mut decoder, &assignments))
        }
    }

    /// Resolve the unit and enumerate the elements to measure
    fn plan(&self, model: &IfcModel, types: &[&str]) -> Result<(LengthUnit, Vec<ElementRef>)> {
        let unit = self.resolve_unit(model)?;

        let mut elements = Vec::new();
        for &type_name in types {
            match model.elements_of_type(type_name) {
                TypeQuery::Unsupported => {
                    tracing::warn!(
                        type_name,
                        schema = %model.schema(),
                        "Structural type not in schema, skipping"
                    );
                }
                TypeQuery::Elements(found) => {
                    tracing::debug!(type_name, count = found.len(), "Enumerated elements");
                    elements.extend(found);
                }
            }
        }

        tracing::info!(
            source = model.source(),
            schema = %model.schema(),
            unit = %unit,
            elements = elements.len(),
            "Starting extraction"
        );
        Ok((unit, elements))
    }
}

/// Decode, mesh and measure one element; never fails
fn measure_element<K: GeometryKernel>(
    kernel: &K,
    decoder: &mut EntityDecoder,
    element: &ElementRef,
    source: &str,
) -> FeatureRecord {
    let entity = match decoder.decode_by_id(element.id) {
        Ok(entity) => entity,
        Err(e) => {
            let reason = DegradedReason::Decode(e.to_string());
            tracing::debug!(id = element.id, %reason, "Degraded element");
            return FeatureRecord::new(None, &ElementGeometry::degraded(reason), source);
        }
    };
    let element_id = entity.global_id().map(str::to_string);

    let geometry = match kernel.create_shape(&entity, decoder) {
        Ok(mesh) => ElementGeometry::from_mesh(&mesh.positions),
        Err(e) => ElementGeometry::degraded(DegradedReason::Kernel(e.to_string())),
    };
    if let ElementGeometry::Degraded { reason } = &geometry {
        tracing::debug!(
            id = element.id,
            ifc_type = %element.type_name,
            %reason,
            "Degraded element"
        );
    }

    FeatureRecord::new(element_id, &geometry, source)
}

/// Lazy, single-pass sequence of feature records
pub struct FeatureRecords<'m, K> {
    kernel: &'m K,
    decoder: EntityDecoder<'m>,
    elements: std::vec::IntoIter<ElementRef>,
    source: &'m str,
    unit: LengthUnit,
}

impl<K> FeatureRecords<'_, K> {
    /// Length unit the model declares
    pub fn unit(&self) -> LengthUnit {
        self.unit
    }
}

impl<K: GeometryKernel> Iterator for FeatureRecords<'_, K> {
    type Item = FeatureRecord;

    fn next(&mut self) -> Option<FeatureRecord> {
        let element = self.elements.next()?;
        Some(measure_element(self.kernel, &mut self.decoder, &element, self.source))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.elements.size_hint()
    }
}

impl<K: GeometryKernel> ExactSizeIterator for FeatureRecords<'_, K> {}

/// Open `path`, measure `types` with the built-in kernel and collect
pub fn extract_file(path: impl AsRef<Path>, types: &[&str]) -> Result<Vec<FeatureRecord>> {
    let model = IfcModel::open(path)?;
    let pipeline = ExtractionPipeline::for_model(&model, ExtractOptions::default());
    let records = pipeline.extract(&model, types)?.collect();
    Ok(records)
}
