// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Router - Dynamic dispatch to geometry processors
//!
//! Routes IFC representation items to the processor registered for their
//! type, resolves mapped items and boolean results, applies the element
//! placement and scales the result to metres.

use crate::placement::{
    local_placement_transform, parse_transformation_operator_3d, resolve_axis2_placement_3d,
};
use crate::processors::{
    ExtrudedAreaSolidProcessor, FacetedBrepProcessor, PolygonalFaceSetProcessor,
    TriangulatedFaceSetProcessor,
};
use crate::{Error, Mesh, Result};
use column_qa_core::{extract_length_unit_scale, DecodedEntity, EntityDecoder, IfcModel, IfcType};
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Nesting limit for mapped items and boolean operands
const MAX_ITEM_DEPTH: usize = 16;

/// Shape representation types that describe the element body
const BODY_REPRESENTATION_TYPES: &[&str] = &[
    "Body",
    "SweptSolid",
    "SolidModel",
    "Brep",
    "CSG",
    "Clipping",
    "SurfaceModel",
    "Tessellation",
    "MappedRepresentation",
    "AdvancedSweptSolid",
];

/// Geometry processor trait
/// Each processor handles one or more types of IFC representation item
pub trait GeometryProcessor: Send + Sync {
    /// Process entity into a mesh in file units, item coordinates
    fn process(&self, entity: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh>;

    /// Get supported IFC types
    fn supported_types(&self) -> Vec<IfcType>;
}

/// Turns a product into a world-space mesh in metres
pub trait GeometryKernel: Send + Sync {
    fn create_shape(&self, element: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh>;
}

/// Geometry router - routes entities to processors
pub struct GeometryRouter {
    processors: FxHashMap<IfcType, Arc<dyn GeometryProcessor>>,
    /// Metres per file length unit, applied after placement
    unit_scale: f64,
}

impl Default for GeometryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeometryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryRouter")
            .field("processors", &self.processors.len())
            .field("unit_scale", &self.unit_scale)
            .finish()
    }
}

impl GeometryRouter {
    /// Create new router with default processors and no unit scaling
    pub fn new() -> Self {
        let mut router = Self {
            processors: FxHashMap::default(),
            unit_scale: 1.0,
        };

        router.register(Box::new(ExtrudedAreaSolidProcessor::new()));
        router.register(Box::new(TriangulatedFaceSetProcessor::new()));
        router.register(Box::new(PolygonalFaceSetProcessor::new()));
        router.register(Box::new(FacetedBrepProcessor::new()));

        router
    }

    /// Create router with an explicit metres-per-unit scale
    pub fn with_scale(unit_scale: f64) -> Self {
        let mut router = Self::new();
        router.unit_scale = unit_scale;
        router
    }

    /// Create router with the length unit scale declared by `model`
    pub fn for_model(model: &IfcModel) -> Self {
        let mut decoder = model.decoder();
        let scale = extract_length_unit_scale(&mut decoder, &model.unit_assignments());
        tracing::debug!(source = model.source(), scale, "Geometry unit scale");
        Self::with_scale(scale)
    }

    /// Metres per file length unit
    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// Register a processor for every type it supports
    pub fn register(&mut self, processor: Box<dyn GeometryProcessor>) {
        let processor: Arc<dyn GeometryProcessor> = Arc::from(processor);
        for ifc_type in processor.supported_types() {
            self.processors.insert(ifc_type, Arc::clone(&processor));
        }
    }

    /// Process building element (IfcColumn, IfcBeam, etc.) into a world mesh
    /// Follows the representation chain:
    /// Element → ProductDefinitionShape → ShapeRepresentation → Items
    pub fn process_element(&self, element: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        // IfcProduct: GlobalId, OwnerHistory, Name, Description, ObjectType, ObjectPlacement, Representation
        let representation = element
            .get(6)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::EmptyMesh(format!("#{} has no representation", element.id)))?;

        if representation.ifc_type != IfcType::IfcProductDefinitionShape {
            return Err(Error::geometry(format!(
                "Expected IfcProductDefinitionShape, got {}",
                representation.type_name
            )));
        }

        let representations_attr = representation.get(2).ok_or_else(|| {
            Error::geometry("IfcProductDefinitionShape missing Representations")
        })?;
        let representations = decoder.resolve_ref_list(representations_attr)?;

        let mut combined = Mesh::new();
        let mut attempted = 0usize;
        let mut last_error = None;

        for shape_rep in representations {
            if shape_rep.ifc_type != IfcType::IfcShapeRepresentation {
                continue;
            }
            // IfcShapeRepresentation: ContextOfItems, RepresentationIdentifier, RepresentationType, Items
            let is_body = match shape_rep.get_string(2) {
                Some(rep_type) => BODY_REPRESENTATION_TYPES.contains(&rep_type),
                None => shape_rep.get_string(1) == Some("Body"),
            };
            if !is_body {
                continue;
            }

            let Some(items_attr) = shape_rep.get(3) else {
                continue;
            };
            for item in decoder.resolve_ref_list(items_attr)? {
                attempted += 1;
                match self.process_representation_item(&item, decoder, 0) {
                    Ok(mesh) => combined.merge(&mesh),
                    Err(e) => {
                        tracing::debug!(
                            element = element.id,
                            item = item.id,
                            ifc_type = %item.type_name,
                            error = %e,
                            "Skipping representation item"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        if combined.is_empty() {
            return Err(match last_error {
                Some(e) if attempted > 0 => e,
                _ => Error::EmptyMesh(format!("#{} has no body geometry", element.id)),
            });
        }

        // IfcProduct: ObjectPlacement
        if let Some(placement) = element
            .get(5)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
        {
            let transform = local_placement_transform(&placement, decoder)?;
            combined.transform(&transform);
        }

        if self.unit_scale != 1.0 {
            combined.scale(self.unit_scale);
        }
        Ok(combined)
    }

    /// Process a single representation item in item coordinates
    pub fn process_representation_item(
        &self,
        item: &DecodedEntity,
        decoder: &mut EntityDecoder,
        depth: usize,
    ) -> Result<Mesh> {
        if depth > MAX_ITEM_DEPTH {
            return Err(Error::geometry(format!(
                "#{} nested deeper than {} items",
                item.id, MAX_ITEM_DEPTH
            )));
        }

        match item.ifc_type {
            IfcType::IfcMappedItem => self.process_mapped_item(item, decoder, depth),
            IfcType::IfcBooleanResult | IfcType::IfcBooleanClippingResult => {
                // IfcBooleanResult: Operator, FirstOperand, SecondOperand
                let first = item
                    .get(1)
                    .map(|attr| decoder.resolve_ref(attr))
                    .transpose()?
                    .flatten()
                    .ok_or_else(|| Error::geometry(format!("#{} missing FirstOperand", item.id)))?;
                tracing::trace!(id = item.id, "Boolean result reduced to its first operand");
                self.process_representation_item(&first, decoder, depth + 1)
            }
            _ => match self.processors.get(&item.ifc_type) {
                Some(processor) => processor.process(item, decoder),
                None => Err(Error::geometry(format!(
                    "Unsupported representation item {}",
                    item.type_name
                ))),
            },
        }
    }

    /// Expand an IfcMappedItem: source items, mapping origin, then target operator
    fn process_mapped_item(
        &self,
        item: &DecodedEntity,
        decoder: &mut EntityDecoder,
        depth: usize,
    ) -> Result<Mesh> {
        // IfcMappedItem: MappingSource, MappingTarget
        let source = item
            .get(0)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::geometry("MappedItem missing MappingSource"))?;

        // IfcRepresentationMap: MappingOrigin, MappedRepresentation
        let origin = resolve_axis2_placement_3d(decoder, source.get(0))?;
        let mapped_rep = source
            .get(1)
            .map(|attr| decoder.resolve_ref(attr))
            .transpose()?
            .flatten()
            .ok_or_else(|| Error::geometry("RepresentationMap missing MappedRepresentation"))?;

        let items_attr = mapped_rep
            .get(3)
            .ok_or_else(|| Error::geometry("Representation missing Items"))?;

        let mut mesh = Mesh::new();
        for sub_item in decoder.resolve_ref_list(items_attr)? {
            match self.process_representation_item(&sub_item, decoder, depth + 1) {
                Ok(sub_mesh) => mesh.merge(&sub_mesh),
                Err(e) => tracing::debug!(item = sub_item.id, error = %e, "Skipping mapped item"),
            }
        }
        if mesh.is_empty() {
            return Err(Error::EmptyMesh(format!("#{} mapped no geometry", item.id)));
        }

        let target = match item.get(1).map(|attr| decoder.resolve_ref(attr)).transpose()? {
            Some(Some(operator)) => parse_transformation_operator_3d(&operator, decoder)?,
            _ => Matrix4::identity(),
        };
        mesh.transform(&(target * origin));
        Ok(mesh)
    }
}

impl GeometryKernel for GeometryRouter {
    fn create_shape(&self, element: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<Mesh> {
        self.process_element(element, decoder)
    }
}
