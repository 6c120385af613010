// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loaded IFC model: file content, entity index and schema version.

use crate::decoder::{build_entity_index, EntityDecoder, EntityIndex};
use crate::error::{Error, Result};
use crate::parser::EntityScanner;
use crate::schema::{element_type, is_subtype_of, SchemaVersion};
use std::path::Path;
use std::sync::Arc;

/// An element instance found by a type query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: u32,
    /// Type keyword as written in the file
    pub type_name: String,
}

/// Outcome of asking the model for all elements of a named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeQuery {
    /// The name is not a product type of the model's schema
    Unsupported,
    /// Matching elements, subtypes included, in file order
    Elements(Vec<ElementRef>),
}

impl TypeQuery {
    /// Matching elements, empty when unsupported
    pub fn into_elements(self) -> Vec<ElementRef> {
        match self {
            TypeQuery::Unsupported => Vec::new(),
            TypeQuery::Elements(elements) => elements,
        }
    }
}

/// A parsed STEP/IFC model
pub struct IfcModel {
    source: String,
    content: String,
    schema: SchemaVersion,
    index: Arc<EntityIndex>,
}

impl IfcModel {
    /// Read and index a model from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::InvalidModel(format!("content is not UTF-8: {}", e)))?;
        Self::from_content(path.to_string_lossy(), content)
    }

    /// Index a model already in memory; `source` is reported back verbatim
    pub fn from_content(source: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let content = content.into();

        if !content.trim_start().starts_with("ISO-10303-21") {
            return Err(Error::InvalidModel("missing ISO-10303-21 header".to_string()));
        }
        if !content.contains("DATA;") {
            return Err(Error::InvalidModel("missing DATA section".to_string()));
        }

        let index = build_entity_index(&content);
        if index.is_empty() {
            return Err(Error::InvalidModel("no entity instances".to_string()));
        }

        let schema = SchemaVersion::detect(&content);
        tracing::debug!(
            source = %source,
            entities = index.len(),
            schema = %schema,
            "Indexed IFC model"
        );

        Ok(Self {
            source,
            content,
            schema,
            index: Arc::new(index),
        })
    }

    /// Path or label the model was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    pub fn entity_count(&self) -> usize {
        self.index.len()
    }

    /// Shared entity index, for per-thread decoders
    pub fn index(&self) -> Arc<EntityIndex> {
        Arc::clone(&self.index)
    }

    /// A fresh decoder over this model sharing its index
    pub fn decoder(&self) -> EntityDecoder<'_> {
        EntityDecoder::with_index(&self.content, Arc::clone(&self.index))
    }

    /// Ids of every instance of exactly `type_name` (no subtypes), in file order
    pub fn entities_named(&self, type_name: &str) -> Vec<u32> {
        EntityScanner::new(&self.content)
            .find_by_type(type_name)
            .into_iter()
            .map(|header| header.id)
            .collect()
    }

    /// All elements of a product type, subtypes included, in file order
    pub fn elements_of_type(&self, type_name: &str) -> TypeQuery {
        let Some(wanted) = element_type(type_name, self.schema) else {
            return TypeQuery::Unsupported;
        };

        let elements = EntityScanner::new(&self.content)
            .filter(|header| is_subtype_of(header.type_name, wanted.name, self.schema))
            .map(|header| ElementRef {
                id: header.id,
                type_name: header.type_name.to_string(),
            })
            .collect();

        TypeQuery::Elements(elements)
    }

    /// Ids of every IFCUNITASSIGNMENT, in file order
    pub fn unit_assignments(&self) -> Vec<u32> {
        self.entities_named("IFCUNITASSIGNMENT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(schema: &str, data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\nFILE_SCHEMA(('{}'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            schema, data
        )
    }

    #[test]
    fn test_rejects_non_step_content() {
        assert!(matches!(
            IfcModel::from_content("a.ifc", "hello"),
            Err(Error::InvalidModel(_))
        ));
        assert!(matches!(
            IfcModel::from_content("a.ifc", "ISO-10303-21;\nHEADER;\nENDSEC;\n"),
            Err(Error::InvalidModel(_))
        ));
        assert!(matches!(
            IfcModel::from_content("a.ifc", model("IFC4", "")),
            Err(Error::InvalidModel(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            IfcModel::open("/definitely/not/here.ifc"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_elements_of_type_includes_subtypes() {
        let content = model(
            "IFC4",
            "#1=IFCCOLUMN('a',$,$,$,$,$,$,$,$);\n\
             #2=IFCBEAM('b',$,$,$,$,$,$,$,$);\n\
             #3=IFCCOLUMNSTANDARDCASE('c',$,$,$,$,$,$,$,$);",
        );
        let model = IfcModel::from_content("tower.ifc", content).unwrap();
        assert_eq!(model.schema(), SchemaVersion::Ifc4);
        assert_eq!(model.source(), "tower.ifc");

        let ids: Vec<u32> = model
            .elements_of_type("IfcColumn")
            .into_elements()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        match model.elements_of_type("IfcBuildingElement") {
            TypeQuery::Elements(all) => assert_eq!(all.len(), 3),
            TypeQuery::Unsupported => panic!("IfcBuildingElement exists in IFC4"),
        }
    }

    #[test]
    fn test_unsupported_type_names() {
        let content = model("IFC2X3", "#1=IFCCOLUMN('a',$,$,$,$,$,$,$);");
        let model = IfcModel::from_content("old.ifc", content).unwrap();
        assert_eq!(model.elements_of_type("IfcNotAThing"), TypeQuery::Unsupported);
        assert_eq!(
            model.elements_of_type("IfcColumnStandardCase"),
            TypeQuery::Unsupported
        );
        assert_eq!(model.elements_of_type("IfcWall"), TypeQuery::Elements(vec![]));
    }

    #[test]
    fn test_unit_assignments_in_file_order() {
        let content = model(
            "IFC4",
            "#10=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);\n\
             #11=IFCUNITASSIGNMENT((#10));\n\
             #5=IFCUNITASSIGNMENT((#10));",
        );
        let model = IfcModel::from_content("units.ifc", content).unwrap();
        assert_eq!(model.unit_assignments(), vec![11, 5]);
        assert_eq!(model.entity_count(), 3);

        let mut decoder = model.decoder();
        assert_eq!(decoder.decode_by_id(10).unwrap().type_name, "IFCSIUNIT");
    }
}
