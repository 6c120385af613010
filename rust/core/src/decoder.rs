// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Entities are decoded lazily from byte offsets and cached behind `Arc`, so
//! placement chains and shared profiles that many columns reference are only
//! tokenized once per decoder.

use crate::entity::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::{parse_entity, EntityScanner};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type (entity id -> byte range)
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content in one scan
pub fn build_entity_index(content: &str) -> EntityIndex {
    // Roughly one entity per 50 bytes
    let mut index = FxHashMap::with_capacity_and_hasher(content.len() / 50, Default::default());
    for header in EntityScanner::new(content) {
        index.insert(header.id, (header.start, header.end));
    }
    index
}

/// Entity decoder for lazy parsing
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Decoded entities by id
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    /// Built on first lookup unless supplied up front
    entity_index: Option<Arc<EntityIndex>>,
}

impl<'a> EntityDecoder<'a> {
    /// Create new decoder
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: None,
        }
    }

    /// Create decoder with a shared index (one decoder per worker thread)
    pub fn with_index(content: &'a str, index: Arc<EntityIndex>) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: Some(index),
        }
    }

    fn index(&mut self) -> &EntityIndex {
        let content = self.content;
        self.entity_index
            .get_or_insert_with(|| Arc::new(build_entity_index(content)))
    }

    /// Decode the entity spanning `start..end`
    pub fn decode_at(&mut self, start: usize, end: usize) -> Result<Arc<DecodedEntity>> {
        let line = self
            .content
            .get(start..end)
            .ok_or_else(|| Error::parse(start, "entity range outside content"))?;
        let (id, type_name, tokens) = parse_entity(line).map_err(|e| match e {
            Error::Parse { position, message } => Error::parse(start + position, message),
            other => other,
        })?;

        if let Some(entity) = self.cache.get(&id) {
            return Ok(Arc::clone(entity));
        }

        let attributes = tokens.iter().map(AttributeValue::from_token).collect();
        let entity = Arc::new(DecodedEntity::new(id, type_name, attributes));
        self.cache.insert(id, Arc::clone(&entity));
        Ok(entity)
    }

    /// Decode entity by id
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(Arc::clone(entity));
        }

        let (start, end) = self
            .index()
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Follow a `#id` attribute; `None` for anything else (null, derived, values)
    pub fn resolve_ref(&mut self, attr: &AttributeValue) -> Result<Option<Arc<DecodedEntity>>> {
        match attr.as_entity_ref() {
            Some(id) => Ok(Some(self.decode_by_id(id)?)),
            None => Ok(None),
        }
    }

    /// Resolve every reference in a list attribute, skipping non-references
    pub fn resolve_ref_list(&mut self, attr: &AttributeValue) -> Result<Vec<Arc<DecodedEntity>>> {
        let list = attr
            .as_list()
            .ok_or_else(|| Error::parse(0, "expected a list of references"))?;

        let mut entities = Vec::with_capacity(list.len());
        for item in list {
            if let Some(id) = item.as_entity_ref() {
                entities.push(self.decode_by_id(id)?);
            }
        }
        Ok(entities)
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Clear cache to free memory
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IfcType;

    const CONTENT: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCDIRECTION((0.,0.,1.));
#3=IFCAXIS2PLACEMENT3D(#1,#2,$);
#4 = IFCLOCALPLACEMENT($,#3);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_build_index() {
        let index = build_entity_index(CONTENT);
        assert_eq!(index.len(), 4);
        let (start, end) = index[&4];
        assert_eq!(&CONTENT[start..end], "#4 = IFCLOCALPLACEMENT($,#3);");
    }

    #[test]
    fn test_decode_by_id() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let placement = decoder.decode_by_id(3).unwrap();
        assert_eq!(placement.ifc_type, IfcType::IfcAxis2Placement3D);
        assert_eq!(placement.get_ref(0), Some(1));
        assert!(placement.get(2).unwrap().is_null());

        let point = decoder.resolve_ref(placement.get(0).unwrap()).unwrap().unwrap();
        assert_eq!(point.get(0).unwrap().as_coordinates::<3>(), Some([0.0, 0.0, 0.0]));
        assert_eq!(decoder.cache_size(), 2);
    }

    #[test]
    fn test_cache_is_shared() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let first = decoder.decode_by_id(2).unwrap();
        let second = decoder.decode_by_id(2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        decoder.clear_cache();
        assert_eq!(decoder.cache_size(), 0);
    }

    #[test]
    fn test_missing_entity() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert!(matches!(decoder.decode_by_id(99), Err(Error::EntityNotFound(99))));
        assert!(decoder.resolve_ref(&AttributeValue::Null).unwrap().is_none());
    }

    #[test]
    fn test_shared_index() {
        let index = Arc::new(build_entity_index(CONTENT));
        let mut decoder = EntityDecoder::with_index(CONTENT, Arc::clone(&index));
        let list = AttributeValue::List(vec![
            AttributeValue::EntityRef(1),
            AttributeValue::Null,
            AttributeValue::EntityRef(2),
        ]);
        let resolved = decoder.resolve_ref_list(&list).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].ifc_type, IfcType::IfcDirection);
    }
}
