// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Column QA Core
//!
//! STEP/IFC model reading built with [nom](https://docs.rs/nom): the parts of
//! a model that column feature extraction needs, and nothing more.
//!
//! ## Overview
//!
//! - **STEP Tokenization**: zero-copy parsing of entity instances
//! - **Entity Scanning**: [memchr](https://docs.rs/memchr) accelerated entity
//!   discovery that is aware of string literals
//! - **Lazy Decoding**: on-demand attribute parsing with a shared cache
//! - **Type Queries**: subtype-inclusive "all elements of type X" lookups
//!   that reject names unknown to the model's schema release
//! - **Units**: the declared length unit and the metres-per-unit scale
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use column_qa_core::{resolve_length_unit, IfcModel, TypeQuery};
//!
//! let model = IfcModel::open("tower.ifc")?;
//! let mut decoder = model.decoder();
//! let unit = resolve_length_unit(&mut decoder, &model.unit_assignments());
//!
//! if let TypeQuery::Elements(columns) = model.elements_of_type("IfcColumn") {
//!     for column in columns {
//!         let entity = decoder.decode_by_id(column.id)?;
//!         println!("{:?} ({})", entity.global_id(), unit);
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for units and schema versions

pub mod decoder;
pub mod entity;
pub mod error;
pub mod model;
pub mod parser;
pub mod schema;
pub mod units;

pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use entity::{AttributeValue, DecodedEntity};
pub use error::{Error, Result};
pub use model::{ElementRef, IfcModel, TypeQuery};
pub use parser::{parse_entity, EntityHeader, EntityScanner, Token};
pub use schema::{element_type, is_subtype_of, ElementType, IfcType, SchemaVersion};
pub use units::{
    extract_length_unit_scale, get_si_prefix_multiplier, resolve_length_unit,
    resolve_length_unit_strict, LengthUnit,
};
