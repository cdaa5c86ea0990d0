//! Data models for Trowel

mod action;
mod document;
mod field_value;
mod ids;
mod resource;

pub use action::Action;
pub use document::Document;
pub use field_value::FieldValue;
pub use ids::{ResourceId, RevisionId};
pub use resource::{PartialResource, Relations, Resource, IS_RECORDED_IN, LIES_WITHIN};
