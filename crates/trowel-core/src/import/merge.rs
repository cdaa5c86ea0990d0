//! Merge of an imported partial resource into an existing document

use crate::models::{Document, PartialResource, IS_RECORDED_IN};

/// Keys an import may never overwrite through the field map
pub const PROTECTED_FIELDS: [&str; 4] = ["id", "identifier", "relations", "category"];

/// Merge `additional` into a copy of `into`.
///
/// Field values of `additional` overwrite existing ones unless they are
/// undefined or protected. Relations are only touched when
/// `allow_overwrite_relations` is set, and even then the record keeps the
/// `isRecordedIn` relation it already has.
pub fn merge_document(
    into: &Document,
    additional: &PartialResource,
    allow_overwrite_relations: bool,
) -> Document {
    let mut merged = into.clone();

    for (name, value) in &additional.fields {
        if PROTECTED_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = value {
            merged.resource.fields.insert(name.clone(), value.clone());
        }
    }

    if allow_overwrite_relations {
        let mut relations = additional.relations.clone().unwrap_or_default();
        if let Some(recorded_in) = into.resource.relations.get(IS_RECORDED_IN) {
            relations.insert(IS_RECORDED_IN.to_string(), recorded_in.clone());
        }
        merged.resource.relations = relations;
    }

    merged
}
