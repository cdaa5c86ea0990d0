//! Field and relation differences between two revisions

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::ProjectConfig;
use crate::models::{Resource, ResourceId};

/// How a differing entry is presented and applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Field,
    Relation,
    Geometry,
    Georeference,
}

impl FieldKind {
    fn of_field(name: &str) -> Self {
        match name {
            "geometry" => Self::Geometry,
            "georeference" => Self::Georeference,
            _ => Self::Field,
        }
    }
}

/// One field or relation whose value differs between the live document
/// (left) and a conflicting revision (right)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifferingField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub right_side_winning: bool,
}

/// Names of fields whose values differ, including fields set on one side only
pub fn find_differing_fields(left: &Resource, right: &Resource) -> Vec<String> {
    let names: BTreeSet<&String> = left.fields.keys().chain(right.fields.keys()).collect();
    names
        .into_iter()
        .filter(|name| left.field(name) != right.field(name))
        .cloned()
        .collect()
}

/// Names of relations whose target lists differ.
///
/// An empty target list counts as an absent relation.
pub fn find_differing_relations(left: &Resource, right: &Resource) -> Vec<String> {
    let names: BTreeSet<&String> = left
        .relations
        .keys()
        .chain(right.relations.keys())
        .collect();
    names
        .into_iter()
        .filter(|name| targets(left, name) != targets(right, name))
        .cloned()
        .collect()
}

fn targets<'r>(resource: &'r Resource, relation: &str) -> &'r [ResourceId] {
    resource.relation(relation).unwrap_or_default()
}

/// Differing fields followed by differing relations, all won by the left side
pub fn differing_fields(
    left: &Resource,
    right: &Resource,
    config: &ProjectConfig,
) -> Vec<DifferingField> {
    let fields = find_differing_fields(left, right).into_iter().map(|name| DifferingField {
        label: config.field_label(&name),
        kind: FieldKind::of_field(&name),
        name,
        right_side_winning: false,
    });
    let relations = find_differing_relations(left, right)
        .into_iter()
        .map(|name| DifferingField {
            label: config.relation_label(&name),
            kind: FieldKind::Relation,
            name,
            right_side_winning: false,
        });
    fields.chain(relations).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, IS_RECORDED_IN, LIES_WITHIN};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn left() -> Resource {
        Resource::with_id("f1", "Find 1", "Find")
            .with_field("shortDescription", "Bowl")
            .with_field("material", "clay")
            .with_field(
                "geometry",
                FieldValue::Json(json!({"type": "Point", "coordinates": [1.0, 2.0]})),
            )
            .with_relation(IS_RECORDED_IN, &["t1"])
            .with_relation(LIES_WITHIN, &["s1", "s2"])
    }

    #[test]
    fn test_identical_resources_do_not_differ() {
        assert!(differing_fields(&left(), &left(), &ProjectConfig::default()).is_empty());
    }

    #[test]
    fn test_structural_field_comparison() {
        let mut right = left();
        right.fields.insert(
            "geometry".to_string(),
            FieldValue::Json(json!({"type": "Point", "coordinates": [1.0, 2.0]})),
        );
        right.fields.insert("material".to_string(), FieldValue::text("stone"));
        right.fields.remove("shortDescription");
        right.fields.insert("color".to_string(), FieldValue::text("red"));

        assert_eq!(
            find_differing_fields(&left(), &right),
            vec!["color", "material", "shortDescription"]
        );
    }

    #[test]
    fn test_relation_order_matters() {
        let right = left()
            .with_relation(LIES_WITHIN, &["s2", "s1"])
            .with_relation("isAfter", &[]);

        assert_eq!(find_differing_relations(&left(), &right), vec![LIES_WITHIN]);
    }

    #[test]
    fn test_kinds_and_labels() {
        let mut config = ProjectConfig::default();
        config
            .relation_labels
            .insert(LIES_WITHIN.to_string(), "Lies within".to_string());

        let mut right = left().with_relation(LIES_WITHIN, &["s3"]);
        right.fields.insert("geometry".to_string(), FieldValue::Json(json!(null)));

        let differing = differing_fields(&left(), &right, &config);

        assert_eq!(
            differing,
            vec![
                DifferingField {
                    name: "geometry".to_string(),
                    label: "Geometry".to_string(),
                    kind: FieldKind::Geometry,
                    right_side_winning: false,
                },
                DifferingField {
                    name: LIES_WITHIN.to_string(),
                    label: "Lies within".to_string(),
                    kind: FieldKind::Relation,
                    right_side_winning: false,
                },
            ]
        );
    }
}
