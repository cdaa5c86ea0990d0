use std::collections::BTreeMap;

use serde::Deserialize;
use trowel_core::datastore::Datastore;
use trowel_core::models::Relations;
use trowel_core::services::{save_document, SaveOutcome};
use trowel_core::{Document, FieldValue, Resource, ResourceId};

use crate::commands::common::{parse_items, read_input, AppContext};
use crate::error::CliError;

/// Resource to create; the id is generated when omitted
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewResource {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub identifier: String,
    pub category: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub relations: Relations,
}

impl NewResource {
    pub fn into_resource(self) -> Resource {
        let mut resource = match self.id {
            Some(id) => Resource::with_id(id, self.identifier, self.category),
            None => Resource::new(self.identifier, self.category),
        };
        resource.fields = self.fields;
        resource.relations = self.relations;
        resource
    }
}

pub async fn run_put(context: &AppContext, source: &str, update: bool) -> Result<(), CliError> {
    let raw = read_input(source).await?;

    if update {
        for document in parse_items::<Document>(&raw)? {
            let outcome = save_document(&context.datastore, document, &context.config.user).await?;
            let saved = outcome.document();
            let revision = saved.revision.as_ref().map(ToString::to_string).unwrap_or_default();
            match &outcome {
                SaveOutcome::Saved(_) => println!("{}  {revision}", saved.resource.id),
                SaveOutcome::Conflicted(_) => println!(
                    "{}  {revision}  conflicted ({} revisions to resolve)",
                    saved.resource.id,
                    saved.conflicts.len()
                ),
            }
        }
        return Ok(());
    }

    for resource in parse_items::<NewResource>(&raw)? {
        let document = Document::new(resource.into_resource(), context.config.user.as_str());
        let created = context.datastore.create(document).await?;
        println!(
            "{}  {}",
            created.resource.id,
            created.revision.as_ref().map(ToString::to_string).unwrap_or_default()
        );
    }
    Ok(())
}
