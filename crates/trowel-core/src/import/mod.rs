//! Import of externally produced records
//!
//! Incoming partial resources are matched to stored documents by identifier
//! and merged under a protected-field policy.

mod merge;

pub use merge::{merge_document, PROTECTED_FIELDS};

use serde::Serialize;

use crate::datastore::Datastore;
use crate::error::{Error, Result};
use crate::index::{Query, IDENTIFIER_INDEX};
use crate::models::{Document, PartialResource, Resource};
use crate::services::{save_document, SaveOutcome};

/// What happened to one imported record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportStatus {
    Merged { id: String },
    Created { id: String },
    Conflicted { id: String },
    Failed { reason: String },
}

/// Per-record outcome of an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub identifier: String,
    #[serde(flatten)]
    pub status: ImportStatus,
}

/// Merge every record into the document with the same identifier.
///
/// Records without a stored counterpart are created when they carry a
/// category. Failures are reported per record and never abort the run.
pub async fn import_resources<D: Datastore + ?Sized>(
    datastore: &D,
    records: &[PartialResource],
    allow_overwrite_relations: bool,
    user: &str,
) -> Vec<ImportReport> {
    let mut reports = Vec::with_capacity(records.len());
    for record in records {
        let status = match import_one(datastore, record, allow_overwrite_relations, user).await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(identifier = %record.identifier, %error, "Import of record failed");
                ImportStatus::Failed {
                    reason: error.to_string(),
                }
            }
        };
        reports.push(ImportReport {
            identifier: record.identifier.clone(),
            status,
        });
    }
    reports
}

async fn import_one<D: Datastore + ?Sized>(
    datastore: &D,
    record: &PartialResource,
    allow_overwrite_relations: bool,
    user: &str,
) -> Result<ImportStatus> {
    let query = Query::default().with_constraint(IDENTIFIER_INDEX, record.identifier.as_str());
    let found = datastore.find(&query).await?;

    let existing = match found.documents.as_slice() {
        [] => None,
        [document] => Some(document),
        _ => {
            return Err(Error::InvalidInput(format!(
                "identifier {} is not unique",
                record.identifier
            )))
        }
    };

    if let Some(existing) = existing {
        let merged = merge_document(existing, record, allow_overwrite_relations);
        let id = merged.resource.id.to_string();
        return Ok(match save_document(datastore, merged, user).await? {
            SaveOutcome::Saved(_) => ImportStatus::Merged { id },
            SaveOutcome::Conflicted(_) => ImportStatus::Conflicted { id },
        });
    }

    let category = record.category.clone().ok_or_else(|| {
        Error::InvalidInput(format!(
            "no document with identifier {} and no category to create one",
            record.identifier
        ))
    })?;
    let mut resource = match &record.id {
        Some(id) => Resource::with_id(id.clone(), record.identifier.clone(), category),
        None => Resource::new(record.identifier.clone(), category),
    };
    for (name, value) in &record.fields {
        if PROTECTED_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if let Some(value) = value {
            resource.fields.insert(name.clone(), value.clone());
        }
    }
    resource.relations = record.relations.clone().unwrap_or_default();

    let created = datastore.create(Document::new(resource, user)).await?;
    Ok(ImportStatus::Created {
        id: created.resource.id.to_string(),
    })
}
