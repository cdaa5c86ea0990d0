use trowel_core::datastore::Datastore;
use trowel_core::{ResourceId, RevisionId};

use crate::commands::common::{normalize_document_id, AppContext};
use crate::error::CliError;

pub async fn run_get(
    context: &AppContext,
    id: &str,
    revision: Option<&str>,
) -> Result<(), CliError> {
    let id = ResourceId::from(normalize_document_id(id)?);
    let document = match revision {
        Some(revision) => {
            context
                .datastore
                .get_revision(&id, &RevisionId::from(revision.trim()))
                .await?
        }
        None => context.datastore.get(&id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
