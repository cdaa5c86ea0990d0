use trowel_core::datastore::Datastore;

use crate::commands::common::{
    document_to_list_item, format_timestamp, AppContext, DocumentListItem,
};
use crate::error::CliError;

pub async fn run_conflicts(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let documents = context.datastore.find_conflicted().await?;

    if as_json {
        let items = documents
            .iter()
            .map(document_to_list_item)
            .collect::<Vec<DocumentListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for document in &documents {
        println!(
            "{}  {}  modified {}  revisions: {}",
            document.resource.id,
            document.resource.identifier,
            format_timestamp(document.sort_date()),
            document
                .conflicts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}
