use trowel_core::import::{import_resources, ImportStatus};
use trowel_core::models::PartialResource;

use crate::commands::common::{parse_items, read_input, AppContext};
use crate::error::CliError;

pub async fn run_import(
    context: &AppContext,
    source: &str,
    overwrite_relations: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let raw = read_input(source).await?;
    let records = parse_items::<PartialResource>(&raw)?;

    let reports = import_resources(
        &context.datastore,
        &records,
        overwrite_relations,
        &context.config.user,
    )
    .await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let outcome = match &report.status {
            ImportStatus::Merged { id } => format!("merged into {id}"),
            ImportStatus::Created { id } => format!("created {id}"),
            ImportStatus::Conflicted { id } => format!("merged into {id}, conflicted"),
            ImportStatus::Failed { reason } => format!("failed: {reason}"),
        };
        println!("{:<24}  {outcome}", report.identifier);
    }
    Ok(())
}
