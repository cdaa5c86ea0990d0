use trowel_core::conflict::{revision_label, ConflictResolver, ResolverState};
use trowel_core::datastore::Datastore;
use trowel_core::ResourceId;

use crate::commands::common::{normalize_document_id, AppContext};
use crate::error::CliError;

pub async fn run_resolve(
    context: &AppContext,
    id: &str,
    right_fields: &[String],
    all_right: bool,
) -> Result<(), CliError> {
    let id = normalize_document_id(id)?;
    let document = context.datastore.get(&ResourceId::from(id.as_str())).await?;
    if !document.has_conflicts() {
        return Err(CliError::NoConflicts(id));
    }

    let mut resolver = ConflictResolver::new(&context.datastore, &context.config, document);
    resolver.load().await;

    while resolver.state() == ResolverState::Reviewing {
        if all_right {
            resolver.set_winning_side(true);
        } else {
            for field in right_fields {
                resolver.set_winning_side_for_field(field, true);
            }
        }

        if let Some(revision) = resolver.selected_revision() {
            let differing = resolver
                .differing_fields()
                .iter()
                .map(|field| field.label.as_str())
                .collect::<Vec<_>>();
            println!(
                "{}  [{}]  {:?} side wins: {}",
                revision_label(revision),
                revision.revision.as_ref().map(ToString::to_string).unwrap_or_default(),
                resolver.winning_side(),
                if differing.is_empty() {
                    "no differences".to_string()
                } else {
                    differing.join(", ")
                }
            );
        }
        resolver.solve_conflict().await?;
    }

    for message in resolver.messages() {
        eprintln!("Warning: {message}");
    }
    if resolver.inspected().is_empty() {
        return Err(CliError::NoConflicts(id));
    }

    let saved = resolver.commit().await?;
    println!(
        "{}  {}  remaining conflicts: {}",
        saved.resource.id,
        saved.revision.as_ref().map(ToString::to_string).unwrap_or_default(),
        saved.conflicts.len()
    );
    Ok(())
}
