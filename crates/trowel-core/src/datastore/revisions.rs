//! Revision rules shared by every datastore

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Document, RevisionId};

/// How an incoming remote revision changes the stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteApply {
    /// The document was unknown locally
    Created(Document),
    /// The remote revision descends from the local one and replaces it
    Advanced { current: Document, previous: Document },
    /// The remote revision wins; the previous current revision becomes a conflict
    Won { current: Document, previous: Document },
    /// The local revision wins; the remote one is kept as a conflict
    Lost { current: Document, conflict: Document },
}

fn describe(revision: Option<&RevisionId>) -> String {
    revision.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn validate(document: &Document) -> Result<()> {
    if document.resource.identifier.trim().is_empty() {
        return Err(Error::InvalidInput("identifier must not be empty".to_string()));
    }
    if document.resource.category.trim().is_empty() {
        return Err(Error::InvalidInput("category must not be empty".to_string()));
    }
    Ok(())
}

/// Document as it is stored on creation
pub fn prepare_create(mut document: Document) -> Result<Document> {
    validate(&document)?;
    document.revision = Some(RevisionId::first());
    document.conflicts.clear();
    document.superseded.clear();
    Ok(document)
}

/// Document as it is stored after a conditional update of `current`.
///
/// The stored conflict list stays authoritative: revisions that arrived since
/// `document` was read are kept, `resolved` ones are dropped and recorded as
/// superseded so replicas drop them too.
pub fn prepare_update(
    current: &Document,
    mut document: Document,
    resolved: &[RevisionId],
) -> Result<Document> {
    if document.revision != current.revision {
        return Err(Error::SaveConflict {
            id: current.resource.id.to_string(),
            expected: describe(document.revision.as_ref()),
            actual: describe(current.revision.as_ref()),
        });
    }
    validate(&document)?;

    document.revision = Some(
        current
            .revision
            .as_ref()
            .map_or_else(RevisionId::first, RevisionId::next),
    );
    document.created = current.created.clone();

    let (dropped, kept): (Vec<RevisionId>, Vec<RevisionId>) = current
        .conflicts
        .iter()
        .cloned()
        .partition(|revision| resolved.contains(revision));
    document.conflicts = kept;
    document.superseded = current
        .superseded
        .iter()
        .chain(&current.revision)
        .chain(&dropped)
        .cloned()
        .collect();
    Ok(document)
}

/// Whether revision `a` beats revision `b`: higher generation, then higher id
pub fn wins(a: &RevisionId, b: &RevisionId) -> bool {
    (a.generation(), a) > (b.generation(), b)
}

/// Open conflicts after merging two replicas' views of a document, ordered by
/// generation then id so every replica lists them identically.
fn merged_conflicts(
    current: &Document,
    incoming: &Document,
    winner: &RevisionId,
    loser: Option<&RevisionId>,
) -> Vec<RevisionId> {
    let superseded: HashSet<&RevisionId> = current
        .superseded
        .iter()
        .chain(&incoming.superseded)
        .collect();

    let mut conflicts: Vec<RevisionId> = current
        .conflicts
        .iter()
        .chain(&incoming.conflicts)
        .chain(loser)
        .filter(|revision| *revision != winner && !superseded.contains(revision))
        .cloned()
        .collect();
    conflicts.sort_by(|a, b| (a.generation(), a).cmp(&(b.generation(), b)));
    conflicts.dedup();
    conflicts
}

/// Reconcile a revision written on another replica with the local state.
///
/// Returns `None` when the revision is already known or superseded. A revision
/// descending from the local one replaces it; anything else is a concurrent
/// sibling and both replicas pick the same winner, so they converge on the
/// same current revision and conflicts.
pub fn reconcile_remote(
    current: Option<&Document>,
    incoming: Document,
) -> Result<Option<RemoteApply>> {
    let Some(incoming_revision) = incoming.revision.clone() else {
        return Err(Error::InvalidInput(format!(
            "remote document {} has no revision",
            incoming.resource.id
        )));
    };
    validate(&incoming)?;

    let Some(current) = current else {
        return Ok(Some(RemoteApply::Created(incoming)));
    };
    let Some(local_revision) = current.revision.as_ref() else {
        return Ok(Some(RemoteApply::Created(incoming)));
    };
    if local_revision == &incoming_revision
        || current.conflicts.contains(&incoming_revision)
        || current.supersedes(&incoming_revision)
    {
        return Ok(None);
    }

    let mut previous = current.clone();
    previous.conflicts.clear();

    if incoming.supersedes(local_revision) {
        let conflicts = merged_conflicts(current, &incoming, &incoming_revision, None);
        let mut advanced = incoming;
        advanced.conflicts = conflicts;
        return Ok(Some(RemoteApply::Advanced {
            current: advanced,
            previous,
        }));
    }

    if wins(&incoming_revision, local_revision) {
        let conflicts =
            merged_conflicts(current, &incoming, &incoming_revision, Some(local_revision));
        let mut winner = incoming;
        winner.conflicts = conflicts;
        Ok(Some(RemoteApply::Won {
            current: winner,
            previous,
        }))
    } else {
        let conflicts =
            merged_conflicts(current, &incoming, local_revision, Some(&incoming_revision));
        let mut winner = current.clone();
        winner.conflicts = conflicts;
        let mut conflict = incoming;
        conflict.conflicts.clear();
        Ok(Some(RemoteApply::Lost {
            current: winner,
            conflict,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Resource};
    use pretty_assertions::assert_eq;

    fn stored(revision: &str) -> Document {
        let mut document = Document::with_created(
            Resource::with_id("f1", "Find 1", "Find").with_field("shortDescription", "A"),
            Action::new("alice", 1),
        );
        document.revision = Some(RevisionId::from(revision));
        document
    }

    fn edited(base: &Document, revision: &str) -> Document {
        let mut document = base.clone();
        document.superseded = base.superseded.iter().chain(&base.revision).cloned().collect();
        document.revision = Some(RevisionId::from(revision));
        document.conflicts.clear();
        document
    }

    fn applied(current: &Document, incoming: Document) -> Document {
        match reconcile_remote(Some(current), incoming).unwrap() {
            Some(
                RemoteApply::Created(document)
                | RemoteApply::Advanced { current: document, .. }
                | RemoteApply::Won { current: document, .. }
                | RemoteApply::Lost { current: document, .. },
            ) => document,
            None => current.clone(),
        }
    }

    #[test]
    fn test_create_assigns_first_revision() {
        let mut document = stored("9-zzz");
        document.conflicts.push(RevisionId::from("2-x"));

        let created = prepare_create(document).unwrap();

        assert_eq!(created.revision.as_ref().map(RevisionId::generation), Some(1));
        assert!(created.conflicts.is_empty());
    }

    #[test]
    fn test_create_rejects_empty_identifier() {
        let document = Document::new(Resource::new("  ", "Find"), "alice");
        assert!(matches!(prepare_create(document), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_update_requires_current_revision() {
        let current = stored("2-b");
        let outdated = stored("1-a");

        let error = prepare_update(&current, outdated, &[]).unwrap_err();

        let Error::SaveConflict { expected, actual, .. } = error else {
            panic!("expected a save conflict");
        };
        assert_eq!((expected.as_str(), actual.as_str()), ("1-a", "2-b"));
    }

    #[test]
    fn test_update_keeps_stored_conflicts_and_provenance() {
        let mut current = stored("2-b");
        current.conflicts = vec![RevisionId::from("2-c"), RevisionId::from("2-d")];
        let mut edit = stored("2-b");
        edit.created = Action::new("mallory", 99);
        edit.conflicts.clear();

        let updated = prepare_update(&current, edit, &[RevisionId::from("2-c")]).unwrap();

        assert_eq!(updated.revision.as_ref().map(RevisionId::generation), Some(3));
        assert_eq!(updated.created, Action::new("alice", 1));
        assert_eq!(updated.conflicts, vec![RevisionId::from("2-d")]);
        assert_eq!(
            updated.superseded,
            vec![RevisionId::from("2-b"), RevisionId::from("2-c")]
        );
    }

    #[test]
    fn test_winner_by_generation_then_id() {
        assert!(wins(&RevisionId::from("3-a"), &RevisionId::from("2-z")));
        assert!(wins(&RevisionId::from("2-b"), &RevisionId::from("2-a")));
        assert!(!wins(&RevisionId::from("2-a"), &RevisionId::from("2-a")));
    }

    #[test]
    fn test_remote_loser_becomes_conflict() {
        let current = stored("2-b");
        let incoming = stored("2-a");

        let applied = reconcile_remote(Some(&current), incoming.clone()).unwrap();

        let mut expected = current;
        expected.conflicts = vec![RevisionId::from("2-a")];
        assert_eq!(
            applied,
            Some(RemoteApply::Lost {
                current: expected,
                conflict: incoming,
            })
        );
    }

    #[test]
    fn test_peers_converge() {
        let a = stored("2-a");
        let b = stored("2-b");

        let on_a = match reconcile_remote(Some(&a), b.clone()).unwrap() {
            Some(RemoteApply::Won { current, .. }) => current,
            other => panic!("unexpected {other:?}"),
        };
        let on_b = match reconcile_remote(Some(&b), a).unwrap() {
            Some(RemoteApply::Lost { current, .. }) => current,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(on_a, on_b);
        assert_eq!(on_a.conflicts, vec![RevisionId::from("2-a")]);
    }

    #[test]
    fn test_known_revision_is_ignored() {
        let mut current = stored("2-b");
        current.conflicts.push(RevisionId::from("2-a"));

        assert_eq!(reconcile_remote(Some(&current), stored("2-a")).unwrap(), None);
        assert_eq!(reconcile_remote(Some(&current), stored("2-b")).unwrap(), None);
    }

    #[test]
    fn test_remote_without_revision_is_rejected() {
        let document = Document::new(Resource::new("A", "Find"), "alice");
        assert!(reconcile_remote(None, document).is_err());
    }

    #[test]
    fn test_replicated_edit_advances_without_conflict() {
        let base = stored("1-a");
        let remote = edited(&base, "2-x");

        let applied = reconcile_remote(Some(&base), remote.clone()).unwrap();

        assert_eq!(
            applied,
            Some(RemoteApply::Advanced {
                current: remote,
                previous: base,
            })
        );
    }

    #[test]
    fn test_superseded_revision_is_ignored() {
        let base = stored("1-a");
        let current = edited(&base, "2-x");

        assert_eq!(reconcile_remote(Some(&current), base).unwrap(), None);
    }

    #[test]
    fn test_replicated_resolution_clears_conflicts() {
        let base = stored("1-a");
        let mut conflicted = edited(&base, "2-b");
        conflicted.conflicts = vec![RevisionId::from("2-a")];

        let resolved =
            prepare_update(&conflicted, conflicted.clone(), &[RevisionId::from("2-a")]).unwrap();
        let on_peer = applied(&conflicted, resolved.clone());

        assert_eq!(on_peer, resolved);
        assert!(on_peer.conflicts.is_empty());
    }

    #[test]
    fn test_replicated_edit_on_conflict_branch_supersedes_it() {
        let base = stored("1-a");
        let losing = edited(&base, "2-a");
        let mut current = edited(&base, "2-b");
        current.conflicts = vec![RevisionId::from("2-a")];

        let on_peer = applied(&current, edited(&losing, "3-a"));

        assert_eq!(on_peer.revision, Some(RevisionId::from("3-a")));
        assert_eq!(on_peer.conflicts, vec![RevisionId::from("2-b")]);
    }

    #[test]
    fn test_arrival_order_does_not_change_conflicts() {
        let base = stored("1-a");
        let local = edited(&base, "2-b");
        let from_c = edited(&base, "2-c");
        let from_d = edited(&base, "2-d");

        let c_then_d = applied(&applied(&local, from_c.clone()), from_d.clone());
        let d_then_c = applied(&applied(&local, from_d), from_c);

        assert_eq!(c_then_d, d_then_c);
        assert_eq!(c_then_d.revision, Some(RevisionId::from("2-d")));
        assert_eq!(
            c_then_d.conflicts,
            vec![RevisionId::from("2-b"), RevisionId::from("2-c")]
        );
    }
}
