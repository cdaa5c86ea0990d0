//! Change-history merging after conflict resolution

use std::collections::HashSet;

use crate::models::{Action, Document};

/// Merge the change history of `other` into `into`.
///
/// `into.created` is provenance and stays as is.
pub fn merge_change_histories(into: &mut Document, other: &Document) {
    into.modified = merged_modifications(
        &into.created,
        &into.modified,
        &other.created,
        &other.modified,
    );
}

/// Union of both modification lists, deduplicated by `(user, date)` and sorted
/// oldest first, ties broken by user so the result does not depend on argument
/// order.
///
/// When the other side was created independently, its creation survives as a
/// modification of the merged document.
pub fn merged_modifications(
    created: &Action,
    modified: &[Action],
    other_created: &Action,
    other_modified: &[Action],
) -> Vec<Action> {
    let other_creation = (other_created != created).then_some(other_created);

    let mut seen = HashSet::new();
    let mut merged: Vec<Action> = modified
        .iter()
        .chain(other_modified)
        .chain(other_creation)
        .filter(|action| seen.insert((action.user.clone(), action.date)))
        .cloned()
        .collect();
    merged.sort_by(|a, b| (a.date, &a.user).cmp(&(b.date, &b.user)));
    merged
}
