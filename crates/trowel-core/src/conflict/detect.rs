use crate::models::Document;

/// Whether `after` lists a conflicting revision that `before` did not know.
///
/// A shrinking conflict list is not a new conflict, and a document without
/// conflicts never is.
pub fn detect_conflict(before: &Document, after: &Document) -> bool {
    if after.conflicts.is_empty() {
        return false;
    }
    after
        .conflicts
        .iter()
        .any(|revision| !before.conflicts.contains(revision))
}
