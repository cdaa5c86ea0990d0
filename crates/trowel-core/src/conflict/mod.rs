//! Conflict detection and resolution
//!
//! A conflict exists while a document lists revisions written concurrently on
//! other replicas. [`detect_conflict`] tells whether a save landed a new one;
//! [`ConflictResolver`] walks a human through them one revision at a time.

mod detect;
mod diff;
mod resolver;

pub use detect::detect_conflict;
pub use diff::{
    differing_fields, find_differing_fields, find_differing_relations, DifferingField, FieldKind,
};
pub use resolver::{revision_label, ConflictResolver, ResolverState, WinningSide};
