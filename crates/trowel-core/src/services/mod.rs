//! Document workflows built on the datastore

mod save;

pub use save::{save_document, SaveOutcome};
