//! Local index layer
//!
//! Compound queries are answered without a query planner: every constraint is
//! a key-range lookup against a named index, and the per-constraint hits are
//! combined through [`ResultSets`] set algebra.

mod builder;
mod executor;
mod item;
mod key;
mod query;
mod result_sets;
mod store;

pub use builder::{
    tokenize, IndexBuilder, IndexEntry, CATEGORY_INDEX, DESCENDANTS_INDEX, FULLTEXT_INDEX,
    IDENTIFIER_INDEX,
};
pub use executor::QueryExecutor;
pub use item::IndexItem;
pub use key::{IndexKey, KeyPart};
pub use query::{Constraint, Query};
pub use result_sets::{CombineMode, ResultSets};
pub use store::IndexStore;
