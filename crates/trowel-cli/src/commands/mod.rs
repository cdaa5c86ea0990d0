pub mod common;
pub mod conflicts;
pub mod find;
pub mod get;
pub mod import;
pub mod put;
pub mod resolve;
