//! `SQLite` datastore

mod connection;
mod migrations;
mod store;

pub use connection::Database;
pub use store::SqliteDatastore;
