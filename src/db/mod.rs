//! SQLite persistence: connection setup, versioned schema, and the
//! [`Repository`] implementing every storage trait.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
