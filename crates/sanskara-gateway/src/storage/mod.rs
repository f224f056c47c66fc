//! Relational storage used to resolve and prime sessions.

mod http;
mod named;
pub mod queries;
mod sqlite;
mod store;

pub use http::HttpSqlStore;
pub use queries::{WeddingMembership, resolve_wedding};
pub use sqlite::SqliteStore;
pub use store::{Params, Row, Store, StoreError, params};
