pub mod models;
pub mod postgrest;
pub mod repository;
pub mod store;

pub use postgrest::PostgrestClient;
pub use repository::Repository;
pub use store::{DataStore, Scope, StoreError, Table};
