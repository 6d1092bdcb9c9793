pub mod auth;
pub mod config;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

pub use config::ApiConfig;
pub use postgres::PostgresDocumentStore;
pub use service::{AppState, build_router};
pub use store::{DocumentStore, InMemoryDocumentStore, ReviewOutcome, StoreError};
