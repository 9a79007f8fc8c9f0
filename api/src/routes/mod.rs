pub mod health;
pub mod ingest;
pub mod query;
pub mod router;
pub mod stats;
