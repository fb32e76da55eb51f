pub mod config;
pub mod edi;
pub mod http;
pub mod ingest;
pub mod metrics_server;
pub mod observability;
pub mod store;
pub mod validate;

pub use ingest::{Envelope, IngestError, IngestOutcome, Ingestor};
