//! Location tracking: ping ingestion and the per-order trailing buffer.

pub mod buffer;
pub mod ingest;

pub use buffer::TrackingBuffer;
pub use ingest::{IngestConfig, LocationIngest};
