//! Archival boundary: the completed-record document, the sink trait
//! the dispatcher hands it to, and the HTTP backend implementation.

pub mod http;
pub mod record;
pub mod sink;

pub use http::HttpArchiveSink;
pub use record::{CallMetadata, ConsentBlock, IntakeRecord, SectionResponses};
pub use sink::{ArchivalSink, ArchiveError, NullSink};
