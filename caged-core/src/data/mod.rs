//! Data acquisition and schema normalization

pub mod cache;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ftp;
pub mod http;
pub mod loader;
pub mod lookup;
pub mod normalize;
pub mod schema;
pub mod transport;

pub use cache::{ArchiveCache, CacheStatus};
pub use error::{ExtractionError, FetchError, ParseError, SchemaError, StageError, TransportError};
pub use extract::ArchiveExtractor;
pub use fetch::{ArchiveFetcher, MonthlyArchive, DEFAULT_BASE_URL};
pub use loader::{load, DEFAULT_ROW_CAP};
pub use normalize::{normalize, resolve_columns, ColumnResolution};
pub use schema::CanonicalSchema;
pub use transport::{transport_for, ArchiveTransport};
