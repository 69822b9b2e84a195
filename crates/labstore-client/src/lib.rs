//! Persistence for the storage hierarchy: the [`StorageBackend`] seam, its
//! HTTP implementation against `/rest/storage` and an in-memory stand-in.

mod backend;
mod error;
mod http;
mod memory;

pub use backend::{ListFilter, StorageBackend};
pub use error::BackendError;
pub use http::{
    API_PREFIX, CSRF_HEADER, HttpBackend, RequestConfig, collection_path, list_query, node_path,
};
pub use memory::{Endpoint, Hold, InMemoryBackend, RecordedRequest};
