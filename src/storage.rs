//! Backend traits implemented by plugin authors.
//!
//! Implementations are pure request/response operations over the
//! generated wire types. They must be `Send + Sync` and make no
//! assumption about which task invokes them: the bridge dispatches
//! interleaved concurrent calls without serializing across contracts.

use thiserror::Error;
use tonic::Status;

use crate::protocol::{Operation, Span, TraceQueryParameters};

/// Domain failures a backend may report. Propagated to the host
/// verbatim as `BridgeError::Backend`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("trace {trace_id} not found")]
    TraceNotFound { trace_id: String },

    #[error("storage backend failure: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn internal(message: impl Into<String>) -> Self {
        StorageError::Internal(message.into())
    }
}

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TraceNotFound { .. } => Status::not_found(err.to_string()),
            StorageError::Internal(_) => Status::internal(err.to_string()),
        }
    }
}

/// Core reader contract. Mandatory.
#[tonic::async_trait]
pub trait SpanReader: Send + Sync + 'static {
    async fn get_trace(&self, trace_id: &str) -> Result<Vec<Span>, StorageError>;

    async fn get_services(&self) -> Result<Vec<String>, StorageError>;

    async fn get_operations(&self, service: &str) -> Result<Vec<Operation>, StorageError>;

    async fn find_traces(
        &self,
        query: TraceQueryParameters,
    ) -> Result<Vec<Vec<Span>>, StorageError>;

    async fn find_trace_ids(
        &self,
        query: TraceQueryParameters,
    ) -> Result<Vec<String>, StorageError>;
}

/// Core writer contract. Mandatory.
#[tonic::async_trait]
pub trait SpanWriter: Send + Sync + 'static {
    async fn write_span(&self, span: Span) -> Result<(), StorageError>;

    /// Flush barrier. Called by hosts that need write-then-read
    /// consistency before shutdown; a no-op for backends that write
    /// through.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Optional archive reader contract.
#[tonic::async_trait]
pub trait ArchiveSpanReader: Send + Sync + 'static {
    async fn get_archive_trace(&self, trace_id: &str) -> Result<Vec<Span>, StorageError>;
}

/// Optional archive writer contract.
#[tonic::async_trait]
pub trait ArchiveSpanWriter: Send + Sync + 'static {
    async fn write_archive_span(&self, span: Span) -> Result<(), StorageError>;
}

/// Optional streaming writer contract. The bridge drains the inbound
/// stream and feeds spans to the binding one at a time.
#[tonic::async_trait]
pub trait StreamingSpanWriter: Send + Sync + 'static {
    async fn write_span(&self, span: Span) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_not_found_maps_to_not_found_status() {
        let status: Status = StorageError::TraceNotFound {
            trace_id: "abc".to_string(),
        }
        .into();
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("abc"));
    }

    #[test]
    fn internal_maps_to_internal_status() {
        let status: Status = StorageError::internal("index corrupt").into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("index corrupt"));
    }
}
