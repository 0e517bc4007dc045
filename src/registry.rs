//! Service registry for the storage plugin bridge.
//!
//! The contract set is fixed and versioned together with the wire
//! schema: two mandatory storage contracts plus the capability query,
//! and three optional contracts a plugin may leave unbound. The
//! [`StoragePlugin`] builder validates at construction time that every
//! mandatory contract has a binding, so a misconfigured plugin fails
//! before its endpoint ever serves traffic.

use std::fmt;
use std::sync::Arc;

use crate::capabilities::CapabilitySet;
use crate::error::BridgeError;
use crate::storage::{
    ArchiveSpanReader, ArchiveSpanWriter, SpanReader, SpanWriter, StreamingSpanWriter,
};

/// One RPC surface carried by the bridge.
///
/// Names are stable identifiers used in logs and error messages; they
/// are not wire-level values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceContract {
    SpanReader,
    SpanWriter,
    Capabilities,
    ArchiveSpanReader,
    ArchiveSpanWriter,
    StreamingSpanWriter,
}

impl ServiceContract {
    /// The complete contract set, mandatory entries first.
    pub const ALL: [ServiceContract; 6] = [
        ServiceContract::SpanReader,
        ServiceContract::SpanWriter,
        ServiceContract::Capabilities,
        ServiceContract::ArchiveSpanReader,
        ServiceContract::ArchiveSpanWriter,
        ServiceContract::StreamingSpanWriter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServiceContract::SpanReader => "storage.reader",
            ServiceContract::SpanWriter => "storage.writer",
            ServiceContract::Capabilities => "storage.capabilities",
            ServiceContract::ArchiveSpanReader => "storage.archive-reader",
            ServiceContract::ArchiveSpanWriter => "storage.archive-writer",
            ServiceContract::StreamingSpanWriter => "storage.streaming-writer",
        }
    }

    /// Mandatory contracts must always have a binding.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ServiceContract::SpanReader
                | ServiceContract::SpanWriter
                | ServiceContract::Capabilities
        )
    }
}

impl fmt::Display for ServiceContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of concrete backend bindings a plugin author supplies.
///
/// Optional contracts left unbound are served by a deterministic
/// not-implemented stub on the server side, and short-circuited on the
/// client side after capability negotiation.
#[derive(Clone)]
pub struct StoragePlugin {
    pub(crate) span_reader: Arc<dyn SpanReader>,
    pub(crate) span_writer: Arc<dyn SpanWriter>,
    pub(crate) archive_reader: Option<Arc<dyn ArchiveSpanReader>>,
    pub(crate) archive_writer: Option<Arc<dyn ArchiveSpanWriter>>,
    pub(crate) streaming_writer: Option<Arc<dyn StreamingSpanWriter>>,
}

impl StoragePlugin {
    pub fn builder() -> StoragePluginBuilder {
        StoragePluginBuilder::default()
    }

    /// The optional contracts backed by real bindings, computed by
    /// introspection. This is the snapshot capability negotiation
    /// reports; it never changes for the life of the plugin process.
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            archive_span_reader: self.archive_reader.is_some(),
            archive_span_writer: self.archive_writer.is_some(),
            streaming_span_writer: self.streaming_writer.is_some(),
        }
    }
}

#[derive(Default)]
pub struct StoragePluginBuilder {
    span_reader: Option<Arc<dyn SpanReader>>,
    span_writer: Option<Arc<dyn SpanWriter>>,
    archive_reader: Option<Arc<dyn ArchiveSpanReader>>,
    archive_writer: Option<Arc<dyn ArchiveSpanWriter>>,
    streaming_writer: Option<Arc<dyn StreamingSpanWriter>>,
}

impl StoragePluginBuilder {
    pub fn span_reader(mut self, reader: Arc<dyn SpanReader>) -> Self {
        self.span_reader = Some(reader);
        self
    }

    pub fn span_writer(mut self, writer: Arc<dyn SpanWriter>) -> Self {
        self.span_writer = Some(writer);
        self
    }

    pub fn archive_reader(mut self, reader: Arc<dyn ArchiveSpanReader>) -> Self {
        self.archive_reader = Some(reader);
        self
    }

    pub fn archive_writer(mut self, writer: Arc<dyn ArchiveSpanWriter>) -> Self {
        self.archive_writer = Some(writer);
        self
    }

    pub fn streaming_writer(mut self, writer: Arc<dyn StreamingSpanWriter>) -> Self {
        self.streaming_writer = Some(writer);
        self
    }

    /// Validate the binding set. Fails fast with
    /// [`BridgeError::Registration`] naming the first missing
    /// mandatory contract.
    pub fn build(self) -> Result<StoragePlugin, BridgeError> {
        let span_reader = self.span_reader.ok_or(BridgeError::Registration {
            contract: ServiceContract::SpanReader,
        })?;
        let span_writer = self.span_writer.ok_or(BridgeError::Registration {
            contract: ServiceContract::SpanWriter,
        })?;

        Ok(StoragePlugin {
            span_reader,
            span_writer,
            archive_reader: self.archive_reader,
            archive_writer: self.archive_writer,
            streaming_writer: self.streaming_writer,
        })
    }
}
