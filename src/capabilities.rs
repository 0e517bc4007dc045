//! Capability negotiation.
//!
//! A [`CapabilitySet`] is the per-session snapshot of which optional
//! contracts a plugin actually backs. It is computed server-side by
//! introspecting the bindings (never by probing live calls), fetched
//! once at session establishment, and immutable for the session's
//! lifetime.

use serde::Serialize;

use crate::client::{self, CallOptions};
use crate::error::BridgeError;
use crate::registry::ServiceContract;
use crate::session::Session;

/// Which optional contracts are backed by real bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    pub archive_span_reader: bool,
    pub archive_span_writer: bool,
    pub streaming_span_writer: bool,
}

impl CapabilitySet {
    /// Issue the one capability query for this session. Hosts must
    /// block on this before exposing the plugin to their own callers;
    /// [`crate::StorageClient::connect`] does so.
    pub async fn negotiate(session: &Session) -> Result<CapabilitySet, BridgeError> {
        client::negotiate(session, &CallOptions::default()).await
    }

    /// Whether a contract may be invoked on this session. Mandatory
    /// contracts are always available.
    pub fn supports(&self, contract: ServiceContract) -> bool {
        match contract {
            ServiceContract::SpanReader
            | ServiceContract::SpanWriter
            | ServiceContract::Capabilities => true,
            ServiceContract::ArchiveSpanReader => self.archive_span_reader,
            ServiceContract::ArchiveSpanWriter => self.archive_span_writer,
            ServiceContract::StreamingSpanWriter => self.streaming_span_writer,
        }
    }

    /// All contracts available on this session, in registry order.
    pub fn contracts(&self) -> Vec<ServiceContract> {
        ServiceContract::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }
}

impl From<crate::protocol::CapabilitiesResponse> for CapabilitySet {
    fn from(msg: crate::protocol::CapabilitiesResponse) -> Self {
        CapabilitySet {
            archive_span_reader: msg.archive_span_reader,
            archive_span_writer: msg.archive_span_writer,
            streaming_span_writer: msg.streaming_span_writer,
        }
    }
}

impl From<CapabilitySet> for crate::protocol::CapabilitiesResponse {
    fn from(caps: CapabilitySet) -> Self {
        crate::protocol::CapabilitiesResponse {
            archive_span_reader: caps.archive_span_reader,
            archive_span_writer: caps.archive_span_writer,
            streaming_span_writer: caps.streaming_span_writer,
        }
    }
}
