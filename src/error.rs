//! Error taxonomy for the plugin bridge.
//!
//! Hosts dispatch on these variants: `Transport` failures are handled
//! by whatever reconnect policy the process supervisor owns, `Backend`
//! failures carry the plugin's own message verbatim, and
//! `CapabilityUnavailable` is the expected client-side short-circuit
//! for optional contracts the plugin never offered.

use thiserror::Error;

use crate::registry::ServiceContract;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The channel to the plugin process is broken, timed out, or was
    /// released. Never retried by the bridge itself.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The plugin's backend reported a domain failure. The message is
    /// the server's, propagated verbatim.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// An optional contract was invoked on a plugin that has no
    /// binding for it. Only reachable when the facade's capability
    /// gating was bypassed; treat as an integration error.
    #[error("contract {contract} is not implemented by this plugin")]
    Unimplemented { contract: ServiceContract },

    /// Client-side short-circuit: the contract was not negotiated for
    /// this session, so no call was issued.
    #[error("capability {contract} was not negotiated for this session")]
    CapabilityUnavailable { contract: ServiceContract },

    /// The caller cancelled the in-flight call. The server-side call
    /// may still run to completion on the backend.
    #[error("call was cancelled before a response arrived")]
    Cancelled,

    /// A mandatory contract has no binding. Fatal at construction
    /// time; the endpoint never serves traffic.
    #[error("missing binding for mandatory contract {contract}")]
    Registration { contract: ServiceContract },
}

impl BridgeError {
    /// True for the variants a host may recover from by falling back
    /// or reconnecting, as opposed to programming errors.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BridgeError::Transport(_)
            | BridgeError::Backend { .. }
            | BridgeError::CapabilityUnavailable { .. }
            | BridgeError::Cancelled => true,
            BridgeError::Unimplemented { .. } | BridgeError::Registration { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_errors_are_not_recoverable() {
        let err = BridgeError::Registration {
            contract: ServiceContract::SpanWriter,
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("storage.writer"));
    }

    #[test]
    fn capability_unavailable_is_distinguishable_from_backend() {
        let unavailable = BridgeError::CapabilityUnavailable {
            contract: ServiceContract::ArchiveSpanWriter,
        };
        let backend = BridgeError::Backend {
            message: "disk full".to_string(),
        };
        assert!(matches!(
            unavailable,
            BridgeError::CapabilityUnavailable { .. }
        ));
        assert!(backend.to_string().contains("disk full"));
    }
}
