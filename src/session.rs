//! Transport lifecycle.
//!
//! A [`Session`] is the single established connection between the
//! host and one plugin process. The process supervisor is responsible
//! for spawning the plugin and handing over a reachable endpoint
//! address (or an already-connected channel); the session only owns
//! the RPC channel from that point on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};

use crate::error::BridgeError;
use crate::telemetry::TelemetryOptions;

/// Connection-time and per-call defaults for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for establishing the underlying channel.
    pub connect_timeout: Duration,
    /// Default per-call deadline, overridable per call. `None` means
    /// calls wait until the channel fails or the caller cancels.
    pub call_timeout: Option<Duration>,
    pub telemetry: TelemetryOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connect_timeout: Duration::from_secs(5),
            call_timeout: Some(Duration::from_secs(30)),
            telemetry: TelemetryOptions::default(),
        }
    }
}

/// One established connection to a plugin process.
///
/// Cloning is cheap; all clones share the same channel and release
/// state, so releasing any clone releases the session. The channel
/// multiplexes concurrent calls without serializing them logically.
#[derive(Clone)]
pub struct Session {
    channel: Channel,
    released: Arc<AtomicBool>,
    release_signal: CancellationToken,
    config: SessionConfig,
}

impl Session {
    /// Connect to a plugin endpoint address exchanged out-of-band by
    /// the process supervisor, e.g. `http://127.0.0.1:4317`.
    pub async fn connect(target: &str, config: SessionConfig) -> Result<Session, BridgeError> {
        let endpoint = Endpoint::from_shared(target.to_owned())
            .map_err(|err| BridgeError::Transport(format!("invalid endpoint {target}: {err}")))?
            .connect_timeout(config.connect_timeout);

        let channel = endpoint
            .connect()
            .await
            .map_err(|err| BridgeError::Transport(format!("failed to connect: {err}")))?;

        Ok(Session::from_channel(channel, config))
    }

    /// Wrap an already-connected channel. This is the entry point for
    /// supervisors that manage the connection themselves.
    pub fn from_channel(channel: Channel, config: SessionConfig) -> Session {
        tracing::debug!(
            instrumentation = config.telemetry.instrumentation_name(),
            "session established"
        );
        Session {
            channel,
            released: Arc::new(AtomicBool::new(false)),
            release_signal: CancellationToken::new(),
            config,
        }
    }

    /// A clone of the underlying channel, for callers that need raw
    /// generated clients alongside the facade.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryOptions {
        &self.config.telemetry
    }

    /// Whether [`release`](Session::release) has been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Resolves once the session is released. In-flight calls race
    /// against this so they observe a transport error instead of
    /// hanging on a torn-down session.
    pub(crate) async fn until_released(&self) {
        self.release_signal.cancelled().await;
    }

    /// Tear the session down. Idempotent: double-release is a no-op.
    /// In-flight calls resolve to a transport error, and calls issued
    /// afterwards fail fast without touching the network.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("session released");
        self.release_signal.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_call_deadline() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.call_timeout.is_some());
    }

    #[tokio::test]
    async fn connect_rejects_malformed_endpoints() {
        let result = Session::connect("not a uri", SessionConfig::default()).await;
        assert!(matches!(result, Err(BridgeError::Transport(_))));
    }
}
