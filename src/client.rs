//! Client-side facade.
//!
//! [`StorageClient`] is the one composite object a host uses as if it
//! were a local, fully-implemented backend. Construction negotiates
//! capabilities once; afterwards every optional operation is either a
//! thin call-through or a local short-circuit that returns
//! [`BridgeError::CapabilityUnavailable`] without touching the
//! network, so a host never pays round-trip latency to discover an
//! unimplemented contract.

use std::future::Future;
use std::time::Duration;

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Response, Status};

use crate::capabilities::CapabilitySet;
use crate::error::BridgeError;
use crate::protocol::archive_span_reader_plugin_client::ArchiveSpanReaderPluginClient;
use crate::protocol::archive_span_writer_plugin_client::ArchiveSpanWriterPluginClient;
use crate::protocol::plugin_capabilities_client::PluginCapabilitiesClient;
use crate::protocol::span_reader_plugin_client::SpanReaderPluginClient;
use crate::protocol::span_writer_plugin_client::SpanWriterPluginClient;
use crate::protocol::streaming_span_writer_plugin_client::StreamingSpanWriterPluginClient;
use crate::protocol::{
    CapabilitiesRequest, CloseWriterRequest, FindTraceIdsRequest, FindTracesRequest,
    GetArchiveTraceRequest, GetOperationsRequest, GetServicesRequest, GetTraceRequest, Operation,
    Span, TraceQueryParameters, WriteArchiveSpanRequest, WriteSpanRequest,
};
use crate::registry::ServiceContract;
use crate::session::Session;

/// Per-call deadline and cancellation settings.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    deadline: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> CallOptions {
        CallOptions::default()
    }

    /// Override the session's default per-call deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation signal. Cancelling makes the call return
    /// [`BridgeError::Cancelled`] promptly; the server-side call may
    /// still run to completion on the backend.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Map a server status onto the bridge taxonomy.
pub(crate) fn map_status(status: Status, contract: ServiceContract) -> BridgeError {
    match status.code() {
        Code::Unimplemented => BridgeError::Unimplemented { contract },
        Code::Cancelled => BridgeError::Cancelled,
        Code::DeadlineExceeded | Code::Unavailable => {
            BridgeError::Transport(format!("call to {contract} failed: {}", status.message()))
        }
        _ => BridgeError::Backend {
            message: status.message().to_string(),
        },
    }
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn bounded<T, F>(
    deadline: Option<Duration>,
    contract: ServiceContract,
    call: F,
) -> Result<Response<T>, BridgeError>
where
    F: Future<Output = Result<Response<T>, Status>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(|status| map_status(status, contract)),
            Err(_) => Err(BridgeError::Transport(format!(
                "call to {contract} timed out after {limit:?}"
            ))),
        },
        None => call.await.map_err(|status| map_status(status, contract)),
    }
}

/// Drive one RPC to completion, racing it against session release and
/// the caller's cancellation signal. Suspends at the network boundary;
/// never busy-waits.
pub(crate) async fn run_call<T, F>(
    session: &Session,
    contract: ServiceContract,
    opts: &CallOptions,
    call: F,
) -> Result<Response<T>, BridgeError>
where
    F: Future<Output = Result<Response<T>, Status>>,
{
    if session.is_released() {
        return Err(BridgeError::Transport(format!(
            "session is released; refusing call to {contract}"
        )));
    }

    tracing::trace!(contract = %contract, "dispatching plugin call");
    let deadline = opts.deadline.or(session.config().call_timeout);

    tokio::select! {
        // Release and cancellation take priority over a response that
        // happens to be ready in the same poll.
        biased;
        _ = session.until_released() => Err(BridgeError::Transport(format!(
            "session released while call to {contract} was in flight"
        ))),
        _ = wait_cancelled(opts.cancel.as_ref()) => Err(BridgeError::Cancelled),
        result = bounded(deadline, contract, call) => result,
    }
}

/// The one capability query for a session.
pub(crate) async fn negotiate(
    session: &Session,
    opts: &CallOptions,
) -> Result<CapabilitySet, BridgeError> {
    let mut client = PluginCapabilitiesClient::new(session.channel());
    let response = run_call(session, ServiceContract::Capabilities, opts, async move {
        client.capabilities(CapabilitiesRequest {}).await
    })
    .await?;
    Ok(response.into_inner().into())
}

/// Composite client over one session, exposing every negotiated
/// contract.
///
/// Cheap to clone; safe to call concurrently from multiple tasks. The
/// facade holds no per-call mutable state beyond the shared session.
#[derive(Clone)]
pub struct StorageClient {
    session: Session,
    capabilities: CapabilitySet,
}

impl StorageClient {
    /// Negotiate capabilities on `session` and build the facade.
    /// Blocks until negotiation completes, so callers never see a
    /// facade whose optional operations are not yet wired.
    pub async fn connect(session: Session) -> Result<StorageClient, BridgeError> {
        let capabilities = negotiate(&session, &CallOptions::default()).await?;
        tracing::debug!(?capabilities, "storage plugin capabilities negotiated");
        Ok(StorageClient {
            session,
            capabilities,
        })
    }

    /// Build a facade from an existing negotiated snapshot. Intended
    /// for hosts that negotiated out-of-band and for tests.
    pub fn with_capabilities(session: Session, capabilities: CapabilitySet) -> StorageClient {
        StorageClient {
            session,
            capabilities,
        }
    }

    /// The immutable snapshot negotiated for this session.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn ensure_capability(&self, contract: ServiceContract) -> Result<(), BridgeError> {
        if self.capabilities.supports(contract) {
            Ok(())
        } else {
            Err(BridgeError::CapabilityUnavailable { contract })
        }
    }

    pub async fn get_trace(
        &self,
        trace_id: &str,
        opts: CallOptions,
    ) -> Result<Vec<Span>, BridgeError> {
        let mut client = SpanReaderPluginClient::new(self.session.channel());
        let request = GetTraceRequest {
            trace_id: trace_id.to_owned(),
        };
        let response = run_call(&self.session, ServiceContract::SpanReader, &opts, async move {
            client.get_trace(request).await
        })
        .await?;
        Ok(response.into_inner().spans)
    }

    pub async fn get_services(&self, opts: CallOptions) -> Result<Vec<String>, BridgeError> {
        let mut client = SpanReaderPluginClient::new(self.session.channel());
        let response = run_call(&self.session, ServiceContract::SpanReader, &opts, async move {
            client.get_services(GetServicesRequest {}).await
        })
        .await?;
        Ok(response.into_inner().services)
    }

    pub async fn get_operations(
        &self,
        service: &str,
        opts: CallOptions,
    ) -> Result<Vec<Operation>, BridgeError> {
        let mut client = SpanReaderPluginClient::new(self.session.channel());
        let request = GetOperationsRequest {
            service: service.to_owned(),
        };
        let response = run_call(&self.session, ServiceContract::SpanReader, &opts, async move {
            client.get_operations(request).await
        })
        .await?;
        Ok(response.into_inner().operations)
    }

    pub async fn find_traces(
        &self,
        query: TraceQueryParameters,
        opts: CallOptions,
    ) -> Result<Vec<Vec<Span>>, BridgeError> {
        let mut client = SpanReaderPluginClient::new(self.session.channel());
        let request = FindTracesRequest { query: Some(query) };
        let response = run_call(&self.session, ServiceContract::SpanReader, &opts, async move {
            client.find_traces(request).await
        })
        .await?;
        Ok(response
            .into_inner()
            .traces
            .into_iter()
            .map(|trace| trace.spans)
            .collect())
    }

    pub async fn find_trace_ids(
        &self,
        query: TraceQueryParameters,
        opts: CallOptions,
    ) -> Result<Vec<String>, BridgeError> {
        let mut client = SpanReaderPluginClient::new(self.session.channel());
        let request = FindTraceIdsRequest { query: Some(query) };
        let response = run_call(&self.session, ServiceContract::SpanReader, &opts, async move {
            client.find_trace_ids(request).await
        })
        .await?;
        Ok(response.into_inner().trace_ids)
    }

    pub async fn write_span(&self, span: Span, opts: CallOptions) -> Result<(), BridgeError> {
        let mut client = SpanWriterPluginClient::new(self.session.channel());
        let request = WriteSpanRequest { span: Some(span) };
        run_call(&self.session, ServiceContract::SpanWriter, &opts, async move {
            client.write_span(request).await
        })
        .await?;
        Ok(())
    }

    /// Flush barrier on the core writer.
    pub async fn close_writer(&self, opts: CallOptions) -> Result<(), BridgeError> {
        let mut client = SpanWriterPluginClient::new(self.session.channel());
        run_call(&self.session, ServiceContract::SpanWriter, &opts, async move {
            client.close(CloseWriterRequest {}).await
        })
        .await?;
        Ok(())
    }

    pub async fn get_archive_trace(
        &self,
        trace_id: &str,
        opts: CallOptions,
    ) -> Result<Vec<Span>, BridgeError> {
        self.ensure_capability(ServiceContract::ArchiveSpanReader)?;
        let mut client = ArchiveSpanReaderPluginClient::new(self.session.channel());
        let request = GetArchiveTraceRequest {
            trace_id: trace_id.to_owned(),
        };
        let response = run_call(
            &self.session,
            ServiceContract::ArchiveSpanReader,
            &opts,
            async move { client.get_archive_trace(request).await },
        )
        .await?;
        Ok(response.into_inner().spans)
    }

    pub async fn write_archive_span(
        &self,
        span: Span,
        opts: CallOptions,
    ) -> Result<(), BridgeError> {
        self.ensure_capability(ServiceContract::ArchiveSpanWriter)?;
        let mut client = ArchiveSpanWriterPluginClient::new(self.session.channel());
        let request = WriteArchiveSpanRequest { span: Some(span) };
        run_call(
            &self.session,
            ServiceContract::ArchiveSpanWriter,
            &opts,
            async move { client.write_archive_span(request).await },
        )
        .await?;
        Ok(())
    }

    /// Stream spans to the plugin's streaming writer. Returns the
    /// number of spans the plugin acknowledged.
    pub async fn write_span_stream<S>(
        &self,
        spans: S,
        opts: CallOptions,
    ) -> Result<u64, BridgeError>
    where
        S: Stream<Item = Span> + Send + 'static,
    {
        self.ensure_capability(ServiceContract::StreamingSpanWriter)?;
        let mut client = StreamingSpanWriterPluginClient::new(self.session.channel());
        let response = run_call(
            &self.session,
            ServiceContract::StreamingSpanWriter,
            &opts,
            async move { client.write_span_stream(spans).await },
        )
        .await?;
        Ok(response.into_inner().spans_written)
    }
}
