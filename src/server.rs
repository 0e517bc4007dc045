//! Server-side adapter.
//!
//! [`PluginServer`] wraps a validated binding set and exposes every
//! registry contract on one shared endpoint. Mandatory contracts
//! route straight to their bindings; optional contracts with no
//! binding answer every method with a deterministic UNIMPLEMENTED
//! status so the endpoint never crashes or hangs on a contract the
//! plugin left out. The capability query is served by the adapter
//! itself from the binding snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::transport::server::Router;
use tonic::{Request, Response, Status, Streaming};

use crate::error::BridgeError;
use crate::protocol::archive_span_reader_plugin_server::{
    ArchiveSpanReaderPlugin, ArchiveSpanReaderPluginServer,
};
use crate::protocol::archive_span_writer_plugin_server::{
    ArchiveSpanWriterPlugin, ArchiveSpanWriterPluginServer,
};
use crate::protocol::plugin_capabilities_server::{PluginCapabilities, PluginCapabilitiesServer};
use crate::protocol::span_reader_plugin_server::{SpanReaderPlugin, SpanReaderPluginServer};
use crate::protocol::span_writer_plugin_server::{SpanWriterPlugin, SpanWriterPluginServer};
use crate::protocol::streaming_span_writer_plugin_server::{
    StreamingSpanWriterPlugin, StreamingSpanWriterPluginServer,
};
use crate::protocol::{
    CapabilitiesRequest, CapabilitiesResponse, CloseWriterRequest, CloseWriterResponse,
    FindTraceIdsRequest, FindTraceIdsResponse, FindTracesRequest, FindTracesResponse,
    GetArchiveTraceRequest, GetArchiveTraceResponse, GetOperationsRequest, GetOperationsResponse,
    GetServicesRequest, GetServicesResponse, GetTraceRequest, GetTraceResponse, Span, Trace,
    WriteArchiveSpanRequest, WriteArchiveSpanResponse, WriteSpanRequest, WriteSpanResponse,
    WriteSpanStreamResponse,
};
use crate::registry::{ServiceContract, StoragePlugin};

/// Serves one plugin's binding set on a single gRPC endpoint.
pub struct PluginServer {
    plugin: StoragePlugin,
}

impl PluginServer {
    pub fn new(plugin: StoragePlugin) -> PluginServer {
        PluginServer { plugin }
    }

    /// Attach every registry contract to `server`. Called once per
    /// endpoint lifetime; the dispatch table is immutable afterwards.
    pub fn register<L>(self, server: &mut Server<L>) -> Router<L>
    where
        L: Clone,
    {
        let handler = Arc::new(PluginHandler {
            plugin: self.plugin,
        });
        server
            .add_service(SpanReaderPluginServer::from_arc(handler.clone()))
            .add_service(SpanWriterPluginServer::from_arc(handler.clone()))
            .add_service(PluginCapabilitiesServer::from_arc(handler.clone()))
            .add_service(ArchiveSpanReaderPluginServer::from_arc(handler.clone()))
            .add_service(ArchiveSpanWriterPluginServer::from_arc(handler.clone()))
            .add_service(StreamingSpanWriterPluginServer::from_arc(handler))
    }

    /// Register all contracts and serve until `shutdown` fires.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), BridgeError> {
        let capabilities = self.plugin.capabilities();
        tracing::info!(%addr, ?capabilities, "serving storage plugin");

        let mut builder = Server::builder();
        self.register(&mut builder)
            .serve_with_shutdown(addr, shutdown.cancelled_owned())
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))
    }
}

/// Routes incoming calls to the concrete bindings.
pub(crate) struct PluginHandler {
    plugin: StoragePlugin,
}

fn unbound(contract: ServiceContract) -> Status {
    Status::unimplemented(format!("contract {contract} has no binding in this plugin"))
}

#[tonic::async_trait]
impl SpanReaderPlugin for PluginHandler {
    async fn get_trace(
        &self,
        request: Request<GetTraceRequest>,
    ) -> Result<Response<GetTraceResponse>, Status> {
        let trace_id = request.into_inner().trace_id;
        let spans = self.plugin.span_reader.get_trace(&trace_id).await?;
        Ok(Response::new(GetTraceResponse { spans }))
    }

    async fn get_services(
        &self,
        _request: Request<GetServicesRequest>,
    ) -> Result<Response<GetServicesResponse>, Status> {
        let services = self.plugin.span_reader.get_services().await?;
        Ok(Response::new(GetServicesResponse { services }))
    }

    async fn get_operations(
        &self,
        request: Request<GetOperationsRequest>,
    ) -> Result<Response<GetOperationsResponse>, Status> {
        let service = request.into_inner().service;
        let operations = self.plugin.span_reader.get_operations(&service).await?;
        Ok(Response::new(GetOperationsResponse { operations }))
    }

    async fn find_traces(
        &self,
        request: Request<FindTracesRequest>,
    ) -> Result<Response<FindTracesResponse>, Status> {
        let query = request.into_inner().query.unwrap_or_default();
        let traces = self.plugin.span_reader.find_traces(query).await?;
        Ok(Response::new(FindTracesResponse {
            traces: traces.into_iter().map(|spans| Trace { spans }).collect(),
        }))
    }

    async fn find_trace_ids(
        &self,
        request: Request<FindTraceIdsRequest>,
    ) -> Result<Response<FindTraceIdsResponse>, Status> {
        let query = request.into_inner().query.unwrap_or_default();
        let trace_ids = self.plugin.span_reader.find_trace_ids(query).await?;
        Ok(Response::new(FindTraceIdsResponse { trace_ids }))
    }
}

#[tonic::async_trait]
impl SpanWriterPlugin for PluginHandler {
    async fn write_span(
        &self,
        request: Request<WriteSpanRequest>,
    ) -> Result<Response<WriteSpanResponse>, Status> {
        let span = request
            .into_inner()
            .span
            .ok_or_else(|| Status::invalid_argument("WriteSpanRequest is missing a span"))?;
        self.plugin.span_writer.write_span(span).await?;
        Ok(Response::new(WriteSpanResponse {}))
    }

    async fn close(
        &self,
        _request: Request<CloseWriterRequest>,
    ) -> Result<Response<CloseWriterResponse>, Status> {
        self.plugin.span_writer.close().await?;
        Ok(Response::new(CloseWriterResponse {}))
    }
}

#[tonic::async_trait]
impl PluginCapabilities for PluginHandler {
    async fn capabilities(
        &self,
        _request: Request<CapabilitiesRequest>,
    ) -> Result<Response<CapabilitiesResponse>, Status> {
        Ok(Response::new(self.plugin.capabilities().into()))
    }
}

#[tonic::async_trait]
impl ArchiveSpanReaderPlugin for PluginHandler {
    async fn get_archive_trace(
        &self,
        request: Request<GetArchiveTraceRequest>,
    ) -> Result<Response<GetArchiveTraceResponse>, Status> {
        let Some(reader) = &self.plugin.archive_reader else {
            return Err(unbound(ServiceContract::ArchiveSpanReader));
        };
        let trace_id = request.into_inner().trace_id;
        let spans = reader.get_archive_trace(&trace_id).await?;
        Ok(Response::new(GetArchiveTraceResponse { spans }))
    }
}

#[tonic::async_trait]
impl ArchiveSpanWriterPlugin for PluginHandler {
    async fn write_archive_span(
        &self,
        request: Request<WriteArchiveSpanRequest>,
    ) -> Result<Response<WriteArchiveSpanResponse>, Status> {
        let Some(writer) = &self.plugin.archive_writer else {
            return Err(unbound(ServiceContract::ArchiveSpanWriter));
        };
        let span = request
            .into_inner()
            .span
            .ok_or_else(|| Status::invalid_argument("WriteArchiveSpanRequest is missing a span"))?;
        writer.write_archive_span(span).await?;
        Ok(Response::new(WriteArchiveSpanResponse {}))
    }
}

#[tonic::async_trait]
impl StreamingSpanWriterPlugin for PluginHandler {
    async fn write_span_stream(
        &self,
        request: Request<Streaming<Span>>,
    ) -> Result<Response<WriteSpanStreamResponse>, Status> {
        let Some(writer) = self.plugin.streaming_writer.clone() else {
            return Err(unbound(ServiceContract::StreamingSpanWriter));
        };

        let mut stream = request.into_inner();
        let mut spans_written = 0u64;
        while let Some(span) = stream.message().await? {
            writer.write_span(span).await?;
            spans_written += 1;
        }

        Ok(Response::new(WriteSpanStreamResponse { spans_written }))
    }
}
