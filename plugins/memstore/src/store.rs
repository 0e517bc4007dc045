//! In-memory span storage.
//!
//! Traces live in a map keyed by trace id; the archive is a separate
//! map so archived traces never leak into the primary query surface.
//! Good enough for integration testing a host against a real plugin
//! process without standing up a database.

use std::collections::HashMap;

use tokio::sync::RwLock;

use spanbridge::protocol::{Operation, Span, TraceQueryParameters};
use spanbridge::storage::{
    ArchiveSpanReader, ArchiveSpanWriter, SpanReader, SpanWriter, StorageError,
};

#[derive(Default)]
pub struct MemStore {
    traces: RwLock<HashMap<String, Vec<Span>>>,
    archive: RwLock<HashMap<String, Vec<Span>>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }
}

fn span_matches(span: &Span, query: &TraceQueryParameters) -> bool {
    if !query.service_name.is_empty() && span.service_name != query.service_name {
        return false;
    }
    if !query.operation_name.is_empty() && span.operation_name != query.operation_name {
        return false;
    }
    for (key, value) in &query.tags {
        if span.tags.get(key) != Some(value) {
            return false;
        }
    }
    if query.start_time_min_unix_nanos > 0 && span.start_time_unix_nanos < query.start_time_min_unix_nanos
    {
        return false;
    }
    if query.start_time_max_unix_nanos > 0 && span.start_time_unix_nanos > query.start_time_max_unix_nanos
    {
        return false;
    }
    if query.duration_min_nanos > 0 && span.duration_nanos < query.duration_min_nanos {
        return false;
    }
    if query.duration_max_nanos > 0 && span.duration_nanos > query.duration_max_nanos {
        return false;
    }
    true
}

fn matching_trace_ids(
    traces: &HashMap<String, Vec<Span>>,
    query: &TraceQueryParameters,
) -> Vec<String> {
    let mut ids: Vec<String> = traces
        .iter()
        .filter(|(_, spans)| spans.iter().any(|span| span_matches(span, query)))
        .map(|(id, _)| id.clone())
        .collect();
    // Deterministic order for callers and tests
    ids.sort();
    if query.num_traces > 0 {
        ids.truncate(query.num_traces as usize);
    }
    ids
}

#[tonic::async_trait]
impl SpanReader for MemStore {
    async fn get_trace(&self, trace_id: &str) -> Result<Vec<Span>, StorageError> {
        let traces = self.traces.read().await;
        traces
            .get(trace_id)
            .cloned()
            .ok_or_else(|| StorageError::TraceNotFound {
                trace_id: trace_id.to_string(),
            })
    }

    async fn get_services(&self) -> Result<Vec<String>, StorageError> {
        let traces = self.traces.read().await;
        let mut services: Vec<String> = traces
            .values()
            .flatten()
            .map(|span| span.service_name.clone())
            .collect();
        services.sort();
        services.dedup();
        Ok(services)
    }

    async fn get_operations(&self, service: &str) -> Result<Vec<Operation>, StorageError> {
        let traces = self.traces.read().await;
        let mut operations: Vec<Operation> = traces
            .values()
            .flatten()
            .filter(|span| span.service_name == service)
            .map(|span| Operation {
                name: span.operation_name.clone(),
                span_kind: span.tags.get("span.kind").cloned().unwrap_or_default(),
            })
            .collect();
        operations.sort_by(|a, b| (&a.name, &a.span_kind).cmp(&(&b.name, &b.span_kind)));
        operations.dedup();
        Ok(operations)
    }

    async fn find_traces(
        &self,
        query: TraceQueryParameters,
    ) -> Result<Vec<Vec<Span>>, StorageError> {
        let traces = self.traces.read().await;
        let ids = matching_trace_ids(&traces, &query);
        Ok(ids
            .into_iter()
            .filter_map(|id| traces.get(&id).cloned())
            .collect())
    }

    async fn find_trace_ids(
        &self,
        query: TraceQueryParameters,
    ) -> Result<Vec<String>, StorageError> {
        let traces = self.traces.read().await;
        Ok(matching_trace_ids(&traces, &query))
    }
}

#[tonic::async_trait]
impl SpanWriter for MemStore {
    async fn write_span(&self, span: Span) -> Result<(), StorageError> {
        if span.trace_id.is_empty() {
            return Err(StorageError::internal("span has an empty trace id"));
        }
        let mut traces = self.traces.write().await;
        traces.entry(span.trace_id.clone()).or_default().push(span);
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        // Writes go straight to the maps; nothing to flush.
        Ok(())
    }
}

#[tonic::async_trait]
impl ArchiveSpanReader for MemStore {
    async fn get_archive_trace(&self, trace_id: &str) -> Result<Vec<Span>, StorageError> {
        let archive = self.archive.read().await;
        archive
            .get(trace_id)
            .cloned()
            .ok_or_else(|| StorageError::TraceNotFound {
                trace_id: trace_id.to_string(),
            })
    }
}

#[tonic::async_trait]
impl ArchiveSpanWriter for MemStore {
    async fn write_archive_span(&self, span: Span) -> Result<(), StorageError> {
        if span.trace_id.is_empty() {
            return Err(StorageError::internal("span has an empty trace id"));
        }
        let mut archive = self.archive.write().await;
        archive.entry(span.trace_id.clone()).or_default().push(span);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(trace_id: &str, service: &str, operation: &str) -> Span {
        Span {
            trace_id: trace_id.to_string(),
            span_id: format!("{trace_id}-1"),
            service_name: service.to_string(),
            operation_name: operation.to_string(),
            start_time_unix_nanos: 1_000,
            duration_nanos: 500,
            tags: HashMap::new(),
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn written_spans_are_readable_by_trace_id() {
        let store = MemStore::new();
        store.write_span(span("t1", "frontend", "GET /")).await.unwrap();
        store.write_span(span("t1", "backend", "query")).await.unwrap();

        let trace = store.get_trace("t1").await.unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[tokio::test]
    async fn missing_trace_reports_not_found() {
        let store = MemStore::new();
        let err = store.get_trace("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::TraceNotFound { .. }));
    }

    #[tokio::test]
    async fn services_are_unique_and_sorted() {
        let store = MemStore::new();
        store.write_span(span("t1", "frontend", "GET /")).await.unwrap();
        store.write_span(span("t2", "backend", "query")).await.unwrap();
        store.write_span(span("t3", "frontend", "GET /x")).await.unwrap();

        let services = store.get_services().await.unwrap();
        assert_eq!(services, vec!["backend", "frontend"]);
    }

    #[tokio::test]
    async fn find_traces_filters_by_service_and_tags() {
        let store = MemStore::new();
        let mut tagged = span("t1", "frontend", "GET /");
        tagged
            .tags
            .insert("http.status_code".to_string(), "500".to_string());
        store.write_span(tagged).await.unwrap();
        store.write_span(span("t2", "frontend", "GET /")).await.unwrap();
        store.write_span(span("t3", "backend", "query")).await.unwrap();

        let mut query = TraceQueryParameters {
            service_name: "frontend".to_string(),
            ..Default::default()
        };
        assert_eq!(store.find_trace_ids(query.clone()).await.unwrap(), vec!["t1", "t2"]);

        query
            .tags
            .insert("http.status_code".to_string(), "500".to_string());
        assert_eq!(store.find_trace_ids(query).await.unwrap(), vec!["t1"]);
    }

    #[tokio::test]
    async fn num_traces_limits_results() {
        let store = MemStore::new();
        for id in ["t1", "t2", "t3"] {
            store.write_span(span(id, "frontend", "GET /")).await.unwrap();
        }
        let query = TraceQueryParameters {
            num_traces: 2,
            ..Default::default()
        };
        assert_eq!(store.find_traces(query).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn archive_is_isolated_from_primary_storage() {
        let store = MemStore::new();
        store.write_span(span("t1", "frontend", "GET /")).await.unwrap();
        store
            .write_archive_span(span("t2", "frontend", "GET /"))
            .await
            .unwrap();

        assert!(store.get_trace("t2").await.is_err());
        assert_eq!(store.get_archive_trace("t2").await.unwrap().len(), 1);
        assert!(store.get_archive_trace("t1").await.is_err());
    }

    #[tokio::test]
    async fn empty_trace_id_is_rejected() {
        let store = MemStore::new();
        let err = store.write_span(Span::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Internal(_)));
    }
}
