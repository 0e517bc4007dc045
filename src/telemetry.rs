//! Instrumentation options for the bridge.
//!
//! A plain options structure with named fields and defaults, applied
//! once when a session is created. Not part of the bridge contract
//! proper; the values surface as fields on the bridge's own log
//! events.

/// Named optional settings for instrumentation wrapped around a
/// session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryOptions {
    instrumentation_name: String,
    schema_url: Option<String>,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        TelemetryOptions {
            instrumentation_name: "spanbridge".to_string(),
            schema_url: None,
        }
    }
}

impl TelemetryOptions {
    pub fn new() -> Self {
        TelemetryOptions::default()
    }

    /// The name of the library providing instrumentation.
    pub fn with_instrumentation_name(mut self, name: impl Into<String>) -> Self {
        self.instrumentation_name = name.into();
        self
    }

    /// The schema URL of the library providing instrumentation.
    pub fn with_schema_url(mut self, url: impl Into<String>) -> Self {
        self.schema_url = Some(url.into());
        self
    }

    pub fn instrumentation_name(&self) -> &str {
        &self.instrumentation_name
    }

    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }
}
