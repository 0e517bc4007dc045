pub mod capabilities;
pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use capabilities::CapabilitySet;
pub use client::{CallOptions, StorageClient};
pub use error::BridgeError;
pub use registry::{ServiceContract, StoragePlugin, StoragePluginBuilder};
pub use server::PluginServer;
pub use session::{Session, SessionConfig};
pub use telemetry::TelemetryOptions;
