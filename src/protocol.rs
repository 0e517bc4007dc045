//! Generated wire types and service stubs for the storage plugin
//! protocol, compiled from `proto/storage.proto` by `build.rs`.

include!(concat!(env!("OUT_DIR"), "/spanbridge.storage.v1.rs"));
