//! Sync layer: HTTP transport to the back-office invoicing configuration API.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientConfig, SyncClient, SyncError};
