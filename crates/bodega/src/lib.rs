//! Bodega leasing-service provider.

pub mod api;
pub mod http;
pub mod manager;
pub mod opts;
pub mod provider;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use http::HttpClient;
pub use manager::BodegaManager;
pub use opts::BodegaOpts;
pub use provider::{BodegaProvider, PROVIDER_NAME};
pub use registry::{OrderMap, OrderRegistry};
