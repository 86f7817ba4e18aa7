pub mod config;
pub mod duration;
pub mod error;
pub mod provider;
pub mod types;

pub use config::BodegaConfig;
pub use duration::format_time_delta;
pub use error::Error;
pub use provider::{Provider, ProviderFlags, Providers};
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;
