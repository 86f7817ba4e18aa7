use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use vmlease_core::config::home_dir;
use vmlease_core::{Error, OrderId, Result};

/// Order id → names of the machines requested under it.
pub type OrderMap = BTreeMap<OrderId, Vec<String>>;

const REGISTRY_DIR: &str = ".vmlease";
const REGISTRY_FILE: &str = "bodega_orders";

/// JSON file recording which machines were requested under which order.
///
/// Reads and writes are not coordinated; one process at a time.
#[derive(Debug, Clone)]
pub struct OrderRegistry {
    path: PathBuf,
}

impl OrderRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.vmlease/bodega_orders`
    pub fn default_path() -> Result<PathBuf> {
        Ok(home_dir()?.join(REGISTRY_DIR).join(REGISTRY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every recorded order. A missing or empty file is an empty map.
    pub async fn read(&self) -> Result<OrderMap> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no order registry yet");
                return Ok(OrderMap::new());
            }
            Err(e) => {
                return Err(Error::Registry(format!(
                    "problem opening file {}: {e}",
                    self.path.display()
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(OrderMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            Error::Registry(format!("unable to decode file {}: {e}", self.path.display()))
        })
    }

    /// Replace the file contents with `orders`, pretty-printed.
    pub async fn write(&self, orders: &OrderMap) -> Result<()> {
        let json = serde_json::to_string_pretty(orders)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::Registry(format!("unable to create directory {}: {e}", parent.display()))
            })?;
        }
        fs::write(&self.path, json).await.map_err(|e| {
            Error::Registry(format!("unable to write file {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), orders = orders.len(), "order registry saved");
        Ok(())
    }
}
