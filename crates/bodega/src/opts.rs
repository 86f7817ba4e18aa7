use clap::{ArgMatches, Args, Command, FromArgMatches};

use vmlease_core::{Error, ProviderFlags, Result};

use crate::api::{OrderItem, Requirements, MACHINE_TYPE};

pub const DEFAULT_DISK_SIZE: u32 = 32;
pub const DEFAULT_LOCATION: &str = "AWS-US-WEST-1";
pub const DEFAULT_MODEL: &str = "aws-m4.large";

/// Machine requirements used when placing orders.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct BodegaOpts {
    /// Bodega disk size
    #[arg(id = "bodega-disk_size", long = "bodega-disk_size", default_value_t = DEFAULT_DISK_SIZE)]
    pub disk_size: u32,

    /// Bodega location
    #[arg(id = "bodega-location", long = "bodega-location", default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Bodega model
    #[arg(id = "bodega-model", long = "bodega-model", default_value = DEFAULT_MODEL)]
    pub model: String,
}

impl BodegaOpts {
    /// The item requested for each machine name.
    pub fn order_item(&self) -> OrderItem {
        OrderItem {
            kind: MACHINE_TYPE.to_string(),
            requirements: Requirements {
                disk_size: self.disk_size,
                location: self.location.clone(),
                model: self.model.clone(),
            },
        }
    }
}

impl Default for BodegaOpts {
    fn default() -> Self {
        Self {
            disk_size: DEFAULT_DISK_SIZE,
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ProviderFlags for BodegaOpts {
    fn configure_create_flags(&self, cmd: Command) -> Command {
        <BodegaOpts as Args>::augment_args(cmd)
    }

    fn apply_create_flags(&mut self, matches: &ArgMatches) -> Result<()> {
        self.update_from_arg_matches(matches)
            .map_err(|e| Error::Config(format!("invalid Bodega flags: {e}")))
    }
}
