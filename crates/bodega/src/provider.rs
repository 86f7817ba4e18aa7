use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use vmlease_core::{
    format_time_delta, CreateOpts, Error, OrderId, Provider, ProviderFlags, Result, Vm, VmList,
};

use crate::api::FulfilledItem;
use crate::manager::BodegaManager;
use crate::opts::BodegaOpts;

pub const PROVIDER_NAME: &str = "bodega";

/// Login user on every Bodega machine.
pub const REMOTE_USER: &str = "ubuntu";

const POLL_INTERVAL: Duration = Duration::from_secs(60);
const MAX_POLLS: u32 = 30;

/// Provisions machines by placing Bodega orders.
pub struct BodegaProvider {
    opts: BodegaOpts,
    manager: BodegaManager,
    poll_interval: Duration,
    max_polls: u32,
}

impl BodegaProvider {
    pub fn new(manager: BodegaManager, opts: BodegaOpts) -> Self {
        Self {
            opts,
            manager,
            poll_interval: POLL_INTERVAL,
            max_polls: MAX_POLLS,
        }
    }

    /// Build the provider from `~/.bodega.conf.yml`.
    ///
    /// Fails when no token is available; callers decide whether to
    /// register the provider at all.
    pub fn from_default_config() -> Result<Self> {
        Ok(Self::new(
            BodegaManager::from_default_config()?,
            BodegaOpts::default(),
        ))
    }

    /// Override how often and how many times `create` polls for fulfilment.
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    pub fn manager(&self) -> &BodegaManager {
        &self.manager
    }

    async fn wait_until_fulfilled(&self, order_id: &OrderId) -> Result<()> {
        let mut checks = 0;
        while !self.manager.fulfilled(order_id).await {
            let waited = self.poll_interval * checks;
            if checks >= self.max_polls {
                return Err(Error::Timeout {
                    order_id: order_id.clone(),
                    checks,
                    waited,
                });
            }
            info!(
                order_id = %order_id,
                waited = %format_time_delta(waited),
                "waiting for order to be fulfilled"
            );
            tokio::time::sleep(self.poll_interval).await;
            checks += 1;
        }

        info!(order_id = %order_id, "order is fulfilled");
        Ok(())
    }
}

fn to_vm(name: String, item: FulfilledItem) -> Result<Vm> {
    let created_at = DateTime::parse_from_rfc3339(&item.time_created)
        .map_err(|e| {
            Error::Order(format!(
                "unable to parse time string {:?} for machine {name}: {e}",
                item.time_created
            ))
        })?
        .with_timezone(&Utc);

    Ok(Vm {
        name,
        provider: PROVIDER_NAME.to_string(),
        provider_id: PROVIDER_NAME.to_string(),
        created_at,
        public_ip: item.ipv4,
        remote_user: item.username,
        zone: item.location,
    })
}

#[async_trait]
impl Provider for BodegaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn flags(&self) -> &dyn ProviderFlags {
        &self.opts
    }

    fn flags_mut(&mut self) -> &mut dyn ProviderFlags {
        &mut self.opts
    }

    #[instrument(skip(self, _opts), name = "bodega_create")]
    async fn create(&self, names: &[String], _opts: &CreateOpts) -> Result<()> {
        let order_id = self
            .manager
            .place_order(names, &self.opts)
            .await
            .map_err(|e| e.context("failed to place order with Bodega"))?;

        self.wait_until_fulfilled(&order_id).await?;

        self.manager.add_order_info(&order_id, names).await
    }

    async fn delete(&self, vms: &VmList) -> Result<()> {
        warn!(machines = ?vms.names(), "bodega delete is not implemented; nothing was released");
        Ok(())
    }

    async fn extend(&self, vms: &VmList, lifetime: Duration) -> Result<()> {
        warn!(
            machines = ?vms.names(),
            lifetime = %format_time_delta(lifetime),
            "bodega extend is not implemented; leases are unchanged"
        );
        Ok(())
    }

    #[instrument(skip(self), name = "bodega_list")]
    async fn list(&self) -> Result<VmList> {
        let orders = self.manager.order_to_machine_map().await?;

        let mut vms = VmList::new();
        for order_id in orders.keys() {
            let order = self
                .manager
                .get_order(order_id)
                .await
                .map_err(|e| e.context(format!("unable to consume order {order_id}")))?;

            let items = order.fulfilled_items.ok_or_else(|| {
                Error::Order(format!("order {order_id} has no fulfilled_items"))
            })?;
            for (name, item) in items {
                vms.push(to_vm(name, item)?);
            }
        }

        info!(machines = vms.len(), "listed bodega machines");
        Ok(vms)
    }

    async fn find_active_account(&self) -> Result<String> {
        Ok(REMOTE_USER.to_string())
    }
}
