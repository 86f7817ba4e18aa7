use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use vmlease_core::{format_time_delta, BodegaConfig, Error, OrderId, Result, VmList};

use crate::api::{
    Order, OrderList, OrderStatus, OrderStatusResponse, OrderUpdate, PlaceOrderRequest,
    SidResponse,
};
use crate::http::HttpClient;
use crate::opts::BodegaOpts;
use crate::registry::{OrderMap, OrderRegistry};

pub const DEFAULT_BASE_URL: &str = "https://bodega.rubrik-lab.com";

const PATH_ORDERS: &str = "api/orders/";
const PATH_ORDER_UPDATES: &str = "api/order_updates/";
const PATH_PROFILE: &str = "api/profile/";

/// Places, inspects and closes Bodega orders, and keeps the local
/// registry of which machines belong to which order.
#[derive(Clone)]
pub struct BodegaManager {
    base_url: Url,
    client: HttpClient,
    registry: OrderRegistry,
}

impl BodegaManager {
    /// Build a manager talking to the production Bodega host.
    pub fn new(config: &BodegaConfig, registry: OrderRegistry) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            client: HttpClient::new(config.authorization())?,
            registry,
        })
    }

    /// Read the token from `~/.bodega.conf.yml` and use the default registry path.
    pub fn from_default_config() -> Result<Self> {
        let config_path = BodegaConfig::default_path()?;
        let config = BodegaConfig::load(&config_path)
            .map_err(|e| e.context("unable to read Bodega token"))?;
        Self::new(&config, OrderRegistry::new(OrderRegistry::default_path()?))
    }

    /// Point the manager at a different API host.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid request path {path}: {e}")))
    }

    /// `api/orders/{id}`, with the id escaped as a single path segment.
    fn order_url(&self, order_id: &OrderId) -> Result<Url> {
        let mut url = self.url(PATH_ORDERS)?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push(order_id.as_str());
        Ok(url)
    }

    /// Place one order requesting a machine per name. Returns the new order id.
    #[instrument(skip(self, opts), name = "bodega_place_order")]
    pub async fn place_order(&self, names: &[String], opts: &BodegaOpts) -> Result<OrderId> {
        let item = opts.order_item();
        let items: BTreeMap<String, _> = names
            .iter()
            .map(|name| (name.clone(), item.clone()))
            .collect();
        let request = PlaceOrderRequest::new(&items)?;

        let created: SidResponse = self.client.post(&self.url(PATH_ORDERS)?, &request).await?;
        let order_id = OrderId(created.sid);

        info!(order_id = %order_id, machines = names.len(), model = %opts.model, "order placed");
        Ok(order_id)
    }

    #[instrument(skip(self), name = "bodega_close_order")]
    pub async fn close_order(&self, order_id: &OrderId) -> Result<()> {
        let update = OrderUpdate {
            order_sid: order_id.clone(),
            new_status: Some(OrderStatus::Closed),
            time_limit_delta: None,
            comment: "This order is closed by vmlease.".to_string(),
        };
        self.post_update(&update).await?;

        info!(order_id = %order_id, "order closed");
        Ok(())
    }

    #[instrument(skip(self), name = "bodega_extend_order")]
    pub async fn extend_order(&self, order_id: &OrderId, delta: Duration) -> Result<()> {
        let formatted = format_time_delta(delta);
        let update = OrderUpdate {
            order_sid: order_id.clone(),
            new_status: None,
            time_limit_delta: Some(formatted.clone()),
            comment: format!(
                "This order is extended by vmlease.\nIt has been extended for {formatted}"
            ),
        };
        self.post_update(&update).await?;

        info!(order_id = %order_id, delta = %formatted, "order extended");
        Ok(())
    }

    async fn post_update(&self, update: &OrderUpdate) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .post(&self.url(PATH_ORDER_UPDATES)?, update)
            .await?;
        Ok(())
    }

    /// Fetch the full order from the service.
    pub async fn consume_order(&self, order_id: &OrderId) -> Result<Order> {
        self.client.get(&self.order_url(order_id)?).await
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        self.consume_order(order_id).await
    }

    /// Fetch only the status of an order.
    pub async fn order_status(&self, order_id: &OrderId) -> Result<OrderStatus> {
        let order: OrderStatusResponse = self.client.get(&self.order_url(order_id)?).await?;
        Ok(order.status)
    }

    /// Whether the order is fulfilled. Failing to ask counts as "not yet".
    pub async fn fulfilled(&self, order_id: &OrderId) -> bool {
        match self.order_status(order_id).await {
            Ok(status) => {
                debug!(order_id = %order_id, %status, "polled order");
                status == OrderStatus::Fulfilled
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "unable to poll order, treating as not fulfilled");
                false
            }
        }
    }

    /// The current user's live (open or fulfilled) orders.
    pub async fn list_orders(&self) -> Result<OrderList> {
        let owner_sid = self
            .owner_sid()
            .await
            .map_err(|e| e.context("unable to get user's sid"))?;

        let mut url = self.url(PATH_ORDERS)?;
        url.query_pairs_mut()
            .append_pair("owner_sid", &owner_sid)
            .append_pair("status_live", "true");

        self.client.get(&url).await
    }

    /// The `sid` of the user the token belongs to.
    pub async fn owner_sid(&self) -> Result<String> {
        let profile: SidResponse = self.client.get(&self.url(PATH_PROFILE)?).await?;
        Ok(profile.sid)
    }

    /// Ids of the user's live orders, in the order the service returns them.
    pub async fn live_order_ids(&self) -> Result<Vec<OrderId>> {
        let orders = self
            .list_orders()
            .await
            .map_err(|e| e.context("unable to list orders"))?;
        Ok(orders.results.into_iter().map(|order| order.sid).collect())
    }

    /// Registry entries whose orders are still live.
    pub async fn order_to_machine_map(&self) -> Result<OrderMap> {
        let mut orders = self.registry.read().await?;
        if orders.is_empty() {
            return Ok(orders);
        }

        let live = self.live_order_ids().await?;
        orders.retain(|order_id, _| live.contains(order_id));
        Ok(orders)
    }

    /// Overwrite the registry with `orders`.
    pub async fn save_order_info(&self, orders: &OrderMap) -> Result<()> {
        self.registry.write(orders).await
    }

    /// Record `names` under `order_id`, dropping entries for orders that are no longer live.
    pub async fn add_order_info(&self, order_id: &OrderId, names: &[String]) -> Result<()> {
        let mut orders = self
            .order_to_machine_map()
            .await
            .map_err(|e| e.context("unable to get order to machine map"))?;
        orders.insert(order_id.clone(), names.to_vec());

        self.save_order_info(&orders)
            .await
            .map_err(|e| e.context("unable to save order info to file"))
    }

    /// The order the given machines were created under.
    ///
    /// All machines are assumed to come from one order; only the first is looked up.
    pub async fn order_id_of_vms(&self, vms: &VmList) -> Result<OrderId> {
        let first = vms
            .first()
            .ok_or_else(|| Error::Order("no machine provided".into()))?;

        let orders = self
            .order_to_machine_map()
            .await
            .map_err(|e| e.context("unable to get order to machine map"))?;

        orders
            .into_iter()
            .find(|(_, machines)| machines.contains(&first.name))
            .map(|(order_id, _)| order_id)
            .ok_or_else(|| {
                Error::Order(format!(
                    "unable to find orderID for machines: {:?}",
                    vms.names()
                ))
            })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized).map_err(|e| Error::Config(format!("invalid base URL {base_url}: {e}")))
}
