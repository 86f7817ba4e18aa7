use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vmlease_core::{BodegaConfig, Vm};

use crate::manager::BodegaManager;
use crate::registry::OrderRegistry;

pub const TEST_OWNER: &str = "owner1";

/// A manager pointed at `server` with its registry under `dir`.
pub fn manager_for(server: &MockServer, dir: &TempDir) -> BodegaManager {
    let config = BodegaConfig {
        url: None,
        token: "test-token".into(),
    };
    let registry = OrderRegistry::new(dir.path().join("bodega_orders"));
    BodegaManager::new(&config, registry)
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
}

/// Serve a profile for `TEST_OWNER` and report `ids` as their live orders.
pub async fn mount_live_orders(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/api/profile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sid": TEST_OWNER })))
        .mount(server)
        .await;

    let results: Vec<_> = ids
        .iter()
        .map(|id| json!({ "sid": id, "status": "FULFILLED" }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(query_param("owner_sid", TEST_OWNER))
        .and(query_param("status_live", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": ids.len(),
            "results": results,
        })))
        .mount(server)
        .await;
}

pub fn vm(name: &str) -> Vm {
    Vm {
        name: name.into(),
        provider: "bodega".into(),
        provider_id: "bodega".into(),
        created_at: Utc::now(),
        public_ip: "10.0.0.1".into(),
        remote_user: "ubuntu".into(),
        zone: "AWS-US-WEST-1".into(),
    }
}
