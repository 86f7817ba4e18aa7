//! Request and response bodies for the Bodega REST API.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use vmlease_core::OrderId;

pub const MACHINE_TYPE: &str = "ubuntu_machine";

/// Hardware requirements attached to every requested machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub disk_size: u32,
    pub location: String,
    pub model: String,
}

/// One requested machine in a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub requirements: Requirements,
}

/// Body of `POST /api/orders/`.
///
/// The service expects `items` as a JSON document encoded into a string,
/// not as a nested object.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub items: String,
}

impl PlaceOrderRequest {
    pub fn new(items: &BTreeMap<String, OrderItem>) -> serde_json::Result<Self> {
        Ok(Self {
            items: serde_json::to_string(items)?,
        })
    }
}

/// Body of `POST /api/order_updates/`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdate {
    pub order_sid: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_delta: Option<String>,
    pub comment: String,
}

/// Any response whose only field of interest is `sid`.
#[derive(Debug, Clone, Deserialize)]
pub struct SidResponse {
    pub sid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Fulfilled,
    Closed,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Open and fulfilled orders still hold machines.
    pub fn is_live(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::Fulfilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "OPEN"),
            OrderStatus::Fulfilled => write!(f, "FULFILLED"),
            OrderStatus::Closed => write!(f, "CLOSED"),
            OrderStatus::Other => write!(f, "OTHER"),
        }
    }
}

/// Only the status of an order, used while polling.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
}

/// A machine the service has handed out under an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FulfilledItem {
    /// RFC 3339 timestamp.
    pub time_created: String,
    pub ipv4: String,
    pub username: String,
    pub location: String,
}

/// Response of `GET /api/orders/{sid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub sid: OrderId,
    pub status: OrderStatus,
    /// Absent until the order is fulfilled.
    #[serde(default)]
    pub fulfilled_items: Option<BTreeMap<String, FulfilledItem>>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub expiration_time_limit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    pub sid: OrderId,
}

/// Response of `GET /api/orders/?owner_sid=...&status_live=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderList {
    pub results: Vec<OrderSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_order_request_encodes_items_as_string() {
        let item = OrderItem {
            kind: MACHINE_TYPE.into(),
            requirements: Requirements {
                disk_size: 32,
                location: "AWS-US-WEST-1".into(),
                model: "aws-m4.large".into(),
            },
        };
        let items = BTreeMap::from([("vm1".to_string(), item)]);

        let body = serde_json::to_value(PlaceOrderRequest::new(&items).unwrap()).unwrap();
        let encoded = body["items"].as_str().unwrap();
        let decoded: BTreeMap<String, OrderItem> = serde_json::from_str(encoded).unwrap();

        assert_eq!(decoded["vm1"].kind, "ubuntu_machine");
        assert_eq!(decoded["vm1"].requirements.disk_size, 32);
    }

    #[test]
    fn close_update_omits_time_limit() {
        let update = OrderUpdate {
            order_sid: OrderId::from("o1"),
            new_status: Some(OrderStatus::Closed),
            time_limit_delta: None,
            comment: "closing".into(),
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body["new_status"], "CLOSED");
        assert!(body.get("time_limit_delta").is_none());
    }

    #[test]
    fn unknown_status_decodes_as_other() {
        let order: Order =
            serde_json::from_str(r#"{"sid": "o1", "status": "EXPIRED"}"#).unwrap();
        assert_eq!(order.status, OrderStatus::Other);
        assert!(!order.status.is_live());
        assert!(order.fulfilled_items.is_none());
    }

    #[test]
    fn decodes_fulfilled_order() {
        let json = r#"{
            "sid": "o1",
            "status": "FULFILLED",
            "time_created": "2024-05-01T10:00:00Z",
            "fulfilled_items": {
                "vm1": {
                    "time_created": "2024-05-01T10:05:00Z",
                    "ipv4": "10.1.2.3",
                    "username": "ubuntu",
                    "location": "AWS-US-WEST-1",
                    "sid": "item1"
                }
            }
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert!(order.status.is_live());
        let items = order.fulfilled_items.unwrap();
        assert_eq!(items["vm1"].ipv4, "10.1.2.3");
    }
}
