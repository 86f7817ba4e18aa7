use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier the leasing service assigns to an order (its `sid`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        OrderId(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId(s)
    }
}

/// A machine as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vm {
    pub name: String,
    pub provider: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
    pub public_ip: String,
    pub remote_user: String,
    pub zone: String,
}

/// An ordered collection of machines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmList(pub Vec<Vm>);

impl VmList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|vm| vm.name.clone()).collect()
    }

    pub fn first(&self) -> Option<&Vm> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, vm: Vm) {
        self.0.push(vm);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vm> {
        self.0.iter()
    }

    /// Keep only the machines whose names appear in `names`.
    pub fn retain_named(&mut self, names: &[String]) {
        self.0.retain(|vm| names.contains(&vm.name));
    }
}

impl From<Vec<Vm>> for VmList {
    fn from(vms: Vec<Vm>) -> Self {
        VmList(vms)
    }
}

impl IntoIterator for VmList {
    type Item = Vm;
    type IntoIter = std::vec::IntoIter<Vm>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Provider-independent options for creating machines.
#[derive(Debug, Clone)]
pub struct CreateOpts {
    /// Requested lease duration.
    pub lifetime: Duration,
}

impl Default for CreateOpts {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(12 * 3_600),
        }
    }
}
