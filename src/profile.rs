//! Dispatch profiles and the connection pools built from them

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DispatchError;

/// A single connection a dispatcher may hand out
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnDescriptor {
    /// Connection identifier, owned and resolved by the caller
    pub id: String,
    /// Priority of the connection; higher weights are tried first
    #[serde(default)]
    pub weight: f64,
    /// Stop failing over once this connection has been tried
    #[serde(default)]
    pub blocker: bool,
    /// Opaque per-connection parameters, passed through untouched
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, serde_yaml::Value>,
}

impl ConnDescriptor {
    /// Create a descriptor with the given id and weight
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
            blocker: false,
            params: HashMap::new(),
        }
    }

    /// Mark the descriptor as a failover blocker
    pub fn with_blocker(mut self, blocker: bool) -> Self {
        self.blocker = blocker;
        self
    }
}

/// Routing profile handed in by configuration management
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DispatchProfile {
    #[serde(default)]
    pub tenant: String,
    pub id: String,
    /// Strategy name, e.g. "*weight"
    pub strategy: String,
    #[serde(default)]
    pub conns: Vec<ConnDescriptor>,
}

impl DispatchProfile {
    pub fn new(
        tenant: impl Into<String>,
        id: impl Into<String>,
        strategy: impl Into<String>,
        conns: Vec<ConnDescriptor>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            id: id.into(),
            strategy: strategy.into(),
            conns,
        }
    }

    /// Key identifying the profile, "tenant:id"
    pub fn tenant_id(&self) -> String {
        format!("{}:{}", self.tenant, self.id)
    }
}

/// Non-empty, canonically ordered copy of a profile's connections.
///
/// The canonical order is weight descending; equal weights keep the order in
/// which they were declared. Every dispatcher built from the same profile
/// therefore agrees on the order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnPool {
    conns: Vec<ConnDescriptor>,
}

impl ConnPool {
    /// Deep-copy and sort the connections of `profile`
    pub fn from_profile(profile: &DispatchProfile) -> Result<Self, DispatchError> {
        if profile.conns.is_empty() {
            return Err(DispatchError::EmptyPool(profile.tenant_id()));
        }
        let mut conns = profile.conns.clone();
        // sort_by is stable, ties stay in declaration order
        conns.sort_by(|a, b| sort_weight(b.weight).total_cmp(&sort_weight(a.weight)));
        Ok(Self { conns })
    }

    /// Pool built without the non-empty check
    #[cfg(test)]
    pub(crate) fn unchecked(conns: Vec<ConnDescriptor>) -> Self {
        Self { conns }
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    /// Always false for a pool built by `from_profile`
    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ConnDescriptor> {
        self.conns.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnDescriptor> {
        self.conns.iter()
    }

    /// Connection ids in pool order
    pub fn ids(&self) -> Vec<String> {
        self.conns.iter().map(|c| c.id.clone()).collect()
    }

    /// Deep copy of the pool in a uniformly random order
    pub fn shuffled(&self) -> Self {
        let mut conns = self.conns.clone();
        conns.shuffle(&mut rand::thread_rng());
        Self { conns }
    }
}

/// Weight as used for ordering: -0.0 equals 0.0 and NaN sorts last
fn sort_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        f64::NEG_INFINITY
    } else {
        weight + 0.0
    }
}
