//! Long-lived dispatchers, one per routing profile

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatchers::{new_dispatcher, Dispatcher, Strategy};
use crate::error::DispatchError;
use crate::profile::DispatchProfile;

/// Registry of shared dispatchers keyed by "tenant:id"
#[derive(Debug, Default)]
pub struct DispatcherRegistry {
    dispatchers: RwLock<HashMap<String, Arc<dyn Dispatcher>>>,
}

impl DispatcherRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding a dispatcher for every profile
    pub fn from_profiles(profiles: &[DispatchProfile]) -> Result<Self, DispatchError> {
        let registry = Self::new();
        for profile in profiles {
            registry.upsert(profile)?;
        }
        Ok(registry)
    }

    /// Install or update the dispatcher for `profile`.
    ///
    /// A dispatcher already running the profile's strategy is updated in place
    /// so instances keep being drawn from the same object; a strategy change
    /// replaces it. On error the registry is left untouched.
    pub fn upsert(&self, profile: &DispatchProfile) -> Result<(), DispatchError> {
        let key = profile.tenant_id();
        let strategy: Strategy = match profile.strategy.parse() {
            Ok(strategy) => strategy,
            Err(e) => {
                tracing::warn!(profile = %key, error = %e, "Rejected dispatcher profile");
                return Err(e);
            }
        };

        let existing = self.get(&key);
        if let Some(dispatcher) = existing.filter(|d| d.strategy() == strategy) {
            if let Err(e) = dispatcher.set_profile(profile) {
                tracing::warn!(profile = %key, error = %e, "Rejected dispatcher profile");
                return Err(e);
            }
            tracing::debug!(profile = %key, strategy = %strategy, "Dispatcher updated");
            return Ok(());
        }

        let dispatcher: Arc<dyn Dispatcher> = match new_dispatcher(profile) {
            Ok(dispatcher) => Arc::from(dispatcher),
            Err(e) => {
                tracing::warn!(profile = %key, error = %e, "Rejected dispatcher profile");
                return Err(e);
            }
        };
        let replaced = self.dispatchers.write().insert(key.clone(), dispatcher);
        tracing::info!(
            profile = %key,
            strategy = %strategy,
            replaced = replaced.is_some(),
            "Dispatcher installed"
        );
        Ok(())
    }

    /// Shared dispatcher for a profile
    pub fn get(&self, tenant_id: &str) -> Option<Arc<dyn Dispatcher>> {
        self.dispatchers.read().get(tenant_id).cloned()
    }

    /// Request-scoped instance drawn from the profile's dispatcher
    pub fn instance(&self, tenant_id: &str) -> Option<Box<dyn Dispatcher>> {
        // clone the Arc first so get_instance runs outside the map lock
        self.get(tenant_id).map(|d| d.get_instance())
    }

    /// Drop the dispatcher for a profile; instances already handed out keep working
    pub fn remove(&self, tenant_id: &str) -> bool {
        let removed = self.dispatchers.write().remove(tenant_id).is_some();
        if removed {
            tracing::info!(profile = %tenant_id, "Dispatcher removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.dispatchers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.read().is_empty()
    }

    /// Registered profile keys, sorted
    pub fn profile_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.dispatchers.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
