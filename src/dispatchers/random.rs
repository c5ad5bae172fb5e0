//! Random strategy: every request instance walks the pool in its own shuffled order

use parking_lot::RwLock;

use super::dispatcher::Dispatcher;
use super::rotation::Rotation;
use super::Strategy;
use crate::error::DispatchError;
use crate::profile::{ConnDescriptor, ConnPool, DispatchProfile};

#[derive(Debug)]
pub struct RandomDispatcher {
    state: RwLock<Rotation>,
}

impl RandomDispatcher {
    pub fn new(conns: ConnPool) -> Self {
        Self {
            state: RwLock::new(Rotation::new(conns)),
        }
    }
}

impl Dispatcher for RandomDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Random
    }

    fn set_profile(&self, profile: &DispatchProfile) -> Result<(), DispatchError> {
        let conns = ConnPool::from_profile(profile)?;
        tracing::debug!(
            profile = %profile.tenant_id(),
            conns = conns.len(),
            "Random dispatcher profile updated"
        );
        self.state.write().reset(conns);
        Ok(())
    }

    fn get_instance(&self) -> Box<dyn Dispatcher> {
        let conns = self.state.read().conns().shuffled();
        Box::new(RandomDispatcher::new(conns))
    }

    fn next_conn(&self) -> ConnDescriptor {
        self.state.write().next()
    }

    fn max_conns(&self) -> usize {
        self.state.read().len()
    }
}
