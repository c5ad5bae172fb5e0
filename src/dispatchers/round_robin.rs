//! Round-robin strategy: successive request instances start on successive connections

use parking_lot::RwLock;

use super::dispatcher::Dispatcher;
use super::rotation::Rotation;
use super::Strategy;
use crate::error::DispatchError;
use crate::profile::{ConnDescriptor, ConnPool, DispatchProfile};

/// Spreads first choices across the pool.
///
/// Unlike the other strategies, `get_instance` moves the shared cursor: the
/// instance starts where the shared dispatcher currently points and the
/// shared cursor advances by one.
#[derive(Debug)]
pub struct RoundRobinDispatcher {
    state: RwLock<Rotation>,
}

impl RoundRobinDispatcher {
    pub fn new(conns: ConnPool) -> Self {
        Self {
            state: RwLock::new(Rotation::new(conns)),
        }
    }

    fn with_rotation(rotation: Rotation) -> Self {
        Self {
            state: RwLock::new(rotation),
        }
    }
}

impl Dispatcher for RoundRobinDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::RoundRobin
    }

    fn set_profile(&self, profile: &DispatchProfile) -> Result<(), DispatchError> {
        let conns = ConnPool::from_profile(profile)?;
        tracing::debug!(
            profile = %profile.tenant_id(),
            conns = conns.len(),
            "Round-robin dispatcher profile updated"
        );
        self.state.write().reset(conns);
        Ok(())
    }

    fn get_instance(&self) -> Box<dyn Dispatcher> {
        let mut state = self.state.write();
        let rotation = Rotation::starting_at(state.conns().clone(), state.next_idx());
        state.advance();
        Box::new(RoundRobinDispatcher::with_rotation(rotation))
    }

    fn next_conn(&self) -> ConnDescriptor {
        self.state.write().next()
    }

    fn max_conns(&self) -> usize {
        self.state.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile(ids: &[&str]) -> DispatchProfile {
        DispatchProfile::new(
            "example.org",
            "DSP_RR",
            "*round_robin",
            ids.iter().map(|id| ConnDescriptor::new(*id, 0.0)).collect(),
        )
    }

    fn make_dispatcher(ids: &[&str]) -> RoundRobinDispatcher {
        RoundRobinDispatcher::new(ConnPool::from_profile(&make_profile(ids)).unwrap())
    }

    #[test]
    fn test_round_robin_instances_rotate_start() {
        let d = make_dispatcher(&["A", "B", "C"]);
        let firsts: Vec<String> = (0..4).map(|_| d.get_instance().next_conn_id()).collect();
        assert_eq!(firsts, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_round_robin_instance_walks_full_pool() {
        let d = make_dispatcher(&["A", "B", "C"]);
        d.get_instance();
        let inst = d.get_instance();
        let ids: Vec<String> = (0..4).map(|_| inst.next_conn_id()).collect();
        assert_eq!(ids, vec!["B", "C", "A", "B"]);
    }

    #[test]
    fn test_round_robin_instance_does_not_share_cursor() {
        let d = make_dispatcher(&["A", "B"]);
        let inst = d.get_instance();
        inst.next_conn_id();
        inst.next_conn_id();
        inst.next_conn_id();
        // source advanced once, by get_instance only
        assert_eq!(d.get_instance().next_conn_id(), "B");
    }

    #[test]
    fn test_round_robin_set_profile_resets_start() {
        let d = make_dispatcher(&["A", "B", "C"]);
        d.get_instance();
        d.get_instance();
        d.set_profile(&make_profile(&["X", "Y"])).unwrap();
        assert_eq!(d.get_instance().next_conn_id(), "X");
        assert_eq!(d.get_instance().next_conn_id(), "Y");
        assert_eq!(d.strategy(), Strategy::RoundRobin);
    }
}
