//! Weight strategy: ordered rotation over the weight sorted pool

use parking_lot::RwLock;

use super::dispatcher::Dispatcher;
use super::rotation::Rotation;
use super::Strategy;
use crate::error::DispatchError;
use crate::profile::{ConnDescriptor, ConnPool, DispatchProfile};

/// Hands out connections in weight order, highest first, wrapping around.
///
/// Weight only decides the order of the pool; it does not change how often a
/// connection is picked.
#[derive(Debug)]
pub struct WeightDispatcher {
    state: RwLock<Rotation>,
}

impl WeightDispatcher {
    pub fn new(conns: ConnPool) -> Self {
        Self {
            state: RwLock::new(Rotation::new(conns)),
        }
    }
}

impl Dispatcher for WeightDispatcher {
    fn strategy(&self) -> Strategy {
        Strategy::Weight
    }

    fn set_profile(&self, profile: &DispatchProfile) -> Result<(), DispatchError> {
        let conns = ConnPool::from_profile(profile)?;
        tracing::debug!(
            profile = %profile.tenant_id(),
            conns = conns.len(),
            "Weight dispatcher profile updated"
        );
        self.state.write().reset(conns);
        Ok(())
    }

    fn get_instance(&self) -> Box<dyn Dispatcher> {
        let conns = self.state.read().conns().clone();
        Box::new(WeightDispatcher::new(conns))
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
    use crate::profile::ConnDescriptor;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn make_profile(conns: &[(&str, f64)]) -> DispatchProfile {
        DispatchProfile::new(
            "example.org",
            "DSP1",
            "*weight",
            conns.iter().map(|(id, w)| ConnDescriptor::new(*id, *w)).collect(),
        )
    }

    fn make_dispatcher(conns: &[(&str, f64)]) -> WeightDispatcher {
        WeightDispatcher::new(ConnPool::from_profile(&make_profile(conns)).unwrap())
    }

    #[test]
    fn test_weight_tie_first_declared_wins() {
        let d = make_dispatcher(&[("A", 10.0), ("B", 20.0), ("C", 20.0)]);
        let ids: Vec<String> = (0..6).map(|_| d.next_conn_id()).collect();
        assert_eq!(ids, vec!["B", "C", "A", "B", "C", "A"]);
    }

    #[test]
    fn test_weight_full_cycle_then_wrap() {
        let d = make_dispatcher(&[("A", 1.0), ("B", 4.0), ("C", 3.0), ("D", 2.0)]);
        let first_pass: Vec<String> = (0..d.max_conns()).map(|_| d.next_conn_id()).collect();
        assert_eq!(first_pass, vec!["B", "C", "D", "A"]);
        assert_eq!(d.next_conn_id(), "B");
    }

    #[test]
    fn test_weight_single_conn() {
        let d = make_dispatcher(&[("A", 1.0)]);
        assert_eq!(d.max_conns(), 1);
        assert_eq!(d.next_conn_id(), "A");
        assert_eq!(d.next_conn_id(), "A");
    }

    #[test]
    fn test_weight_strategy() {
        let d = make_dispatcher(&[("A", 1.0)]);
        assert_eq!(d.strategy(), Strategy::Weight);
    }

    #[test]
    fn test_weight_instance_starts_fresh() {
        let d = make_dispatcher(&[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        d.next_conn_id();
        d.next_conn_id();

        let inst = d.get_instance();
        assert_eq!(inst.next_conn_id(), "A");
        assert_eq!(inst.max_conns(), 3);
        assert_eq!(inst.strategy(), Strategy::Weight);
    }

    #[test]
    fn test_weight_instance_does_not_move_source() {
        let d = make_dispatcher(&[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        let inst = d.get_instance();
        inst.next_conn_id();
        inst.next_conn_id();
        assert_eq!(d.next_conn_id(), "A");
    }

    #[test]
    fn test_weight_instance_independent_of_set_profile() {
        let d = make_dispatcher(&[("A", 3.0), ("B", 2.0)]);
        let inst = d.get_instance();
        d.set_profile(&make_profile(&[("X", 1.0)])).unwrap();
        assert_eq!(inst.max_conns(), 2);
        assert_eq!(inst.next_conn_id(), "A");
        assert_eq!(inst.next_conn_id(), "B");
    }

    #[test]
    fn test_weight_set_profile_resets_cursor() {
        let d = make_dispatcher(&[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        d.next_conn_id();
        d.next_conn_id();

        d.set_profile(&make_profile(&[("X", 1.0), ("Y", 5.0)])).unwrap();
        assert_eq!(d.max_conns(), 2);
        assert_eq!(d.next_conn_id(), "Y");
        assert_eq!(d.next_conn_id(), "X");
        assert_eq!(d.next_conn_id(), "Y");
    }

    #[test]
    fn test_weight_set_profile_shrinks_pool_without_stale_cursor() {
        let d = make_dispatcher(&[("A", 4.0), ("B", 3.0), ("C", 2.0), ("D", 1.0)]);
        for _ in 0..3 {
            d.next_conn_id();
        }
        d.set_profile(&make_profile(&[("X", 1.0)])).unwrap();
        assert_eq!(d.next_conn_id(), "X");
    }

    #[test]
    fn test_weight_set_profile_rejects_empty_pool() {
        let d = make_dispatcher(&[("A", 2.0), ("B", 1.0)]);
        d.next_conn_id();

        let err = d.set_profile(&make_profile(&[])).unwrap_err();
        assert!(matches!(err, DispatchError::EmptyPool(_)));
        assert_eq!(d.max_conns(), 2);
        assert_eq!(d.next_conn_id(), "B");
    }

    #[test]
    fn test_weight_set_profile_repeated() {
        let d = make_dispatcher(&[("A", 1.0)]);
        let p = make_profile(&[("B", 1.0), ("C", 2.0)]);
        d.set_profile(&p).unwrap();
        d.set_profile(&p).unwrap();
        assert_eq!(d.max_conns(), 2);
        assert_eq!(d.next_conn_id(), "C");
    }

    #[test]
    fn test_weight_concurrent_instances_with_reload() {
        let old = [("A", 3.0), ("B", 2.0), ("C", 1.0)];
        let new = [("X", 1.0), ("Y", 2.0)];
        let shared = Arc::new(make_dispatcher(&old));
        let known: HashSet<&str> = ["A", "B", "C", "X", "Y"].into_iter().collect();

        std::thread::scope(|s| {
            let mut handles = Vec::new();
            for _ in 0..8 {
                let shared = Arc::clone(&shared);
                handles.push(s.spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..500 {
                        let inst = shared.get_instance();
                        let n = inst.max_conns();
                        let ids: Vec<String> = (0..n).map(|_| inst.next_conn_id()).collect();
                        // an instance never mixes generations
                        let old_gen = ids == vec!["A", "B", "C"];
                        let new_gen = ids == vec!["Y", "X"];
                        assert!(old_gen || new_gen, "mixed generation: {:?}", ids);
                        seen.extend(ids);
                    }
                    seen
                }));
            }

            let reloader = Arc::clone(&shared);
            s.spawn(move || {
                reloader.set_profile(&make_profile(&new)).unwrap();
            });

            for handle in handles {
                for id in handle.join().unwrap() {
                    assert!(known.contains(id.as_str()));
                }
            }
        });

        assert_eq!(shared.max_conns(), 2);
        assert_eq!(shared.get_instance().next_conn_id(), "Y");
    }

    #[test]
    fn test_weight_concurrent_shared_next_conn() {
        let shared = Arc::new(make_dispatcher(&[("A", 2.0), ("B", 1.0)]));
        let counts = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let shared = Arc::clone(&shared);
                    s.spawn(move || {
                        let mut a = 0usize;
                        for _ in 0..1000 {
                            if shared.next_conn_id() == "A" {
                                a += 1;
                            }
                        }
                        a
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum::<usize>()
        });
        // 4000 picks strictly alternating between two connections
        assert_eq!(counts, 2000);
    }
}
