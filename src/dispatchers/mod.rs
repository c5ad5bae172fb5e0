//! Connection selection strategies

mod dispatcher;
mod random;
mod rotation;
mod round_robin;
mod weight;

pub use dispatcher::Dispatcher;
pub use random::RandomDispatcher;
pub use round_robin::RoundRobinDispatcher;
pub use weight::WeightDispatcher;

use std::fmt;
use std::str::FromStr;

use crate::error::DispatchError;
use crate::profile::{ConnPool, DispatchProfile};

/// Known dispatch strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Weight,
    Random,
    RoundRobin,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Weight, Strategy::Random, Strategy::RoundRobin];

    /// Name used in profiles
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Weight => "*weight",
            Strategy::Random => "*random",
            Strategy::RoundRobin => "*round_robin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Weight => "Walk connections by weight, highest first, wrapping around",
            Strategy::Random => "Walk connections in a fresh random order for every request",
            Strategy::RoundRobin => "Start every request on the next connection in weight order",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| DispatchError::UnsupportedStrategy(s.to_string()))
    }
}

/// Build a dispatcher for the profile's strategy over a sorted copy of its connections
pub fn new_dispatcher(profile: &DispatchProfile) -> Result<Box<dyn Dispatcher>, DispatchError> {
    let strategy: Strategy = profile.strategy.parse()?;
    let conns = ConnPool::from_profile(profile)?;

    tracing::debug!(
        profile = %profile.tenant_id(),
        strategy = %strategy,
        conns = conns.len(),
        "Dispatcher created"
    );

    Ok(match strategy {
        Strategy::Weight => Box::new(WeightDispatcher::new(conns)),
        Strategy::Random => Box::new(RandomDispatcher::new(conns)),
        Strategy::RoundRobin => Box::new(RoundRobinDispatcher::new(conns)),
    })
}

/// Connection ids to try, in order, for one request.
///
/// Draws at most `max_conns` connections from `dispatcher` and stops right
/// after a blocker connection.
pub fn failover_candidates(dispatcher: &dyn Dispatcher) -> Vec<String> {
    let mut ids = Vec::with_capacity(dispatcher.max_conns());
    for _ in 0..dispatcher.max_conns() {
        let conn = dispatcher.next_conn();
        ids.push(conn.id);
        if conn.blocker {
            break;
        }
    }
    ids
}
