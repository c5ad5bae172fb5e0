//! Pool plus cursor shared by every strategy

use crate::profile::{ConnDescriptor, ConnPool};

/// One generation of dispatcher state.
///
/// Not thread safe on its own; dispatchers keep it behind a lock.
#[derive(Debug, Clone)]
pub(crate) struct Rotation {
    conns: ConnPool,
    next_idx: usize,
}

impl Rotation {
    pub(crate) fn new(conns: ConnPool) -> Self {
        Self::starting_at(conns, 0)
    }

    /// Rotation whose first pick is `start` (taken modulo the pool size)
    pub(crate) fn starting_at(conns: ConnPool, start: usize) -> Self {
        assert!(!conns.is_empty(), "rotation built over an empty connection pool");
        let next_idx = start % conns.len();
        Self { conns, next_idx }
    }

    pub(crate) fn conns(&self) -> &ConnPool {
        &self.conns
    }

    pub(crate) fn next_idx(&self) -> usize {
        self.next_idx
    }

    pub(crate) fn len(&self) -> usize {
        self.conns.len()
    }

    /// Swap in a new pool, starting over from the first connection
    pub(crate) fn reset(&mut self, conns: ConnPool) {
        *self = Self::new(conns);
    }

    pub(crate) fn advance(&mut self) {
        self.next_idx += 1;
        if self.next_idx >= self.conns.len() {
            self.next_idx = 0;
        }
    }

    pub(crate) fn next(&mut self) -> ConnDescriptor {
        let conn = match self.conns.get(self.next_idx) {
            Some(conn) => conn.clone(),
            None => panic!(
                "rotation cursor {} outside pool of {} connections",
                self.next_idx,
                self.conns.len()
            ),
        };
        self.advance();
        conn
    }
}
