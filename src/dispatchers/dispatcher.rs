//! Dispatcher trait

use std::fmt;

use super::Strategy;
use crate::error::DispatchError;
use crate::profile::{ConnDescriptor, DispatchProfile};

/// Trait for connection selection strategies.
///
/// A long-lived dispatcher is shared between threads and updated through
/// `set_profile`. Each request draws its own instance with `get_instance`
/// and walks it with `next_conn_id`; instances are never shared between
/// requests.
pub trait Dispatcher: Send + Sync + fmt::Debug {
    /// Return the strategy implemented by this dispatcher
    fn strategy(&self) -> Strategy;

    /// Replace the pool with a sorted copy of the profile's connections and
    /// reset the rotation. An empty pool is rejected and the current pool kept.
    fn set_profile(&self, profile: &DispatchProfile) -> Result<(), DispatchError>;

    /// Clone the dispatcher into an independent, request-scoped instance
    fn get_instance(&self) -> Box<dyn Dispatcher>;

    /// Return the connection at the cursor and advance the cursor
    fn next_conn(&self) -> ConnDescriptor;

    /// Return the next connection id in rotation order
    fn next_conn_id(&self) -> String {
        self.next_conn().id
    }

    /// Number of distinct connections in the pool
    fn max_conns(&self) -> usize;
}
