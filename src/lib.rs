//! conn-dispatcher: connection selection strategies for request dispatchers
//!
//! Features:
//! - Weight ordered rotation over a pool of connection ids
//! - Request-scoped dispatcher instances cloned from a shared dispatcher
//! - Live profile updates without disturbing in-flight instances
//! - A registry holding one long-lived dispatcher per profile

pub mod config;
pub mod dispatchers;
pub mod error;
pub mod profile;
pub mod registry;

pub use config::AppConfig;
pub use dispatchers::{failover_candidates, new_dispatcher, Dispatcher, Strategy};
pub use error::DispatchError;
pub use profile::{ConnDescriptor, ConnPool, DispatchProfile};
pub use registry::DispatcherRegistry;
