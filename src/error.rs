//! Dispatcher errors

/// Errors raised while building or reconfiguring a dispatcher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("unsupported dispatch strategy: <{0}>")]
    UnsupportedStrategy(String),

    #[error("dispatcher profile <{0}> has no connections")]
    EmptyPool(String),
}
