use circuit_retained::ScopeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("content host has been disposed")]
    Disposed,
    #[error(transparent)]
    Scope(#[from] ScopeError),
}
