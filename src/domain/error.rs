//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;
use crate::domain::entities::IdentityId;

/// Domain errors represent violations of the identity-tree invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid parent: {0} is not part of the forest")]
    InvalidParent(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Should never surface while the model invariants hold.
    #[error("unknown identity: {0}")]
    UnknownIdentity(IdentityId),

    #[error("invalid node path: {0}")]
    InvalidPath(String),

    #[error("invalid snapshot: {message}")]
    Snapshot { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
