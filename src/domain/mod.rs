//! Domain layer: identities, the display forest and the model tying them together
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod model;
pub mod snapshot;

pub use arena::{DisplayNode, Forest, NodeId};
pub use entities::{IdentityId, Person};
pub use error::{DomainError, DomainResult};
pub use model::{format_path, parse_path, IdentityTreeModel, DEFAULT_MAX_AGE};
pub use snapshot::{Document, HierarchyEntry, IdentityRecord, PERSON_CLASS};
