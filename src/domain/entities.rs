//! Domain entities: core data structures

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, opaque identifier of a `Person`.
///
/// Generated once per identity and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for IdentityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for IdentityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Shared identity record referenced by one or more display nodes.
///
/// Two persons are the same iff their ids match; names are mutable and
/// never take part in comparison.
#[derive(Debug, Clone)]
pub struct Person {
    id: IdentityId,
    /// Display name, mirrored into every referencing node's label
    pub name: String,
    age: u8,
}

impl Person {
    pub fn new(id: IdentityId, name: impl Into<String>, age: u8) -> Self {
        Self {
            id,
            name: name.into(),
            age,
        }
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }

    pub fn age(&self) -> u8 {
        self.age
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Person {}

impl Hash for Person {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (age {}, {})", self.name, self.age, self.id)
    }
}
