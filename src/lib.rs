//! Identity forest: a tree of display nodes bound to shared `Person` identities.
//!
//! Several nodes may reference one identity ("instances"); renaming through
//! any of them relabels all of them, and identities vanish once the last
//! referencing node is deleted.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
