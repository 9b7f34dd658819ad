//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Prompt)
//! but are themselves concrete structs, not traits.

mod session;

pub use session::{HighlightScope, Session};
