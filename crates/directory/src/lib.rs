//! Directory access contract consumed by the explorer core.
//!
//! The core never talks to a directory server directly. It goes through
//! [`DirectoryRepository`], a blocking, read-concurrent query facade, and opens
//! connections through a [`RepositoryFactory`]. [`MemoryDirectory`] is the
//! built-in backend.

mod entity;
mod error;
mod filter;
mod memory;
mod repository;

pub use entity::{Group, Property, User};
pub use error::{DirectoryError, Result};
pub use filter::{escape_term, matches_prefix, normalize_term, prefix_filter};
pub use memory::{MemoryDirectory, MemoryDirectoryFactory};
pub use repository::{ConnectionSettings, DirectoryRepository, RepositoryFactory};
