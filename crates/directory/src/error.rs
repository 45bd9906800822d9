//! Error types for directory access.

use thiserror::Error;

/// Failures reported by a [`crate::DirectoryRepository`] or [`crate::RepositoryFactory`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
	/// Opening or probing the connection failed.
	#[error("could not connect to {domain}: {reason}")]
	Connection {
		/// Domain the caller asked for, or `<current>` for the ambient domain.
		domain: String,
		/// Backend-provided reason.
		reason: String,
	},

	/// A membership mutation referenced a group that does not exist.
	#[error("could not find a group with the given name ({name})")]
	GroupNotFound { name: String },

	/// A membership mutation referenced a user that does not exist.
	#[error("could not find a user with the given name ({name})")]
	UserNotFound { name: String },

	/// Any other backend failure.
	#[error("directory backend error: {0}")]
	Backend(String),
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
