//! Synchronous errors returned by explorer models.

use adex_directory::DirectoryError;
use thiserror::Error;

use crate::Operation;

/// Precondition or connection failures reported to the caller directly.
///
/// Failures inside background work never use this type; they surface as
/// [`crate::Fault`]s on the event channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExplorerError {
	/// An operation needing a directory connection ran before one was opened.
	#[error("{operation} requires an open directory connection")]
	NotConnected { operation: Operation },

	/// A member search or roster operation ran before a group was chosen.
	#[error("no group selected")]
	GroupNotSet,

	#[error(transparent)]
	Directory(#[from] DirectoryError),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
