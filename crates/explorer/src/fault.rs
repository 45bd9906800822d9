//! Error channel for background work.
//!
//! Background units never return errors to the code that started them. Every
//! failure is caught at the unit's boundary, classified as a [`Failure`], and
//! published once through [`ErrorChannel::report`] as a [`Fault`]. Cooperative
//! cancellation is classified but never published.

use std::fmt;

use adex_directory::DirectoryError;
use tokio::task::JoinError;

use crate::{EventSender, ExplorerEvent};

/// Background operation a fault is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	OpenConnection,
	SearchGroups,
	SearchUsers,
	SearchCandidates,
	LoadRoster,
	ExpandGroup,
	ExpandUser,
	GroupProperties,
	UserProperties,
	AddMember,
	RemoveMember,
}

impl Operation {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::OpenConnection => "open connection",
			Self::SearchGroups => "search groups",
			Self::SearchUsers => "search users",
			Self::SearchCandidates => "search member candidates",
			Self::LoadRoster => "load group roster",
			Self::ExpandGroup => "expand group",
			Self::ExpandUser => "expand user",
			Self::GroupProperties => "load group properties",
			Self::UserProperties => "load user properties",
			Self::AddMember => "add group member",
			Self::RemoveMember => "remove group member",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Operator-facing description of one failed background unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
	pub operation: Operation,
	/// Term, group, or user the operation was working on.
	pub subject: Option<String>,
	pub message: String,
	/// Diagnostic detail for operators who want more than the message.
	pub detail: Option<String>,
}

impl fmt::Display for Fault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.subject {
			Some(subject) => write!(f, "{} ({subject}) failed: {}", self.operation, self.message),
			None => write!(f, "{} failed: {}", self.operation, self.message),
		}
	}
}

/// Outcome of a background unit that did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
	/// Stopped by supersession or shutdown. Never reported.
	Cancelled,
	Directory(DirectoryError),
	/// The unit panicked; carries the panic payload.
	Panic(String),
}

impl From<DirectoryError> for Failure {
	fn from(err: DirectoryError) -> Self {
		Self::Directory(err)
	}
}

impl From<JoinError> for Failure {
	fn from(err: JoinError) -> Self {
		match adex_worker::join_error_panic_message(err) {
			Some(message) => Self::Panic(message),
			None => Self::Cancelled,
		}
	}
}

impl Failure {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Converts into a reportable fault; cancellation yields `None`.
	pub fn into_fault(self, operation: Operation, subject: Option<String>) -> Option<Fault> {
		let (message, detail) = match self {
			Self::Cancelled => return None,
			Self::Directory(err) => (err.to_string(), Some(format!("{err:?}"))),
			Self::Panic(message) => (message, Some(format!("{operation} panicked"))),
		};
		Some(Fault {
			operation,
			subject,
			message,
			detail,
		})
	}
}

/// Publishes faults from background units to the presentation loop.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
	events: EventSender,
}

impl ErrorChannel {
	pub fn new(events: EventSender) -> Self {
		Self { events }
	}

	/// Reports `failure` unless it is a cancellation; returns whether it was sent.
	pub fn report(&self, operation: Operation, subject: Option<&str>, failure: Failure) -> bool {
		let Some(fault) = failure.into_fault(operation, subject.map(str::to_owned)) else {
			tracing::debug!(%operation, subject, "fault.cancelled");
			return false;
		};
		tracing::warn!(%operation, subject, message = %fault.message, "fault.report");
		self.events.send(ExplorerEvent::Fault(fault));
		true
	}
}
