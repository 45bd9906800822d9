//! Presentation-loop event bus.
//!
//! Background units send [`ExplorerEvent`]s through an [`EventSender`]; the
//! single presentation loop owns the [`EventLoop`] and drains it between
//! frames, applying searching-flag transitions and queueing faults for display.
//!
//! ```text
//! search / expand / mutate task ─┐
//!                                ├──► ExplorerEvent ──► EventLoop::pump() ──► searching flags, faults
//! search / expand / mutate task ─┘
//! ```
//!
//! Workers never call presentation code; they only enqueue.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use tokio::sync::mpsc;

use crate::Fault;

/// Independently orchestrated search pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
	Groups,
	Users,
	/// Candidate-member search of a [`crate::MemberSearch`].
	Candidates,
	/// Member / non-member listing of a [`crate::GroupRoster`].
	Roster,
}

impl Domain {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Groups => "groups",
			Self::Users => "users",
			Self::Candidates => "candidates",
			Self::Roster => "roster",
		}
	}
}

impl fmt::Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Message from background work to the presentation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEvent {
	/// Searching flag transition for one request generation of a domain.
	Searching { domain: Domain, generation: u64, active: bool },
	/// A background unit failed.
	Fault(Fault),
	/// A membership mutation succeeded.
	MembershipChanged { group: String, user: String, member: bool },
	ConnectionOpened { server: String },
}

/// Cloneable sending half held by models and their background units.
#[derive(Debug, Clone)]
pub struct EventSender {
	tx: mpsc::UnboundedSender<ExplorerEvent>,
}

impl EventSender {
	/// Enqueues `event`; a closed presentation loop drops it.
	pub fn send(&self, event: ExplorerEvent) {
		if self.tx.send(event).is_err() {
			tracing::trace!("event.dropped");
		}
	}
}

/// Creates a connected sender / presentation loop pair.
pub fn channel() -> (EventSender, EventLoop) {
	let (tx, rx) = mpsc::unbounded_channel();
	(EventSender { tx }, EventLoop::new(rx))
}

#[derive(Debug, Clone, Copy, Default)]
struct SearchingState {
	generation: u64,
	active: bool,
}

/// Presentation-side state fed by the event bus.
#[derive(Debug)]
pub struct EventLoop {
	rx: mpsc::UnboundedReceiver<ExplorerEvent>,
	searching: HashMap<Domain, SearchingState>,
	faults: VecDeque<Fault>,
}

impl EventLoop {
	fn new(rx: mpsc::UnboundedReceiver<ExplorerEvent>) -> Self {
		Self {
			rx,
			searching: HashMap::new(),
			faults: VecDeque::new(),
		}
	}

	/// Drains queued events without waiting, applying each in arrival order.
	pub fn pump(&mut self) -> Vec<ExplorerEvent> {
		let mut drained = Vec::new();
		while let Ok(event) = self.rx.try_recv() {
			self.apply(&event);
			drained.push(event);
		}
		drained
	}

	/// Waits for one event and applies it. `None` once every sender is gone.
	pub async fn next(&mut self) -> Option<ExplorerEvent> {
		let event = self.rx.recv().await?;
		self.apply(&event);
		Some(event)
	}

	/// Searching flag as last applied for `domain`.
	pub fn is_searching(&self, domain: Domain) -> bool {
		self.searching.get(&domain).is_some_and(|s| s.active)
	}

	/// Latest generation seen for `domain`, or 0 if none.
	pub fn generation(&self, domain: Domain) -> u64 {
		self.searching.get(&domain).map_or(0, |s| s.generation)
	}

	pub fn has_faults(&self) -> bool {
		!self.faults.is_empty()
	}

	/// Removes and returns every fault waiting to be shown.
	pub fn take_faults(&mut self) -> Vec<Fault> {
		self.faults.drain(..).collect()
	}

	fn apply(&mut self, event: &ExplorerEvent) {
		match event {
			ExplorerEvent::Searching { domain, generation, active } => self.apply_searching(*domain, *generation, *active),
			ExplorerEvent::Fault(fault) => self.faults.push_back(fault.clone()),
			ExplorerEvent::MembershipChanged { .. } | ExplorerEvent::ConnectionOpened { .. } => {}
		}
	}

	// A transition for an older generation than the one shown is stale. An end
	// for a newer generation (explicit cancel) advances past the running one.
	fn apply_searching(&mut self, domain: Domain, generation: u64, active: bool) {
		let state = self.searching.entry(domain).or_default();
		if generation < state.generation {
			tracing::trace!(%domain, generation, active, latest = state.generation, "event.searching.stale");
			return;
		}
		*state = SearchingState { generation, active };
	}
}
