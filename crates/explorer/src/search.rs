//! Query orchestration for one search domain.
//!
//! # Supersession
//!
//! Every [`SearchDomain::start`] advances the domain's [`GenerationClock`],
//! which cancels the previous request's token. The previous unit is never
//! aborted: its blocking fetch runs to completion, but every list mutation
//! re-checks the token under the list lock and the unit stops at the first
//! failed check. The clear is deferred until the fetch has returned, so a
//! request superseded while fetching never touches the list.
//!
//! # Searching flag
//!
//! The caller's thread sends `Searching { active: true }` before the unit is
//! spawned. The unit sends `active: false` after completing or failing while
//! still current. A superseded unit sends nothing; the newer request owns the
//! flag.

use std::sync::Arc;
use std::time::Duration;

use adex_directory::DirectoryError;
use adex_worker::GenerationClock;

use crate::list::SharedList;
use crate::sink::Comparator;
use crate::unit::{RequestHandle, UnitScope, WorkContext, fetch_into, spawn_unit};
use crate::{Domain, ExplorerEvent, Operation, PropertyItem, PropertyList, property_order};

/// Tunables shared by every request of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
	/// Pause after each sort-insert so observers can render partial results.
	pub insert_pause: Duration,
}

/// One independently superseded search pane and its result list.
#[derive(Debug)]
pub struct SearchDomain<T> {
	domain: Domain,
	operation: Operation,
	clock: Arc<GenerationClock>,
	results: SharedList<T>,
	comparator: Comparator<T>,
	ctx: WorkContext,
}

impl<T: Clone + Send + Sync + 'static> SearchDomain<T> {
	pub(crate) fn new(domain: Domain, operation: Operation, comparator: Comparator<T>, ctx: WorkContext) -> Self {
		Self {
			domain,
			operation,
			clock: ctx.clocks.get(domain),
			results: SharedList::new(),
			comparator,
			ctx,
		}
	}

	pub fn domain(&self) -> Domain {
		self.domain
	}

	pub fn results(&self) -> &SharedList<T> {
		&self.results
	}

	/// Generation of the latest started or cancelled request.
	pub fn generation(&self) -> u64 {
		self.clock.current()
	}

	/// Supersedes any running request and starts `fetch` as the current one.
	///
	/// `fetch` runs on the blocking pool and returns display items in
	/// backend order; they are sort-inserted one at a time.
	pub(crate) fn start<F>(&self, subject: Option<String>, fetch: F) -> RequestHandle
	where
		F: FnOnce() -> Result<Vec<T>, DirectoryError> + Send + 'static,
	{
		let token = self.clock.advance();
		let scope = UnitScope {
			operation: self.operation,
			subject,
			domain: Some(self.domain),
		};
		let runtime = self.ctx.runtime.clone();
		let results = self.results.clone();
		let cmp = self.comparator;
		let pause = self.ctx.options.insert_pause;
		spawn_unit(&self.ctx, scope, token, move |token| async move {
			fetch_into(&runtime, &results, cmp, fetch, &token, pause).await
		})
	}

	/// Supersedes the running request without starting another.
	///
	/// The list keeps whatever the cancelled request had inserted.
	pub fn cancel(&self) {
		let generation = self.clock.invalidate();
		tracing::debug!(domain = %self.domain, generation, "search.cancel");
		self.ctx.events.send(ExplorerEvent::Searching {
			domain: self.domain,
			generation,
			active: false,
		});
	}
}

/// Refreshes a node's property list; a newer refresh of the same node wins.
pub(crate) fn refresh_properties<F>(
	ctx: &WorkContext,
	operation: Operation,
	subject: String,
	properties: &PropertyList,
	fetch: F,
) -> RequestHandle
where
	F: FnOnce() -> Result<Vec<PropertyItem>, DirectoryError> + Send + 'static,
{
	let token = properties.clock().advance();
	let scope = UnitScope {
		operation,
		subject: Some(subject),
		domain: None,
	};
	let runtime = ctx.runtime.clone();
	let list = properties.list().clone();
	spawn_unit(ctx, scope, token, move |token| async move {
		fetch_into(&runtime, &list, property_order, fetch, &token, Duration::ZERO).await
	})
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;
	use std::sync::mpsc as std_mpsc;

	use adex_worker::WorkerRuntime;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::event::{self, EventLoop};
	use crate::list::ListMirror;
	use crate::RequestOutcome;

	fn by_str(a: &String, b: &String) -> Ordering {
		a.cmp(b)
	}

	fn domain(options: SearchOptions) -> (SearchDomain<String>, EventLoop, WorkerRuntime) {
		let (events, rx) = event::channel();
		let runtime = WorkerRuntime::new();
		let ctx = WorkContext::new(runtime.clone(), events, options);
		(SearchDomain::new(Domain::Groups, Operation::SearchGroups, by_str, ctx), rx, runtime)
	}

	fn names(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| (*s).to_owned()).collect()
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn completed_search_fills_sorted_and_clears_flag() {
		let (search, mut rx, _rt) = domain(SearchOptions::default());
		let handle = search.start(Some("x".into()), || Ok(names(&["c", "a", "b"])));
		assert_eq!(handle.join().await, RequestOutcome::Completed { inserted: 3 });
		assert_eq!(search.results().snapshot(), names(&["a", "b", "c"]));

		let events = rx.pump();
		assert_eq!(events.len(), 2);
		assert!(!rx.is_searching(Domain::Groups));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn superseded_fetch_makes_no_mutations() {
		let (search, mut rx, rt) = domain(SearchOptions::default());
		search.start(None, || Ok(names(&["old"]))).join().await;
		let mut mirror = ListMirror::attach(search.results());

		let (release_tx, release_rx) = std_mpsc::channel::<()>();
		let slow = search.start(Some("a".into()), move || {
			let _ = release_rx.recv();
			Ok(names(&["a1", "a2"]))
		});
		let fast = search.start(Some("b".into()), || Ok(names(&["b2", "b1"])));
		assert_eq!(fast.join().await, RequestOutcome::Completed { inserted: 2 });
		assert_eq!(slow.join().await, RequestOutcome::Superseded);
		let _ = release_tx.send(());
		rt.settle().await;

		assert_eq!(search.results().snapshot(), names(&["b1", "b2"]));
		// Reset plus two inserts, all from the newer request.
		assert_eq!(mirror.pump(), 3);
		assert_eq!(mirror.items(), names(&["b1", "b2"]).as_slice());
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
		assert!(rx.take_faults().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn fault_is_reported_and_flag_settles() {
		let (search, mut rx, _rt) = domain(SearchOptions::default());
		let outcome = search
			.start(Some("x".into()), || Err(DirectoryError::Backend("offline".into())))
			.join()
			.await;
		assert_eq!(outcome, RequestOutcome::Failed);
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
		let faults = rx.take_faults();
		assert_eq!(faults.len(), 1);
		assert_eq!(faults[0].subject.as_deref(), Some("x"));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn panicking_fetch_becomes_a_fault() {
		let (search, mut rx, _rt) = domain(SearchOptions::default());
		let outcome = search.start(None, || panic!("mapper exploded")).join().await;
		assert_eq!(outcome, RequestOutcome::Failed);
		rx.pump();
		assert_eq!(rx.take_faults()[0].message, "mapper exploded");
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn cancel_stops_inserts_and_clears_flag() {
		let options = SearchOptions {
			insert_pause: Duration::from_millis(20),
		};
		let (search, mut rx, rt) = domain(options);
		let mut mirror = ListMirror::attach(search.results());
		let handle = search.start(None, || Ok(names(&["a", "b", "c", "d", "e", "f"])));
		// Wait for the first insert, then cancel mid-stream.
		while mirror.items().is_empty() {
			mirror.recv().await.expect("list alive");
		}
		search.cancel();
		assert_eq!(handle.join().await, RequestOutcome::Superseded);
		rt.settle().await;
		assert!(search.results().len() < 6);
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
		assert_eq!(rx.generation(Domain::Groups), search.generation());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn shutdown_supersedes_running_request() {
		let (search, mut rx, rt) = domain(SearchOptions::default());
		let (release_tx, release_rx) = std_mpsc::channel::<()>();
		let handle = search.start(None, move || {
			let _ = release_rx.recv();
			Ok(names(&["late"]))
		});
		rt.shutdown();
		assert_eq!(handle.join().await, RequestOutcome::Superseded);
		let _ = release_tx.send(());
		rt.settle().await;
		assert!(search.results().is_empty());
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
		assert!(rx.take_faults().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn failed_fetch_drops_previous_results() {
		let (search, mut rx, _rt) = domain(SearchOptions::default());
		search.start(Some("a".into()), || Ok(names(&["a1", "a2"]))).join().await;
		let outcome = search
			.start(Some("b".into()), || Err(DirectoryError::Backend("offline".into())))
			.join()
			.await;
		assert_eq!(outcome, RequestOutcome::Failed);
		assert!(search.results().is_empty());
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn superseded_failure_leaves_newer_results() {
		let (search, mut rx, rt) = domain(SearchOptions::default());
		let (release_tx, release_rx) = std_mpsc::channel::<()>();
		let failing = search.start(Some("a".into()), move || {
			let _ = release_rx.recv();
			Err(DirectoryError::Backend("offline".into()))
		});
		let fresh = search.start(Some("b".into()), || Ok(names(&["b1"])));
		assert_eq!(fresh.join().await, RequestOutcome::Completed { inserted: 1 });
		let _ = release_tx.send(());
		assert_eq!(failing.join().await, RequestOutcome::Superseded);
		rt.settle().await;
		assert_eq!(search.results().snapshot(), names(&["b1"]));
		rx.pump();
		assert!(rx.take_faults().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn request_started_after_shutdown_settles_flag() {
		let (search, mut rx, rt) = domain(SearchOptions::default());
		rt.shutdown();
		let handle = search.start(None, || Ok(names(&["never"])));
		let generation = handle.generation();
		assert_eq!(handle.join().await, RequestOutcome::Superseded);
		assert!(search.results().is_empty());
		rx.pump();
		assert!(!rx.is_searching(Domain::Groups));
		assert_eq!(rx.generation(Domain::Groups), generation);
	}
}
