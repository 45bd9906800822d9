//! Background unit plumbing shared by searches, expansions, and mutations.
//!
//! A unit is one structured task per request: it announces its start, runs
//! its body on its own task (so a panic becomes a [`Failure`]), races the body
//! against generation cancellation, and settles into exactly one of
//! completion, a reported fault, or silent supersession.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use adex_directory::DirectoryError;
use adex_worker::{GenerationClock, GenerationToken, TaskClass, WorkerRuntime};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::list::SharedList;
use crate::sink::Comparator;
use crate::{Domain, ErrorChannel, EventSender, ExplorerEvent, Failure, Operation, SearchOptions};

/// One generation clock per [`Domain`], shared by every model of an explorer.
///
/// The event loop tracks searching state per domain, so generations must
/// keep rising across model instances: a reopened member search continues
/// the candidates clock instead of restarting it at zero.
#[derive(Debug, Clone)]
pub(crate) struct DomainClocks {
	groups: Arc<GenerationClock>,
	users: Arc<GenerationClock>,
	candidates: Arc<GenerationClock>,
	roster: Arc<GenerationClock>,
}

impl DomainClocks {
	fn new(runtime: &WorkerRuntime) -> Self {
		Self {
			groups: Arc::new(runtime.generation_clock()),
			users: Arc::new(runtime.generation_clock()),
			candidates: Arc::new(runtime.generation_clock()),
			roster: Arc::new(runtime.generation_clock()),
		}
	}

	pub(crate) fn get(&self, domain: Domain) -> Arc<GenerationClock> {
		let clock = match domain {
			Domain::Groups => &self.groups,
			Domain::Users => &self.users,
			Domain::Candidates => &self.candidates,
			Domain::Roster => &self.roster,
		};
		Arc::clone(clock)
	}
}

/// Everything a model hands to the units it spawns.
#[derive(Debug, Clone)]
pub(crate) struct WorkContext {
	pub(crate) runtime: WorkerRuntime,
	pub(crate) events: EventSender,
	pub(crate) errors: ErrorChannel,
	pub(crate) options: SearchOptions,
	pub(crate) clocks: DomainClocks,
}

impl WorkContext {
	pub(crate) fn new(runtime: WorkerRuntime, events: EventSender, options: SearchOptions) -> Self {
		Self {
			errors: ErrorChannel::new(events.clone()),
			clocks: DomainClocks::new(&runtime),
			runtime,
			events,
			options,
		}
	}
}

/// How one request unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
	/// Finished while still current.
	Completed { inserted: usize },
	/// Failed while current; a fault was published.
	Failed,
	/// A newer request or shutdown took over; nothing was reported.
	Superseded,
}

/// Handle to a spawned request unit.
#[derive(Debug)]
pub struct RequestHandle {
	generation: u64,
	handle: JoinHandle<RequestOutcome>,
}

impl RequestHandle {
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Waits for the unit to settle.
	pub async fn join(self) -> RequestOutcome {
		self.handle.await.unwrap_or(RequestOutcome::Failed)
	}
}

/// Attribution of a unit for logging, faults, and searching transitions.
#[derive(Debug, Clone)]
pub(crate) struct UnitScope {
	pub(crate) operation: Operation,
	pub(crate) subject: Option<String>,
	/// Domain whose searching flag this unit drives, if any.
	pub(crate) domain: Option<Domain>,
}

/// Spawns `body` as a generation-scoped unit.
pub(crate) fn spawn_unit<B, Fut>(ctx: &WorkContext, scope: UnitScope, token: GenerationToken, body: B) -> RequestHandle
where
	B: FnOnce(GenerationToken) -> Fut + Send + 'static,
	Fut: Future<Output = Result<usize, Failure>> + Send + 'static,
{
	let generation = token.generation();
	tracing::debug!(operation = %scope.operation, subject = scope.subject.as_deref(), generation, "unit.start");
	if let Some(domain) = scope.domain {
		ctx.events.send(ExplorerEvent::Searching {
			domain,
			generation,
			active: true,
		});
	}

	let span = tracing::debug_span!("unit", operation = %scope.operation, generation);
	let ctx = ctx.clone();
	let runtime = ctx.runtime.clone();
	let inner_token = token.clone();
	let unit = async move {
		let work = async move {
			tokio::select! {
				biased;
				_ = inner_token.cancelled() => Err(Failure::Cancelled),
				result = body(inner_token.clone()) => result,
			}
		};
		let result = guarded(&ctx.runtime, work).await;
		settle(&ctx, &scope, &token, result)
	};
	let handle = runtime.spawn(TaskClass::Request, unit.instrument(span));
	RequestHandle { generation, handle }
}

fn settle(ctx: &WorkContext, scope: &UnitScope, token: &GenerationToken, result: Result<usize, Failure>) -> RequestOutcome {
	let generation = token.generation();
	let outcome = match result {
		Ok(inserted) if !token.is_cancelled() => RequestOutcome::Completed { inserted },
		Err(failure) if !failure.is_cancelled() && !token.is_cancelled() => {
			ctx.errors.report(scope.operation, scope.subject.as_deref(), failure);
			RequestOutcome::Failed
		}
		Ok(_) => RequestOutcome::Superseded,
		Err(failure) => {
			if !failure.is_cancelled() {
				tracing::debug!(operation = %scope.operation, generation, ?failure, "unit.stale_fault");
			}
			RequestOutcome::Superseded
		}
	};
	tracing::debug!(operation = %scope.operation, generation, ?outcome, "unit.settle");
	// A superseded unit leaves the flag to its successor. A unit cancelled by
	// shutdown has no successor and still holds the current generation.
	if let Some(domain) = scope.domain
		&& (outcome != RequestOutcome::Superseded || token.is_current())
	{
		ctx.events.send(ExplorerEvent::Searching {
			domain,
			generation,
			active: false,
		});
	}
	outcome
}

/// Runs `body` on its own task so a panic inside it becomes a [`Failure`].
pub(crate) async fn guarded<T, F>(runtime: &WorkerRuntime, body: F) -> Result<T, Failure>
where
	T: Send + 'static,
	F: Future<Output = Result<T, Failure>> + Send + 'static,
{
	runtime.spawn(TaskClass::Request, body).await.map_err(Failure::from)?
}

/// Runs a blocking directory call on the blocking pool.
pub(crate) async fn blocking<T, F>(runtime: &WorkerRuntime, call: F) -> Result<T, Failure>
where
	T: Send + 'static,
	F: FnOnce() -> Result<T, DirectoryError> + Send + 'static,
{
	runtime
		.spawn_blocking(TaskClass::DirectoryCall, call)
		.await
		.map_err(Failure::from)?
		.map_err(Failure::from)
}

/// Fetches on the blocking pool, then replaces `list` with the result.
///
/// Nothing is touched while the fetch runs. A failed fetch empties the list
/// if `token` is still current, so a pane never keeps results of a term
/// other than the one it last searched.
pub(crate) async fn fetch_into<T, F>(
	runtime: &WorkerRuntime,
	list: &SharedList<T>,
	cmp: Comparator<T>,
	fetch: F,
	token: &GenerationToken,
	pause: Duration,
) -> Result<usize, Failure>
where
	T: Clone + Send + 'static,
	F: FnOnce() -> Result<Vec<T>, DirectoryError> + Send + 'static,
{
	match blocking(runtime, fetch).await {
		Ok(items) => replace_contents(list, cmp, items, token, pause).await,
		Err(failure) => {
			list.clear_if(|| !token.is_cancelled());
			Err(failure)
		}
	}
}

/// Clears `list` and sort-inserts `items`, stopping once `token` goes stale.
///
/// Every mutation re-checks the token under the list lock, so a superseded
/// request never mutates after the check fails.
pub(crate) async fn replace_contents<T: Clone>(
	list: &SharedList<T>,
	cmp: Comparator<T>,
	items: Vec<T>,
	token: &GenerationToken,
	pause: Duration,
) -> Result<usize, Failure> {
	if !list.clear_if(|| !token.is_cancelled()) {
		return Err(Failure::Cancelled);
	}
	insert_all(list, cmp, items, token, pause).await
}

/// Sort-inserts `items` one at a time while `token` stays current.
pub(crate) async fn insert_all<T: Clone>(
	list: &SharedList<T>,
	cmp: Comparator<T>,
	items: Vec<T>,
	token: &GenerationToken,
	pause: Duration,
) -> Result<usize, Failure> {
	let mut inserted = 0;
	for item in items {
		if list.insert_sorted_if(item, cmp, || !token.is_cancelled()).is_none() {
			return Err(Failure::Cancelled);
		}
		inserted += 1;
		if !pause.is_zero() {
			tokio::time::sleep(pause).await;
		}
	}
	Ok(inserted)
}
