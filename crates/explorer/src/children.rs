//! Lazy expansion of tree-node children.
//!
//! A node's children start [`LoadState::Unloaded`] and are fetched on first
//! expansion. The state is an explicit tag rather than a placeholder child:
//!
//! ```text
//! Unloaded ──claim()──► Loading ──finish()──► Loaded
//!     ▲                    │
//!     └─────release()──────┘   (fetch failed or runtime shut down)
//! ```
//!
//! Only the caller that wins [`Children::claim`] fetches, so repeated or
//! concurrent expansions never duplicate children. A loaded node with zero
//! children is `Loaded` with an empty list.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::list::SharedList;
use crate::sink::Comparator;
use crate::unit::{WorkContext, blocking, guarded, insert_all};
use crate::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
	Unloaded,
	Loading,
	Loaded,
}

/// Lazily loaded child collection of one tree node.
pub struct Children<T> {
	state: Arc<Mutex<LoadState>>,
	list: SharedList<T>,
}

impl<T> std::fmt::Debug for Children<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Children")
			.field("state", &*self.state.lock())
			.field("list", &self.list)
			.finish()
	}
}

impl<T> Clone for Children<T> {
	fn clone(&self) -> Self {
		Self {
			state: Arc::clone(&self.state),
			list: self.list.clone(),
		}
	}
}

impl<T: Clone> Children<T> {
	pub fn unloaded() -> Self {
		Self::with_state(LoadState::Unloaded)
	}

	pub fn loaded_empty() -> Self {
		Self::with_state(LoadState::Loaded)
	}

	fn with_state(state: LoadState) -> Self {
		Self {
			state: Arc::new(Mutex::new(state)),
			list: SharedList::new(),
		}
	}

	pub fn state(&self) -> LoadState {
		*self.state.lock()
	}

	pub fn is_loaded(&self) -> bool {
		self.state() == LoadState::Loaded
	}

	pub fn list(&self) -> &SharedList<T> {
		&self.list
	}

	/// Moves `Unloaded` to `Loading`; returns false if another caller owns the load.
	pub(crate) fn claim(&self) -> bool {
		let mut state = self.state.lock();
		if *state != LoadState::Unloaded {
			return false;
		}
		*state = LoadState::Loading;
		true
	}

	pub(crate) fn finish(&self) {
		*self.state.lock() = LoadState::Loaded;
	}

	/// Drops partially inserted children and returns to `Unloaded`.
	pub(crate) fn release(&self) {
		let mut state = self.state.lock();
		self.list.clear();
		*state = LoadState::Unloaded;
	}
}

/// Fetches and inserts children unless they are loaded or already loading.
///
/// Returns `None` when there was nothing to do.
pub(crate) fn spawn_expand<T, F>(
	ctx: &WorkContext,
	operation: Operation,
	subject: String,
	children: &Children<T>,
	cmp: Comparator<T>,
	fetch: F,
) -> Option<JoinHandle<bool>>
where
	T: Clone + Send + Sync + 'static,
	F: FnOnce() -> adex_directory::Result<Vec<T>> + Send + 'static,
{
	if !children.claim() {
		tracing::trace!(%operation, %subject, state = ?children.state(), "expand.skip");
		return None;
	}
	tracing::debug!(%operation, %subject, "expand.claim");

	let ctx = ctx.clone();
	let children = children.clone();
	let runtime = ctx.runtime.clone();
	Some(runtime.spawn(adex_worker::TaskClass::Expansion, async move {
		let body = {
			let runtime = ctx.runtime.clone();
			let children = children.clone();
			let shutdown = ctx.runtime.generation_clock();
			let pause = ctx.options.insert_pause;
			async move {
				let items = blocking(&runtime, fetch).await?;
				// Expansions have no competing generation; the token only
				// observes runtime shutdown.
				let token = shutdown.advance();
				children.list().clear();
				insert_all(children.list(), cmp, items, &token, pause).await
			}
		};
		match guarded(&ctx.runtime, body).await {
			Ok(loaded) => {
				children.finish();
				tracing::debug!(%operation, %subject, loaded, "expand.done");
				true
			}
			Err(failure) => {
				children.release();
				ctx.errors.report(operation, Some(subject.as_str()), failure);
				false
			}
		}
	}))
}
