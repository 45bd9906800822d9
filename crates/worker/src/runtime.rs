use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{GenerationClock, TaskClass, spawn, spawn_blocking};

/// Shared entrypoint for background work owned by one scope.
///
/// Every task spawned through the runtime is tracked so the owner can wait for
/// background work to settle, and every generation clock created from it is
/// parented to one shutdown token.
#[derive(Debug, Clone)]
pub struct WorkerRuntime {
	tracker: TaskTracker,
	shutdown: CancellationToken,
}

impl Default for WorkerRuntime {
	fn default() -> Self {
		Self::new()
	}
}

impl WorkerRuntime {
	/// Creates a runtime with no tracked work.
	pub fn new() -> Self {
		Self {
			tracker: TaskTracker::new(),
			shutdown: CancellationToken::new(),
		}
	}

	/// Spawns a tracked async task.
	pub fn spawn<F>(&self, class: TaskClass, fut: F) -> tokio::task::JoinHandle<F::Output>
	where
		F: Future + Send + 'static,
		F::Output: Send + 'static,
	{
		spawn(class, self.tracker.track_future(fut))
	}

	/// Spawns tracked blocking work.
	pub fn spawn_blocking<F, R>(&self, class: TaskClass, f: F) -> tokio::task::JoinHandle<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let token = self.tracker.token();
		spawn_blocking(class, move || {
			let _token = token;
			f()
		})
	}

	/// Creates a generation clock cancelled by [`Self::shutdown`].
	pub fn generation_clock(&self) -> GenerationClock {
		GenerationClock::with_parent(self.shutdown.child_token())
	}

	/// Number of tracked tasks still running.
	pub fn pending(&self) -> usize {
		self.tracker.len()
	}

	/// Cancels every generation clock created from this runtime.
	pub fn shutdown(&self) {
		tracing::debug!(pending = self.tracker.len(), "worker.runtime.shutdown");
		self.shutdown.cancel();
	}

	/// Returns true once [`Self::shutdown`] was called.
	pub fn is_shut_down(&self) -> bool {
		self.shutdown.is_cancelled()
	}

	/// Waits until all tracked work, including work spawned while waiting, finished.
	pub async fn settle(&self) {
		while !self.tracker.is_empty() {
			self.tracker.close();
			self.tracker.wait().await;
			self.tracker.reopen();
		}
	}
}
