use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for one logical stream of superseding requests.
///
/// Each [`advance`](Self::advance) mints a token for the new generation and
/// cancels the token handed out by the previous call. Tokens stay cheap to
/// check from worker threads: staleness is a single atomic load.
#[derive(Debug)]
pub struct GenerationClock {
	current: Arc<AtomicU64>,
	active: Mutex<Option<CancellationToken>>,
	parent: CancellationToken,
}

impl Default for GenerationClock {
	fn default() -> Self {
		Self::new()
	}
}

impl GenerationClock {
	/// Creates a clock at generation 0 with its own root cancellation.
	pub fn new() -> Self {
		Self::with_parent(CancellationToken::new())
	}

	/// Creates a clock whose tokens are children of `parent`.
	///
	/// Cancelling `parent` cancels every token this clock has minted.
	pub fn with_parent(parent: CancellationToken) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			active: Mutex::new(None),
			parent,
		}
	}

	/// Returns the most recently minted generation.
	pub fn current(&self) -> u64 {
		self.current.load(Ordering::Acquire)
	}

	/// Supersedes the active generation and mints a token for the next one.
	pub fn advance(&self) -> GenerationToken {
		let mut active = self.active.lock();
		if let Some(previous) = active.take() {
			previous.cancel();
		}
		let generation = self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		let cancel = self.parent.child_token();
		*active = Some(cancel.clone());
		GenerationToken {
			generation,
			current: Arc::clone(&self.current),
			cancel,
		}
	}

	/// Supersedes the active generation without starting a new request.
	///
	/// Returns the generation that is now current; no token holds it.
	pub fn invalidate(&self) -> u64 {
		let mut active = self.active.lock();
		if let Some(previous) = active.take() {
			previous.cancel();
		}
		self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Generation-scoped cancellation token held by one request.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	current: Arc<AtomicU64>,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Returns the generation this token was minted for.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true while no newer generation has been minted or invalidated.
	pub fn is_current(&self) -> bool {
		self.current.load(Ordering::Acquire) == self.generation
	}

	/// Returns true when the request was superseded or explicitly cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled() || !self.is_current()
	}

	/// Resolves when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Requests cancellation of this generation only.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}
