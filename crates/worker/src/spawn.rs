use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

static SHARED_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Handle of the runtime work should land on.
///
/// Inside a tokio context this is the ambient runtime. A plain thread (a
/// synchronous presentation loop, a test without `#[tokio::test]`) gets a
/// small shared runtime built on first use.
fn target() -> Handle {
	match Handle::try_current() {
		Ok(handle) => handle,
		Err(_) => SHARED_RUNTIME
			.get_or_init(|| {
				Builder::new_multi_thread()
					.enable_all()
					.worker_threads(2)
					.thread_name("adex-worker")
					.build()
					.expect("adex-worker: shared tokio runtime must build")
			})
			.handle()
			.clone(),
	}
}

/// Spawns `fut` as a task of the given class.
///
/// The task runs inside the caller's current span, so events emitted by a
/// search body carry the domain and generation fields of the request that
/// started it.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(class = class.as_str(), "worker.spawn");
	target().spawn(fut.in_current_span())
}

/// Runs a blocking directory call on the blocking pool, inside the caller's span.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(class = class.as_str(), "worker.spawn_blocking");
	let span = tracing::Span::current();
	target().spawn_blocking(move || span.in_scope(f))
}
