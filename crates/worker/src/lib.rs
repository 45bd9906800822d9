//! Shared worker primitives for background directory work.
//!
//! * [`TaskClass`] tags every spawn for tracing.
//! * [`spawn`] / [`spawn_blocking`] run on the ambient tokio runtime, or on a
//!   lazily built shared runtime when called from a plain thread.
//! * [`GenerationClock`] / [`GenerationToken`] implement supersession: a newer
//!   request cancels the token of the previous one, and workers check
//!   [`GenerationToken::is_current`] before every shared-state mutation.
//! * [`WorkerRuntime`] tracks spawned work so owners can settle or shut down.

mod class;
mod runtime;
mod spawn;
mod token;

pub use class::TaskClass;
pub use runtime::WorkerRuntime;
pub use spawn::{spawn, spawn_blocking};
pub use token::{GenerationClock, GenerationToken};

/// Extracts the panic message from a [`tokio::task::JoinError`].
///
/// Returns `None` when the task was cancelled rather than panicked.
pub fn join_error_panic_message(err: tokio::task::JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	let payload = err.into_panic();
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		Some((*msg).to_string())
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		Some(msg.clone())
	} else {
		Some("task panicked with a non-string payload".to_string())
	}
}
