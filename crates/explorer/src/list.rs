//! Thread-safe observable result list.
//!
//! [`SharedList`] wraps a [`SortedSink`] behind one lock per instance. Workers
//! mutate it from background tasks; the presentation loop observes it either by
//! snapshot or by replaying [`ListChange`]s through a [`ListMirror`].
//!
//! # Invariants
//!
//! * Every structural change and its notification enqueue happen under the
//!   list lock, so observers replay changes in mutation order.
//! * Guarded mutations evaluate their guard under the same lock as the change;
//!   a guard that fails leaves the list untouched.
//! * Notifications are only enqueued under the lock. Observers handle them on
//!   their own loop after the lock is released.
//! * Lists never share a lock; mutations on different lists never contend.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::sink::{Comparator, SortedSink};

/// One structural change to a [`SharedList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange<T> {
	/// All items were removed.
	Reset,
	Inserted { index: usize, item: T },
	Removed { index: usize, item: T },
}

struct ListState<T> {
	sink: SortedSink<T>,
	revision: u64,
	observers: Vec<mpsc::UnboundedSender<ListChange<T>>>,
}

impl<T: Clone> ListState<T> {
	fn publish(&mut self, change: ListChange<T>) {
		self.revision = self.revision.wrapping_add(1);
		self.observers.retain(|tx| !tx.is_closed());
		for tx in &self.observers {
			let _ = tx.send(change.clone());
		}
	}
}

/// Sorted list shared between background workers and the presentation loop.
pub struct SharedList<T> {
	inner: Arc<Mutex<ListState<T>>>,
}

impl<T> Clone for SharedList<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Clone> Default for SharedList<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for SharedList<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.lock();
		f.debug_struct("SharedList")
			.field("len", &state.sink.len())
			.field("revision", &state.revision)
			.field("observers", &state.observers.len())
			.finish()
	}
}

impl<T: Clone> SharedList<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(ListState {
				sink: SortedSink::new(),
				revision: 0,
				observers: Vec::new(),
			})),
		}
	}

	/// Returns the current items and a receiver for every later change.
	///
	/// Both are taken under the lock, so the snapshot plus replayed changes
	/// always reproduce the list.
	pub fn subscribe(&self) -> (Vec<T>, mpsc::UnboundedReceiver<ListChange<T>>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let mut state = self.inner.lock();
		state.observers.push(tx);
		(state.sink.items().to_vec(), rx)
	}

	pub fn snapshot(&self) -> Vec<T> {
		self.inner.lock().sink.items().to_vec()
	}

	/// Runs `f` over the items while holding the lock.
	pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
		f(self.inner.lock().sink.items())
	}

	pub fn len(&self) -> usize {
		self.inner.lock().sink.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.lock().sink.is_empty()
	}

	/// Number of structural changes applied so far.
	pub fn revision(&self) -> u64 {
		self.inner.lock().revision
	}

	pub fn clear(&self) {
		self.clear_if(|| true);
	}

	/// Clears the list if `guard` holds under the lock; returns whether it did.
	pub fn clear_if(&self, guard: impl FnOnce() -> bool) -> bool {
		let mut state = self.inner.lock();
		if !guard() {
			return false;
		}
		state.sink.clear();
		state.publish(ListChange::Reset);
		true
	}

	/// Inserts at the upper bound under `cmp` and returns the index used.
	pub fn insert_sorted(&self, item: T, cmp: Comparator<T>) -> usize {
		self.insert_sorted_if(item, cmp, || true).unwrap_or_default()
	}

	/// Inserts if `guard` holds under the lock; `None` means nothing changed.
	pub fn insert_sorted_if(&self, item: T, cmp: Comparator<T>, guard: impl FnOnce() -> bool) -> Option<usize> {
		let mut state = self.inner.lock();
		if !guard() {
			return None;
		}
		let index = state.sink.insert_sorted(item.clone(), cmp);
		state.publish(ListChange::Inserted { index, item });
		Some(index)
	}

	pub fn remove_at(&self, index: usize) -> Option<T> {
		let mut state = self.inner.lock();
		let item = state.sink.remove(index)?;
		state.publish(ListChange::Removed { index, item: item.clone() });
		Some(item)
	}

	/// Removes the first item matching `pred`.
	pub fn remove_first(&self, pred: impl FnMut(&T) -> bool) -> Option<T> {
		let mut state = self.inner.lock();
		let index = state.sink.position(pred)?;
		let item = state.sink.remove(index)?;
		state.publish(ListChange::Removed { index, item: item.clone() });
		Some(item)
	}
}

/// Presentation-side replica of a [`SharedList`] fed by its change stream.
#[derive(Debug)]
pub struct ListMirror<T> {
	items: Vec<T>,
	rx: mpsc::UnboundedReceiver<ListChange<T>>,
}

impl<T: Clone> ListMirror<T> {
	pub fn attach(list: &SharedList<T>) -> Self {
		let (items, rx) = list.subscribe();
		Self { items, rx }
	}

	pub fn items(&self) -> &[T] {
		&self.items
	}

	pub fn apply(&mut self, change: &ListChange<T>) {
		match change {
			ListChange::Reset => self.items.clear(),
			ListChange::Inserted { index, item } => {
				let index = (*index).min(self.items.len());
				self.items.insert(index, item.clone());
			}
			ListChange::Removed { index, .. } => {
				if *index < self.items.len() {
					self.items.remove(*index);
				}
			}
		}
	}

	/// Applies every queued change without waiting; returns how many.
	pub fn pump(&mut self) -> usize {
		let mut applied = 0;
		while let Ok(change) = self.rx.try_recv() {
			self.apply(&change);
			applied += 1;
		}
		applied
	}

	/// Waits for, applies, and returns the next change.
	///
	/// Returns `None` once the list was dropped and every change was applied.
	pub async fn recv(&mut self) -> Option<ListChange<T>> {
		let change = self.rx.recv().await?;
		self.apply(&change);
		Some(change)
	}
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;

	use pretty_assertions::assert_eq;

	use super::*;

	fn by_str(a: &&'static str, b: &&'static str) -> Ordering {
		a.cmp(b)
	}

	#[test]
	fn mirror_replays_mutations_in_order() {
		let list = SharedList::new();
		list.insert_sorted("m", by_str);
		let mut mirror = ListMirror::attach(&list);
		assert_eq!(mirror.items(), &["m"]);

		list.insert_sorted("z", by_str);
		list.insert_sorted("a", by_str);
		list.remove_first(|s| *s == "m");
		assert_eq!(mirror.pump(), 3);
		assert_eq!(mirror.items(), &["a", "z"]);

		list.clear();
		mirror.pump();
		assert!(mirror.items().is_empty());
		assert_eq!(list.revision(), 5);
	}

	#[test]
	fn failed_guard_leaves_list_untouched() {
		let list = SharedList::new();
		list.insert_sorted("keep", by_str);
		let mut mirror = ListMirror::attach(&list);

		assert!(!list.clear_if(|| false));
		assert_eq!(list.insert_sorted_if("drop", by_str, || false), None);
		assert_eq!(list.snapshot(), vec!["keep"]);
		assert_eq!(mirror.pump(), 0);
	}

	#[test]
	fn dropped_observers_are_pruned() {
		let list = SharedList::new();
		let mirror = ListMirror::attach(&list);
		drop(mirror);
		list.insert_sorted("x", by_str);
		assert_eq!(format!("{list:?}"), "SharedList { len: 1, revision: 1, observers: 0 }");
	}

	#[test]
	fn remove_at_out_of_range_is_silent() {
		let list: SharedList<&'static str> = SharedList::new();
		assert_eq!(list.remove_at(0), None);
		assert_eq!(list.revision(), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn concurrent_inserts_stay_sorted() {
		fn by_num(a: &u32, b: &u32) -> Ordering {
			a.cmp(b)
		}
		let list = SharedList::new();
		let mut mirror = ListMirror::attach(&list);
		let mut handles = Vec::new();
		for t in 0..4u32 {
			let list = list.clone();
			handles.push(tokio::task::spawn_blocking(move || {
				for i in 0..50u32 {
					list.insert_sorted((i * 7 + t * 13) % 97, by_num);
				}
			}));
		}
		for handle in handles {
			handle.await.expect("inserter must not panic");
		}
		let mut seen = 0;
		while seen < 200 {
			mirror.recv().await.expect("list is alive");
			seen += 1;
			assert!(mirror.items().windows(2).all(|w| w[0] <= w[1]));
		}
		assert_eq!(mirror.items(), list.snapshot().as_slice());
	}
}
