use std::cmp::Ordering;

/// Ordering used to keep a result list sorted.
pub type Comparator<T> = fn(&T, &T) -> Ordering;

/// Ordered sequence of display items.
///
/// Insertion uses upper-bound placement: an item lands after every existing
/// item that compares less than or equal to it, so items with equal keys keep
/// the order in which they were fetched.
#[derive(Debug, Clone)]
pub struct SortedSink<T> {
	items: Vec<T>,
}

impl<T> Default for SortedSink<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> SortedSink<T> {
	pub const fn new() -> Self {
		Self { items: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn items(&self) -> &[T] {
		&self.items
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	/// Smallest index `i` such that every item before `i` is `<= item`.
	pub fn upper_bound(&self, item: &T, cmp: Comparator<T>) -> usize {
		self.items.partition_point(|probe| cmp(probe, item) != Ordering::Greater)
	}

	/// Inserts `item` at its upper bound and returns the index used.
	pub fn insert_sorted(&mut self, item: T, cmp: Comparator<T>) -> usize {
		let index = self.upper_bound(&item, cmp);
		self.items.insert(index, item);
		index
	}

	pub fn remove(&mut self, index: usize) -> Option<T> {
		(index < self.items.len()).then(|| self.items.remove(index))
	}

	pub fn position(&self, pred: impl FnMut(&T) -> bool) -> Option<usize> {
		self.items.iter().position(pred)
	}
}
