//! Shared fixtures for explorer integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use adex_directory::{
	ConnectionSettings, DirectoryRepository, Group, MemoryDirectory, Property, RepositoryFactory, Result as DirectoryResult, User,
};
use adex_explorer::{EventLoop, Explorer, SearchOptions, channel};
use parking_lot::{Condvar, Mutex};

pub const DOMAIN: &str = "corp.example";

/// Small directory with overlapping name prefixes and a few memberships.
pub fn sample_directory() -> MemoryDirectory {
	MemoryDirectory::new(DOMAIN)
		.with_group("Bravo")
		.with_group("Alpha")
		.with_group("Charlie")
		.with_group("Admins")
		.with_group("Billing")
		.with_user("alee", "Ann Lee")
		.with_user("bray", "Bob Ray")
		.with_user("aadams", "Amy Adams")
		.with_user("cmoss", "Cal Moss")
		.with_member("Admins", "alee")
		.with_member("Admins", "bray")
		.with_member("Billing", "alee")
}

#[derive(Default)]
struct GateState {
	held: HashSet<String>,
	entered: Vec<String>,
}

/// Directory wrapper whose list calls block while the test holds their key.
///
/// Keys are `groups:<term>`, `users:<term>`, `members:<group>`, and
/// `user_groups:<user>`; a blank term is the empty string.
pub struct GatedDirectory {
	inner: Arc<MemoryDirectory>,
	state: Mutex<GateState>,
	cond: Condvar,
}

impl GatedDirectory {
	pub fn new(inner: MemoryDirectory) -> Arc<Self> {
		Arc::new(Self {
			inner: Arc::new(inner),
			state: Mutex::new(GateState::default()),
			cond: Condvar::new(),
		})
	}

	pub fn inner(&self) -> &MemoryDirectory {
		&self.inner
	}

	pub fn hold(&self, key: &str) {
		self.state.lock().held.insert(key.to_owned());
	}

	pub fn release(&self, key: &str) {
		self.state.lock().held.remove(key);
		self.cond.notify_all();
	}

	pub fn entered(&self) -> Vec<String> {
		self.state.lock().entered.clone()
	}

	/// Polls until a call with `key` has entered the directory.
	pub async fn wait_entered(&self, key: &str) {
		tokio::time::timeout(Duration::from_secs(5), async {
			while !self.state.lock().entered.iter().any(|k| k == key) {
				tokio::time::sleep(Duration::from_millis(2)).await;
			}
		})
		.await
		.unwrap_or_else(|_| panic!("no call entered with key {key}"));
	}

	fn gate(&self, key: String) {
		let mut state = self.state.lock();
		state.entered.push(key.clone());
		while state.held.contains(&key) {
			self.cond.wait(&mut state);
		}
	}
}

fn term_key(prefix: &str, term: Option<&str>) -> String {
	format!("{prefix}:{}", term.unwrap_or_default())
}

impl DirectoryRepository for GatedDirectory {
	fn test_path(&self) -> DirectoryResult<()> {
		self.inner.test_path()
	}

	fn server_name(&self) -> String {
		self.inner.server_name()
	}

	fn list_groups(&self, term: Option<&str>) -> DirectoryResult<Vec<Group>> {
		self.gate(term_key("groups", term));
		self.inner.list_groups(term)
	}

	fn list_users(&self, term: Option<&str>, include_groups: bool) -> DirectoryResult<Vec<User>> {
		self.gate(term_key("users", term));
		self.inner.list_users(term, include_groups)
	}

	fn get_group(&self, name: &str) -> DirectoryResult<Option<Group>> {
		self.inner.get_group(name)
	}

	fn get_user(&self, name: &str) -> DirectoryResult<Option<User>> {
		self.inner.get_user(name)
	}

	fn list_group_members(&self, group: &str) -> DirectoryResult<Vec<User>> {
		self.gate(format!("members:{group}"));
		self.inner.list_group_members(group)
	}

	fn list_user_groups(&self, user: &str) -> DirectoryResult<Vec<Group>> {
		self.gate(format!("user_groups:{user}"));
		self.inner.list_user_groups(user)
	}

	fn list_group_properties(&self, group: &str) -> DirectoryResult<Vec<Property>> {
		self.inner.list_group_properties(group)
	}

	fn list_user_properties(&self, user: &str) -> DirectoryResult<Vec<Property>> {
		self.inner.list_user_properties(user)
	}

	fn add_group_member(&self, group: &str, user: &str) -> DirectoryResult<()> {
		self.inner.add_group_member(group, user)
	}

	fn remove_group_member(&self, group: &str, user: &str) -> DirectoryResult<()> {
		self.inner.remove_group_member(group, user)
	}
}

/// Hands out the same gated directory on every connect.
pub struct GatedFactory(pub Arc<GatedDirectory>);

impl RepositoryFactory for GatedFactory {
	fn connect(&self, _settings: &ConnectionSettings) -> DirectoryResult<Arc<dyn DirectoryRepository>> {
		Ok(Arc::clone(&self.0) as Arc<dyn DirectoryRepository>)
	}
}

/// Connected explorer over `directory` plus its presentation loop.
pub fn connected(directory: &Arc<GatedDirectory>, options: SearchOptions) -> (Explorer, EventLoop) {
	let (events, rx) = channel();
	let mut explorer = Explorer::new(Arc::new(GatedFactory(Arc::clone(directory))), events, options);
	explorer
		.open_connection(&ConnectionSettings::default())
		.expect("gated directory always connects");
	(explorer, rx)
}

pub fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
	items.iter().map(|item| name(item).to_owned()).collect()
}
