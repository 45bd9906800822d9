//! In-process directory backend.
//!
//! Stands in for a remote directory: names are matched case-insensitively,
//! listings come back in insertion order (callers must not rely on it), and an
//! optional per-call latency emulates a slow server. Used by the binary when no
//! remote backend is configured and by tests that need controllable data.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{ConnectionSettings, DirectoryError, DirectoryRepository, Group, Property, RepositoryFactory, Result, User, matches_prefix};

#[derive(Debug, Clone)]
struct GroupRecord {
	name: String,
	members: IndexSet<String>,
}

#[derive(Debug, Clone)]
struct UserRecord {
	name: String,
	full_name: String,
}

#[derive(Debug, Default)]
struct DirectoryState {
	groups: IndexMap<String, GroupRecord>,
	users: IndexMap<String, UserRecord>,
}

/// Thread-safe in-memory directory.
#[derive(Debug)]
pub struct MemoryDirectory {
	server: String,
	base_dn: String,
	latency: Duration,
	offline: AtomicBool,
	state: RwLock<DirectoryState>,
}

fn key(name: &str) -> String {
	name.trim().to_ascii_lowercase()
}

impl MemoryDirectory {
	/// Creates an empty directory for `domain` (e.g. `corp.example`).
	pub fn new(domain: &str) -> Self {
		let base_dn = domain.split('.').filter(|p| !p.is_empty()).map(|p| format!("DC={p}")).collect::<Vec<_>>().join(",");
		Self {
			server: domain.to_owned(),
			base_dn,
			latency: Duration::ZERO,
			offline: AtomicBool::new(false),
			state: RwLock::new(DirectoryState::default()),
		}
	}

	/// Populates a directory with seeded random groups, users, and memberships.
	pub fn synthetic(domain: &str, groups: usize, users: usize, seed: u64) -> Self {
		let dir = Self::new(domain);
		let mut rng = StdRng::seed_from_u64(seed);
		for _ in 0..groups {
			let name = format!("Group {}", random_word(&mut rng));
			dir.insert_group(&name);
		}
		for _ in 0..users {
			let account = random_word(&mut rng).to_ascii_lowercase();
			let full_name = format!("{} {}", capitalized(&random_word(&mut rng)), capitalized(&random_word(&mut rng)));
			dir.insert_user(&account, &full_name);
		}

		let mut state = dir.state.write();
		let group_count = state.groups.len();
		if group_count > 0 {
			let user_keys: Vec<String> = state.users.keys().cloned().collect();
			for user in user_keys {
				for _ in 0..rng.random_range(0..=3usize) {
					let idx = rng.random_range(0..group_count);
					if let Some((_, group)) = state.groups.get_index_mut(idx) {
						group.members.insert(user.clone());
					}
				}
			}
		}
		tracing::debug!(domain, groups = state.groups.len(), users = state.users.len(), "directory.synthetic");
		drop(state);
		dir
	}

	/// Sleeps for `latency` before every read or write call.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	pub fn with_group(self, name: &str) -> Self {
		self.insert_group(name);
		self
	}

	pub fn with_user(self, name: &str, full_name: &str) -> Self {
		self.insert_user(name, full_name);
		self
	}

	/// Adds a membership; unknown names are logged and skipped.
	pub fn with_member(self, group: &str, user: &str) -> Self {
		if let Err(err) = self.link(group, user, true) {
			tracing::warn!(group, user, error = %err, "directory.with_member.skipped");
		}
		self
	}

	/// Inserts a group; existing names are left untouched.
	pub fn insert_group(&self, name: &str) {
		self.state.write().groups.entry(key(name)).or_insert_with(|| GroupRecord {
			name: name.trim().to_owned(),
			members: IndexSet::new(),
		});
	}

	/// Inserts a user; existing names are left untouched.
	pub fn insert_user(&self, name: &str, full_name: &str) {
		self.state.write().users.entry(key(name)).or_insert_with(|| UserRecord {
			name: name.trim().to_owned(),
			full_name: full_name.to_owned(),
		});
	}

	/// Makes every subsequent call fail with a backend error.
	pub fn set_offline(&self, offline: bool) {
		self.offline.store(offline, Ordering::Release);
	}

	fn group_dn(&self, name: &str) -> String {
		format!("CN={name},OU=Groups,{}", self.base_dn)
	}

	fn user_dn(&self, name: &str) -> String {
		format!("CN={name},OU=Users,{}", self.base_dn)
	}

	fn begin_call(&self, op: &str) -> Result<()> {
		if !self.latency.is_zero() {
			std::thread::sleep(self.latency);
		}
		if self.offline.load(Ordering::Acquire) {
			return Err(DirectoryError::Backend(format!("{} unavailable during {op}", self.server)));
		}
		Ok(())
	}

	fn to_group(&self, record: &GroupRecord) -> Group {
		Group {
			name: record.name.clone(),
			distinguished_name: self.group_dn(&record.name),
		}
	}

	fn to_user(&self, state: &DirectoryState, user_key: &str, record: &UserRecord, include_groups: bool) -> User {
		let groups = include_groups.then(|| {
			state
				.groups
				.values()
				.filter(|g| g.members.contains(user_key))
				.map(|g| self.group_dn(&g.name))
				.collect()
		});
		User {
			name: record.name.clone(),
			full_name: record.full_name.clone(),
			distinguished_name: self.user_dn(&record.name),
			groups,
		}
	}

	fn link(&self, group: &str, user: &str, add: bool) -> Result<()> {
		let mut state = self.state.write();
		let user_key = key(user);
		if !state.users.contains_key(&user_key) {
			return Err(DirectoryError::UserNotFound { name: user.to_owned() });
		}
		let Some(record) = state.groups.get_mut(&key(group)) else {
			return Err(DirectoryError::GroupNotFound { name: group.to_owned() });
		};
		if add {
			record.members.insert(user_key);
		} else {
			record.members.shift_remove(&user_key);
		}
		Ok(())
	}
}

impl DirectoryRepository for MemoryDirectory {
	fn test_path(&self) -> Result<()> {
		self.begin_call("test_path").map_err(|err| DirectoryError::Connection {
			domain: self.server.clone(),
			reason: err.to_string(),
		})
	}

	fn server_name(&self) -> String {
		self.server.clone()
	}

	fn list_groups(&self, term: Option<&str>) -> Result<Vec<Group>> {
		self.begin_call("list_groups")?;
		let state = self.state.read();
		Ok(state.groups.values().filter(|g| matches_prefix(&g.name, term)).map(|g| self.to_group(g)).collect())
	}

	fn list_users(&self, term: Option<&str>, include_groups: bool) -> Result<Vec<User>> {
		self.begin_call("list_users")?;
		let state = self.state.read();
		Ok(state
			.users
			.iter()
			.filter(|(_, u)| matches_prefix(&u.name, term))
			.map(|(k, u)| self.to_user(&state, k, u, include_groups))
			.collect())
	}

	fn get_group(&self, name: &str) -> Result<Option<Group>> {
		self.begin_call("get_group")?;
		Ok(self.state.read().groups.get(&key(name)).map(|g| self.to_group(g)))
	}

	fn get_user(&self, name: &str) -> Result<Option<User>> {
		self.begin_call("get_user")?;
		let state = self.state.read();
		let user_key = key(name);
		Ok(state.users.get(&user_key).map(|u| self.to_user(&state, &user_key, u, true)))
	}

	fn list_group_members(&self, group: &str) -> Result<Vec<User>> {
		self.begin_call("list_group_members")?;
		let state = self.state.read();
		let Some(record) = state.groups.get(&key(group)) else {
			return Ok(Vec::new());
		};
		Ok(record
			.members
			.iter()
			.filter_map(|k| state.users.get(k).map(|u| self.to_user(&state, k, u, false)))
			.collect())
	}

	fn list_user_groups(&self, user: &str) -> Result<Vec<Group>> {
		self.begin_call("list_user_groups")?;
		let state = self.state.read();
		let user_key = key(user);
		Ok(state.groups.values().filter(|g| g.members.contains(&user_key)).map(|g| self.to_group(g)).collect())
	}

	fn list_group_properties(&self, group: &str) -> Result<Vec<Property>> {
		self.begin_call("list_group_properties")?;
		let state = self.state.read();
		let Some(record) = state.groups.get(&key(group)) else {
			return Ok(Vec::new());
		};
		let members = record
			.members
			.iter()
			.filter_map(|k| state.users.get(k))
			.map(|u| self.user_dn(&u.name))
			.collect::<Vec<_>>();
		Ok(vec![
			Property::new("sAMAccountName", record.name.clone()),
			Property::new("distinguishedName", self.group_dn(&record.name)),
			Property::new("objectCategory", "group"),
			Property::joined("member", members),
		])
	}

	fn list_user_properties(&self, user: &str) -> Result<Vec<Property>> {
		self.begin_call("list_user_properties")?;
		let state = self.state.read();
		let user_key = key(user);
		let Some(record) = state.users.get(&user_key) else {
			return Ok(Vec::new());
		};
		let member_of = state
			.groups
			.values()
			.filter(|g| g.members.contains(&user_key))
			.map(|g| self.group_dn(&g.name))
			.collect::<Vec<_>>();
		Ok(vec![
			Property::new("sAMAccountName", record.name.clone()),
			Property::new("displayName", record.full_name.clone()),
			Property::new("distinguishedName", self.user_dn(&record.name)),
			Property::new("objectCategory", "person"),
			Property::joined("memberOf", member_of),
		])
	}

	fn add_group_member(&self, group: &str, user: &str) -> Result<()> {
		self.begin_call("add_group_member")?;
		self.link(group, user, true)
	}

	fn remove_group_member(&self, group: &str, user: &str) -> Result<()> {
		self.begin_call("remove_group_member")?;
		self.link(group, user, false)
	}
}

/// Hands out connections to one shared [`MemoryDirectory`].
#[derive(Debug, Clone)]
pub struct MemoryDirectoryFactory {
	directory: Arc<MemoryDirectory>,
	credentials: Option<(String, String)>,
}

impl MemoryDirectoryFactory {
	pub fn new(directory: Arc<MemoryDirectory>) -> Self {
		Self { directory, credentials: None }
	}

	/// Requires exactly these credentials on connect.
	pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
		self.credentials = Some((user.to_owned(), password.to_owned()));
		self
	}
}

impl RepositoryFactory for MemoryDirectoryFactory {
	fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn DirectoryRepository>> {
		let domain = settings.domain.clone().unwrap_or_else(|| "<current>".to_owned());
		if let Some(requested) = settings.domain.as_deref()
			&& !requested.eq_ignore_ascii_case(&self.directory.server)
		{
			return Err(DirectoryError::Connection {
				domain,
				reason: "domain is not reachable".to_owned(),
			});
		}
		if let Some((user, password)) = &self.credentials
			&& (settings.user.as_deref() != Some(user.as_str()) || settings.password.as_deref() != Some(password.as_str()))
		{
			return Err(DirectoryError::Connection {
				domain,
				reason: "invalid credentials".to_owned(),
			});
		}
		tracing::debug!(server = %self.directory.server, "directory.connect");
		Ok(Arc::clone(&self.directory) as Arc<dyn DirectoryRepository>)
	}
}

fn random_word(rng: &mut StdRng) -> String {
	let len = rng.random_range(5..10);
	(0..len).map(|_| char::from(rng.random_range(b'A'..=b'Z'))).collect()
}

fn capitalized(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
		None => String::new(),
	}
}
