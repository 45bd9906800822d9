//! Member / non-member roster of one group.
//!
//! Members and the full user listing are fetched concurrently under one
//! generation. The two fetches are independent directory reads, so the
//! roster may reflect a change that landed between them.

use std::collections::HashSet;
use std::sync::Arc;

use adex_directory::DirectoryRepository;
use adex_worker::{GenerationClock, GenerationToken};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::list::SharedList;
use crate::member_search::{MembershipChange, spawn_membership};
use crate::unit::{RequestHandle, UnitScope, WorkContext, blocking, insert_all, spawn_unit};
use crate::{Domain, ExplorerError, ExplorerEvent, Failure, Operation, Result, UserItem, UserNode, user_order};

pub struct GroupRoster {
	repository: Arc<dyn DirectoryRepository>,
	group: Option<String>,
	clock: Arc<GenerationClock>,
	active: Option<GenerationToken>,
	members: SharedList<UserItem>,
	non_members: SharedList<UserItem>,
	mutation: Arc<Mutex<()>>,
	ctx: WorkContext,
}

impl std::fmt::Debug for GroupRoster {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GroupRoster")
			.field("group", &self.group)
			.field("generation", &self.clock.current())
			.field("members", &self.members)
			.field("non_members", &self.non_members)
			.finish_non_exhaustive()
	}
}

impl GroupRoster {
	pub(crate) fn new(repository: Arc<dyn DirectoryRepository>, ctx: WorkContext) -> Self {
		Self {
			repository,
			group: None,
			clock: ctx.clocks.get(Domain::Roster),
			active: None,
			members: SharedList::new(),
			non_members: SharedList::new(),
			mutation: Arc::new(Mutex::new(())),
			ctx,
		}
	}

	pub fn group(&self) -> Option<&str> {
		self.group.as_deref()
	}

	pub fn members(&self) -> &SharedList<UserItem> {
		&self.members
	}

	pub fn non_members(&self) -> &SharedList<UserItem> {
		&self.non_members
	}

	/// Loads the roster of `group`, superseding any roster still loading.
	pub fn set_group(&mut self, group: &str) -> RequestHandle {
		let group = group.trim().to_owned();
		let token = self.clock.advance();
		self.active = Some(token.clone());
		self.group = Some(group.clone());

		let scope = UnitScope {
			operation: Operation::LoadRoster,
			subject: Some(group.clone()),
			domain: Some(Domain::Roster),
		};
		let runtime = self.ctx.runtime.clone();
		let repository = Arc::clone(&self.repository);
		let members = self.members.clone();
		let non_members = self.non_members.clone();
		let pause = self.ctx.options.insert_pause;
		spawn_unit(&self.ctx, scope, token, move |token| async move {
			let member_fetch = {
				let repository = Arc::clone(&repository);
				move || repository.list_group_members(&group)
			};
			let user_fetch = move || repository.list_users(None, false);
			let fetched = tokio::try_join!(blocking(&runtime, member_fetch), blocking(&runtime, user_fetch));
			let (member_users, all_users) = match fetched {
				Ok(lists) => lists,
				Err(failure) => {
					members.clear_if(|| !token.is_cancelled());
					non_members.clear_if(|| !token.is_cancelled());
					return Err(failure);
				}
			};

			let member_keys: HashSet<String> = member_users.iter().map(|u| u.name.to_lowercase()).collect();
			let outsiders: Vec<UserItem> = all_users
				.into_iter()
				.filter(|u| !member_keys.contains(&u.name.to_lowercase()))
				.map(UserNode::leaf)
				.collect();
			let insiders: Vec<UserItem> = member_users.into_iter().map(UserNode::leaf).collect();

			if !members.clear_if(|| !token.is_cancelled()) || !non_members.clear_if(|| !token.is_cancelled()) {
				return Err(Failure::Cancelled);
			}
			let inserted = insert_all(&members, user_order, insiders, &token, pause).await?;
			Ok(inserted + insert_all(&non_members, user_order, outsiders, &token, pause).await?)
		})
	}

	/// Adds `user` to the group and moves it from non-members to members.
	pub fn add_member(&self, user: &UserItem) -> Result<JoinHandle<bool>> {
		self.mutate(user, true)
	}

	/// Removes `user` from the group and moves it back to non-members.
	pub fn remove_member(&self, user: &UserItem) -> Result<JoinHandle<bool>> {
		self.mutate(user, false)
	}

	fn mutate(&self, user: &UserItem, member: bool) -> Result<JoinHandle<bool>> {
		let group = self.group.clone().ok_or(ExplorerError::GroupNotSet)?;
		let token = self.active.clone().ok_or(ExplorerError::GroupNotSet)?;
		let (from, to) = if member {
			(self.non_members.clone(), self.members.clone())
		} else {
			(self.members.clone(), self.non_members.clone())
		};
		let user = Arc::clone(user);
		let change = MembershipChange {
			repository: Arc::clone(&self.repository),
			serial: Arc::clone(&self.mutation),
			group,
			user: user.name.clone(),
			member,
		};
		Ok(spawn_membership(&self.ctx, change, move || {
			// A roster reloaded for another group must not receive the move.
			if !token.is_current() {
				return;
			}
			from.remove_first(|u| Arc::ptr_eq(u, &user));
			to.insert_sorted_if(user, user_order, || token.is_current());
		}))
	}

	/// Supersedes a roster still loading. Later membership moves are not
	/// applied until the next [`Self::set_group`].
	pub fn cancel(&self) {
		let generation = self.clock.invalidate();
		self.ctx.events.send(ExplorerEvent::Searching {
			domain: Domain::Roster,
			generation,
			active: false,
		});
	}
}
