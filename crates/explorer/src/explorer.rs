//! Directory browser model: connection, group and user panes, lazy tree
//! expansion, and property panels.

use std::sync::Arc;

use adex_directory::{ConnectionSettings, DirectoryRepository, RepositoryFactory, normalize_term};
use adex_worker::WorkerRuntime;
use tokio::task::JoinHandle;

use crate::children::spawn_expand;
use crate::search::refresh_properties;
use crate::unit::{RequestHandle, WorkContext};
use crate::{
	Domain, EventSender, ExplorerError, ExplorerEvent, GroupItem, GroupNode, GroupRoster, MemberSearch, Operation, PropertyItem,
	Result, SearchDomain, SearchOptions, UserItem, UserNode, group_order, user_order,
};

/// Browser over one directory connection.
///
/// Methods are called from the presentation loop. Every fetch runs as a
/// background unit; results land in the panes' [`crate::SharedList`]s and
/// transitions and faults arrive on the event channel passed to [`Self::new`].
pub struct Explorer {
	factory: Arc<dyn RepositoryFactory>,
	repository: Option<Arc<dyn DirectoryRepository>>,
	server_name: Option<String>,
	active: Option<Domain>,
	groups: SearchDomain<GroupItem>,
	users: SearchDomain<UserItem>,
	ctx: WorkContext,
}

impl std::fmt::Debug for Explorer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Explorer")
			.field("server_name", &self.server_name)
			.field("active", &self.active)
			.field("groups", &self.groups)
			.field("users", &self.users)
			.finish_non_exhaustive()
	}
}

impl Explorer {
	pub fn new(factory: Arc<dyn RepositoryFactory>, events: EventSender, options: SearchOptions) -> Self {
		let ctx = WorkContext::new(WorkerRuntime::new(), events, options);
		Self {
			factory,
			repository: None,
			server_name: None,
			active: None,
			groups: SearchDomain::new(Domain::Groups, Operation::SearchGroups, group_order, ctx.clone()),
			users: SearchDomain::new(Domain::Users, Operation::SearchUsers, user_order, ctx.clone()),
			ctx,
		}
	}

	/// Connects, probes the directory root, and replaces any previous connection.
	///
	/// Runs on the caller's thread; failures are returned, not published.
	pub fn open_connection(&mut self, settings: &ConnectionSettings) -> Result<String> {
		let domain = settings.domain.as_deref().unwrap_or("<current>");
		tracing::debug!(domain, user = settings.user.as_deref(), "explorer.connect");
		let repository = self.factory.connect(settings)?;
		repository.test_path()?;
		let server = repository.server_name();
		tracing::info!(%server, "explorer.connected");

		self.repository = Some(repository);
		self.server_name = Some(server.clone());
		self.ctx.events.send(ExplorerEvent::ConnectionOpened { server: server.clone() });
		Ok(server)
	}

	pub fn is_connected(&self) -> bool {
		self.repository.is_some()
	}

	pub fn server_name(&self) -> Option<&str> {
		self.server_name.as_deref()
	}

	/// Pane searched most recently.
	pub fn active_domain(&self) -> Option<Domain> {
		self.active
	}

	pub fn groups(&self) -> &SearchDomain<GroupItem> {
		&self.groups
	}

	pub fn users(&self) -> &SearchDomain<UserItem> {
		&self.users
	}

	pub fn runtime(&self) -> &WorkerRuntime {
		&self.ctx.runtime
	}

	fn repository(&self, operation: Operation) -> Result<Arc<dyn DirectoryRepository>> {
		self.repository.clone().ok_or(ExplorerError::NotConnected { operation })
	}

	/// Searches groups by name prefix; a blank term lists every group.
	pub fn retrieve_groups(&mut self, term: Option<&str>) -> Result<RequestHandle> {
		let repository = self.repository(Operation::SearchGroups)?;
		self.active = Some(Domain::Groups);
		let term = normalize_term(term).map(str::to_owned);
		let subject = term.clone();
		Ok(self.groups.start(subject, move || {
			let groups = repository.list_groups(term.as_deref())?;
			Ok(groups.into_iter().map(GroupNode::expandable).collect())
		}))
	}

	/// Searches users by name prefix; a blank term lists every user.
	pub fn retrieve_users(&mut self, term: Option<&str>) -> Result<RequestHandle> {
		let repository = self.repository(Operation::SearchUsers)?;
		self.active = Some(Domain::Users);
		let term = normalize_term(term).map(str::to_owned);
		let subject = term.clone();
		Ok(self.users.start(subject, move || {
			let users = repository.list_users(term.as_deref(), false)?;
			Ok(users.into_iter().map(UserNode::expandable).collect())
		}))
	}

	/// Loads a group's members on first expansion. `None` if already loaded or loading.
	pub fn expand_group(&self, group: &GroupItem) -> Result<Option<JoinHandle<bool>>> {
		let repository = self.repository(Operation::ExpandGroup)?;
		let name = group.name.clone();
		Ok(spawn_expand(&self.ctx, Operation::ExpandGroup, name.clone(), &group.members, user_order, move || {
			let members = repository.list_group_members(&name)?;
			Ok(members.into_iter().map(UserNode::leaf).collect())
		}))
	}

	/// Loads a user's groups on first expansion. `None` if already loaded or loading.
	pub fn expand_user(&self, user: &UserItem) -> Result<Option<JoinHandle<bool>>> {
		let repository = self.repository(Operation::ExpandUser)?;
		let name = user.name.clone();
		Ok(spawn_expand(&self.ctx, Operation::ExpandUser, name.clone(), &user.groups, group_order, move || {
			let groups = repository.list_user_groups(&name)?;
			Ok(groups.into_iter().map(GroupNode::leaf).collect())
		}))
	}

	pub fn retrieve_group_properties(&self, group: &GroupItem) -> Result<RequestHandle> {
		let repository = self.repository(Operation::GroupProperties)?;
		let name = group.name.clone();
		Ok(refresh_properties(&self.ctx, Operation::GroupProperties, name.clone(), &group.properties, move || {
			let properties = repository.list_group_properties(&name)?;
			Ok(properties.into_iter().map(PropertyItem::from).collect())
		}))
	}

	pub fn retrieve_user_properties(&self, user: &UserItem) -> Result<RequestHandle> {
		let repository = self.repository(Operation::UserProperties)?;
		let name = user.name.clone();
		Ok(refresh_properties(&self.ctx, Operation::UserProperties, name.clone(), &user.properties, move || {
			let properties = repository.list_user_properties(&name)?;
			Ok(properties.into_iter().map(PropertyItem::from).collect())
		}))
	}

	/// Candidate-member search sharing this connection and runtime.
	pub fn member_search(&self) -> Result<MemberSearch> {
		let repository = self.repository(Operation::SearchCandidates)?;
		Ok(MemberSearch::new(repository, self.ctx.clone()))
	}

	/// Member roster sharing this connection and runtime.
	pub fn group_roster(&self) -> Result<GroupRoster> {
		let repository = self.repository(Operation::LoadRoster)?;
		Ok(GroupRoster::new(repository, self.ctx.clone()))
	}

	/// Supersedes in-flight group and user searches.
	pub fn cancel(&self) {
		self.groups.cancel();
		self.users.cancel();
	}

	/// Cancels everything spawned from this explorer and the models it created.
	pub fn shutdown(&self) {
		self.cancel();
		self.ctx.runtime.shutdown();
	}

	/// Waits until every background unit, including orphaned fetches, finished.
	pub async fn settle(&self) {
		self.ctx.runtime.settle().await;
	}
}
