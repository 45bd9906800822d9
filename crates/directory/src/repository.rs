use std::sync::Arc;

use crate::{Group, Property, Result, User};

/// Credentials and target for opening a directory connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
	/// Domain to connect to; `None` uses the ambient domain.
	pub domain: Option<String>,
	pub user: Option<String>,
	pub password: Option<String>,
}

/// Blocking query contract for one directory connection.
///
/// Implementations must tolerate concurrent read calls on the same instance.
/// Lookups of absent entities return empty sets or `None`; only membership
/// mutations fail with a not-found error.
pub trait DirectoryRepository: Send + Sync {
	/// Verifies that the connection root exists.
	fn test_path(&self) -> Result<()>;

	/// Name of the server or domain this connection talks to.
	fn server_name(&self) -> String;

	/// Groups whose name starts with `term`, or all groups for a blank term.
	fn list_groups(&self, term: Option<&str>) -> Result<Vec<Group>>;

	/// Users whose name starts with `term`, optionally with owning groups filled in.
	fn list_users(&self, term: Option<&str>, include_groups: bool) -> Result<Vec<User>>;

	fn get_group(&self, name: &str) -> Result<Option<Group>>;

	fn get_user(&self, name: &str) -> Result<Option<User>>;

	/// Members of `group`; empty if the group is absent.
	fn list_group_members(&self, group: &str) -> Result<Vec<User>>;

	/// Groups `user` belongs to; empty if the user is absent.
	fn list_user_groups(&self, user: &str) -> Result<Vec<Group>>;

	fn list_group_properties(&self, group: &str) -> Result<Vec<Property>>;

	fn list_user_properties(&self, user: &str) -> Result<Vec<Property>>;

	fn add_group_member(&self, group: &str, user: &str) -> Result<()>;

	fn remove_group_member(&self, group: &str, user: &str) -> Result<()>;
}

/// Opens repository connections.
pub trait RepositoryFactory: Send + Sync {
	fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn DirectoryRepository>>;
}
