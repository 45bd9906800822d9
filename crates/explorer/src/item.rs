//! Display items and the mappers that project directory entities onto them.
//!
//! Tree nodes ([`GroupNode`], [`UserNode`]) are shared as `Arc`s so a node
//! can sit in a result list while background units fill its children and
//! properties. Top-level search results are created expandable; nested
//! children are created as loaded leaves.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};

use adex_directory::{Group, Property, User};
use adex_worker::GenerationClock;

use crate::Children;
use crate::list::SharedList;

pub type GroupItem = Arc<GroupNode>;
pub type UserItem = Arc<UserNode>;

/// Property list of one node with its own refresh generation.
#[derive(Debug, Default)]
pub struct PropertyList {
	list: SharedList<PropertyItem>,
	clock: GenerationClock,
}

impl PropertyList {
	pub fn list(&self) -> &SharedList<PropertyItem> {
		&self.list
	}

	pub(crate) fn clock(&self) -> &GenerationClock {
		&self.clock
	}
}

#[derive(Debug)]
pub struct GroupNode {
	pub name: String,
	pub distinguished_name: String,
	pub properties: PropertyList,
	pub members: Children<UserItem>,
}

impl GroupNode {
	/// Node whose members load on first expansion.
	pub fn expandable(group: Group) -> GroupItem {
		Self::build(group, Children::unloaded())
	}

	/// Node with no members to load.
	pub fn leaf(group: Group) -> GroupItem {
		Self::build(group, Children::loaded_empty())
	}

	fn build(group: Group, members: Children<UserItem>) -> GroupItem {
		Arc::new(Self {
			name: group.name,
			distinguished_name: group.distinguished_name,
			properties: PropertyList::default(),
			members,
		})
	}
}

#[derive(Debug)]
pub struct UserNode {
	pub name: String,
	pub full_name: String,
	pub distinguished_name: String,
	pub properties: PropertyList,
	pub groups: Children<GroupItem>,
}

impl UserNode {
	/// Node whose groups load on first expansion.
	pub fn expandable(user: User) -> UserItem {
		Self::build(user, Children::unloaded())
	}

	pub fn leaf(user: User) -> UserItem {
		Self::build(user, Children::loaded_empty())
	}

	fn build(user: User, groups: Children<GroupItem>) -> UserItem {
		Arc::new(Self {
			name: user.name,
			full_name: user.full_name,
			distinguished_name: user.distinguished_name,
			properties: PropertyList::default(),
			groups,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyItem {
	pub name: String,
	pub value: String,
}

impl From<Property> for PropertyItem {
	fn from(property: Property) -> Self {
		Self {
			name: property.name,
			value: property.value,
		}
	}
}

/// User offered for addition to, or removal from, one group.
///
/// The membership flag flips when a mutation through
/// [`crate::MemberSearch`] succeeds.
#[derive(Debug)]
pub struct MemberCandidate {
	pub name: String,
	pub full_name: String,
	member: AtomicBool,
}

pub type CandidateItem = Arc<MemberCandidate>;

impl MemberCandidate {
	/// Maps `user` against the group identified by `group_dn`.
	pub fn for_group(user: User, group_dn: &str) -> CandidateItem {
		let member = user.is_member_of(group_dn);
		Arc::new(Self {
			name: user.name,
			full_name: user.full_name,
			member: AtomicBool::new(member),
		})
	}

	pub fn is_member(&self) -> bool {
		self.member.load(atomic::Ordering::Acquire)
	}

	pub fn can_add(&self) -> bool {
		!self.is_member()
	}

	pub fn can_remove(&self) -> bool {
		self.is_member()
	}

	pub(crate) fn set_member(&self, member: bool) {
		self.member.store(member, atomic::Ordering::Release);
	}
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
	a.chars().flat_map(char::to_lowercase).cmp(b.chars().flat_map(char::to_lowercase))
}

pub fn group_order(a: &GroupItem, b: &GroupItem) -> Ordering {
	cmp_ignore_case(&a.name, &b.name)
}

/// Full name first, account name second.
pub fn user_order(a: &UserItem, b: &UserItem) -> Ordering {
	cmp_ignore_case(&a.full_name, &b.full_name).then_with(|| cmp_ignore_case(&a.name, &b.name))
}

pub fn property_order(a: &PropertyItem, b: &PropertyItem) -> Ordering {
	cmp_ignore_case(&a.name, &b.name)
}

pub fn candidate_order(a: &CandidateItem, b: &CandidateItem) -> Ordering {
	cmp_ignore_case(&a.full_name, &b.full_name).then_with(|| cmp_ignore_case(&a.name, &b.name))
}
