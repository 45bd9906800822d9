//! Candidate-member search for one group.

use std::sync::Arc;

use adex_directory::{DirectoryError, DirectoryRepository, normalize_term};
use adex_worker::TaskClass;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::unit::{RequestHandle, WorkContext, blocking};
use crate::{
	CandidateItem, Domain, ExplorerError, ExplorerEvent, MemberCandidate, Operation, Result, SearchDomain, candidate_order,
};

/// Searches users and offers each for addition to, or removal from, the
/// selected group.
pub struct MemberSearch {
	repository: Arc<dyn DirectoryRepository>,
	group: Option<String>,
	candidates: SearchDomain<CandidateItem>,
	mutation: Arc<Mutex<()>>,
	ctx: WorkContext,
}

impl std::fmt::Debug for MemberSearch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemberSearch")
			.field("group", &self.group)
			.field("candidates", &self.candidates)
			.finish_non_exhaustive()
	}
}

impl MemberSearch {
	pub(crate) fn new(repository: Arc<dyn DirectoryRepository>, ctx: WorkContext) -> Self {
		Self {
			repository,
			group: None,
			candidates: SearchDomain::new(Domain::Candidates, Operation::SearchCandidates, candidate_order, ctx.clone()),
			mutation: Arc::new(Mutex::new(())),
			ctx,
		}
	}

	/// Binds the search to `group`, dropping results computed for another group.
	pub fn set_group(&mut self, group: &str) {
		let group = group.trim();
		if self.group.as_deref() == Some(group) {
			return;
		}
		self.candidates.cancel();
		self.candidates.results().clear();
		self.group = Some(group.to_owned());
	}

	pub fn group(&self) -> Option<&str> {
		self.group.as_deref()
	}

	pub fn candidates(&self) -> &SearchDomain<CandidateItem> {
		&self.candidates
	}

	/// Starts a candidate search. Blank terms are ignored and return `None`.
	pub fn search(&self, term: &str) -> Result<Option<RequestHandle>> {
		let group = self.group.clone().ok_or(ExplorerError::GroupNotSet)?;
		let Some(term) = normalize_term(Some(term)).map(str::to_owned) else {
			return Ok(None);
		};
		let repository = Arc::clone(&self.repository);
		let subject = Some(term.clone());
		Ok(Some(self.candidates.start(subject, move || {
			let users = repository.list_users(Some(&term), true)?;
			let group = repository
				.get_group(&group)?
				.ok_or_else(|| DirectoryError::GroupNotFound { name: group.clone() })?;
			Ok(users
				.into_iter()
				.map(|user| MemberCandidate::for_group(user, &group.distinguished_name))
				.collect())
		})))
	}

	/// Adds the candidate to the group; resolves to whether it succeeded.
	pub fn add_member(&self, candidate: &CandidateItem) -> Result<JoinHandle<bool>> {
		self.mutate(candidate, true)
	}

	/// Removes the candidate from the group; resolves to whether it succeeded.
	pub fn remove_member(&self, candidate: &CandidateItem) -> Result<JoinHandle<bool>> {
		self.mutate(candidate, false)
	}

	fn mutate(&self, candidate: &CandidateItem, member: bool) -> Result<JoinHandle<bool>> {
		let group = self.group.clone().ok_or(ExplorerError::GroupNotSet)?;
		let candidate = Arc::clone(candidate);
		Ok(spawn_membership(
			&self.ctx,
			MembershipChange {
				repository: Arc::clone(&self.repository),
				serial: Arc::clone(&self.mutation),
				group,
				user: candidate.name.clone(),
				member,
			},
			move || candidate.set_member(member),
		))
	}

	/// Supersedes the running candidate search.
	pub fn cancel(&self) {
		self.candidates.cancel();
	}
}

/// One add or remove against the directory.
pub(crate) struct MembershipChange {
	pub(crate) repository: Arc<dyn DirectoryRepository>,
	/// Held for the backend call so mutations from one model never overlap.
	pub(crate) serial: Arc<Mutex<()>>,
	pub(crate) group: String,
	pub(crate) user: String,
	pub(crate) member: bool,
}

/// Runs a membership mutation as a one-shot unit.
///
/// `on_success` runs after the backend accepted the change and before
/// `MembershipChanged` is published. Failures become faults.
pub(crate) fn spawn_membership<S>(ctx: &WorkContext, change: MembershipChange, on_success: S) -> JoinHandle<bool>
where
	S: FnOnce() + Send + 'static,
{
	let ctx = ctx.clone();
	let runtime = ctx.runtime.clone();
	runtime.spawn(TaskClass::Mutation, async move {
		let MembershipChange {
			repository,
			serial,
			group,
			user,
			member,
		} = change;
		let operation = if member { Operation::AddMember } else { Operation::RemoveMember };
		let call = {
			let group = group.clone();
			let user = user.clone();
			move || {
				let _serial = serial.lock();
				if member {
					repository.add_group_member(&group, &user)
				} else {
					repository.remove_group_member(&group, &user)
				}
			}
		};
		match blocking(&ctx.runtime, call).await {
			Ok(()) => {
				tracing::info!(%group, %user, member, "membership.changed");
				on_success();
				ctx.events.send(ExplorerEvent::MembershipChanged { group, user, member });
				true
			}
			Err(failure) => {
				let subject = format!("{user} in {group}");
				ctx.errors.report(operation, Some(subject.as_str()), failure);
				false
			}
		}
	})
}
