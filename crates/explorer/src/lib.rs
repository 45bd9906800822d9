//! Search orchestration for a directory browser.
//!
//! * [`SortedSink`] / [`SharedList`] hold display items in comparator order at
//!   every observable instant; observers replay [`ListChange`]s in mutation
//!   order through a [`ListMirror`].
//! * [`SearchDomain`] runs one superseding request at a time per pane. Only the
//!   request holding the domain's current generation may mutate its list.
//! * [`Children`] loads tree-node children on first expansion.
//! * Background failures become [`Fault`]s on the event channel; the
//!   presentation loop drains them, and searching transitions, from an
//!   [`EventLoop`].
//! * [`Explorer`], [`MemberSearch`], and [`GroupRoster`] are the models a
//!   presentation layer drives.

mod children;
mod error;
mod event;
mod explorer;
mod fault;
mod item;
mod list;
mod member_search;
mod roster;
mod search;
mod sink;
mod unit;

pub use children::{Children, LoadState};
pub use error::{ExplorerError, Result};
pub use event::{Domain, EventLoop, EventSender, ExplorerEvent, channel};
pub use explorer::Explorer;
pub use fault::{ErrorChannel, Failure, Fault, Operation};
pub use item::{
	CandidateItem, GroupItem, GroupNode, MemberCandidate, PropertyItem, PropertyList, UserItem, UserNode, candidate_order,
	group_order, property_order, user_order,
};
pub use list::{ListChange, ListMirror, SharedList};
pub use member_search::MemberSearch;
pub use roster::GroupRoster;
pub use search::{SearchDomain, SearchOptions};
pub use sink::{Comparator, SortedSink};
pub use unit::{RequestHandle, RequestOutcome};
