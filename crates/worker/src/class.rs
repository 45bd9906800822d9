/// What a spawned task is doing; carried into every spawn trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// A generation-scoped request body (search, property load, roster load).
	Request,
	/// Lazy child loading for one tree node.
	Expansion,
	/// Membership add/remove; never superseded.
	Mutation,
	/// A blocking call into the directory backend.
	DirectoryCall,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Request => "request",
			Self::Expansion => "expansion",
			Self::Mutation => "mutation",
			Self::DirectoryCall => "directory_call",
		}
	}
}
