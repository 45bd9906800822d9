/// Directory group as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
	pub name: String,
	pub distinguished_name: String,
}

/// Directory user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
	pub name: String,
	pub full_name: String,
	pub distinguished_name: String,
	/// Distinguished names of owning groups, present only when requested.
	pub groups: Option<Vec<String>>,
}

impl User {
	/// Returns true when `group_dn` is among the owning groups, ignoring case.
	///
	/// Users fetched without group membership never match.
	pub fn is_member_of(&self, group_dn: &str) -> bool {
		self.groups
			.as_deref()
			.is_some_and(|groups| groups.iter().any(|dn| dn.eq_ignore_ascii_case(group_dn)))
	}
}

/// One attribute of a directory entry with its values joined by `"; "`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
	pub name: String,
	pub value: String,
}

impl Property {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}

	/// Builds a property from a multi-valued attribute.
	pub fn joined<I, S>(name: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let value = values.into_iter().map(|v| v.as_ref().to_owned()).collect::<Vec<_>>().join("; ");
		Self { name: name.into(), value }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn membership_check_ignores_case() {
		let user = User {
			name: "jdoe".into(),
			full_name: "John Doe".into(),
			distinguished_name: "CN=jdoe,OU=Users,DC=corp".into(),
			groups: Some(vec!["CN=Admins,OU=Groups,DC=corp".into()]),
		};
		assert!(user.is_member_of("cn=admins,ou=groups,dc=corp"));
		assert!(!user.is_member_of("CN=Staff,OU=Groups,DC=corp"));

		let bare = User { groups: None, ..user };
		assert!(!bare.is_member_of("CN=Admins,OU=Groups,DC=corp"));
	}

	#[test]
	fn joined_property_uses_semicolon_separator() {
		let prop = Property::joined("member", ["a", "b", "c"]);
		assert_eq!(prop.value, "a; b; c");
		assert_eq!(Property::joined("member", Vec::<String>::new()).value, "");
	}
}
